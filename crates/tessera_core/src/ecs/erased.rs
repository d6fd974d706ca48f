//! # Type-Erased Pools
//!
//! The world keeps one `Pool<C>` per component type in a single map keyed
//! by the type's mask bit. [`ErasedPool`] is the small surface the world
//! needs when it does not know `C`, mostly while destroying an entity.
//! Typed access goes back through [`Any`] downcasts.

use std::any::{type_name, Any};
use std::fmt;

use super::component::Component;
use super::entity::Entity;
use super::mask::ComponentMask;
use crate::collections::HashMap;
use crate::error::{fatal, StorageError};
use crate::memory::Pool;

/// Component pools keyed by component bit.
pub type PoolMap = HashMap<ComponentMask, Box<dyn ErasedPool>>;

/// Operations on a component pool whose element type is not known.
pub trait ErasedPool: Any {
    /// Type name of the stored component.
    fn component_name(&self) -> &'static str;

    /// Number of live components.
    fn len(&self) -> usize;

    /// Returns `true` if the pool holds no component.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, used or free.
    fn capacity(&self) -> usize;

    /// Lowest free slot, if any.
    fn free_index(&self) -> Option<usize>;

    /// Returns `true` if `index` holds a component.
    fn is_used(&self, index: usize) -> bool;

    /// The component at `index` as `Any`, if the slot is used.
    fn component(&self, index: usize) -> Option<&dyn Any>;

    /// Runs the component's removal hook.
    fn notify_removed(&mut self, index: usize, entity: Entity);

    /// Drops the component at `index` and frees its slot.
    fn remove_at(&mut self, index: usize);

    /// Frees every slot.
    fn clear(&mut self);

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed access.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Owned upcast, used to move a pool out of the map.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<C: Component> ErasedPool for Pool<C> {
    fn component_name(&self) -> &'static str {
        type_name::<C>()
    }

    fn len(&self) -> usize {
        Pool::len(self)
    }

    fn capacity(&self) -> usize {
        Pool::capacity(self)
    }

    fn free_index(&self) -> Option<usize> {
        Pool::free_index(self)
    }

    fn is_used(&self, index: usize) -> bool {
        Pool::is_used(self, index)
    }

    fn component(&self, index: usize) -> Option<&dyn Any> {
        self.try_get(index).ok().map(|value| value as &dyn Any)
    }

    fn notify_removed(&mut self, index: usize, entity: Entity) {
        self.get_mut(index).on_removed(entity);
    }

    fn remove_at(&mut self, index: usize) {
        self.remove(index);
    }

    fn clear(&mut self) {
        Pool::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl fmt::Debug for dyn ErasedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedPool")
            .field("component", &self.component_name())
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Typed view of the pool stored under `mask`.
#[must_use]
pub fn pool_ref<C: Component>(pools: &PoolMap, mask: ComponentMask) -> Option<&Pool<C>> {
    pools.get(&mask)?.as_any().downcast_ref::<Pool<C>>()
}

/// Typed mutable view of the pool stored under `mask`.
pub fn pool_mut<C: Component>(pools: &mut PoolMap, mask: ComponentMask) -> Option<&mut Pool<C>> {
    pools.get_mut(&mask)?.as_any_mut().downcast_mut::<Pool<C>>()
}

/// A pool moved out of the map, so several can be borrowed mutably at once.
///
/// Put it back with [`Column::attach`].
#[derive(Debug)]
pub struct Column<C> {
    mask: ComponentMask,
    pool: Box<Pool<C>>,
}

impl<C: Component> Column<C> {
    /// Moves the pool of `C` out of the map.
    ///
    /// Returns `None` if no pool is registered under `mask`.
    ///
    /// # Panics
    ///
    /// Panics if the pool under `mask` stores a different type.
    pub fn detach(pools: &mut PoolMap, mask: ComponentMask) -> Option<Self> {
        let erased = pools.remove(&mask)?;
        match erased.into_any().downcast::<Pool<C>>() {
            Ok(pool) => Some(Self { mask, pool }),
            Err(_) => fatal(StorageError::UnknownComponentType(mask)),
        }
    }

    /// Returns the pool to the map.
    pub fn attach(self, pools: &mut PoolMap) {
        pools.insert(self.mask, self.pool);
    }

    /// Bit of the column's component type.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> ComponentMask {
        self.mask
    }

    /// The detached pool.
    #[inline]
    pub fn pool_mut(&mut self) -> &mut Pool<C> {
        &mut self.pool
    }
}
