//! # Components
//!
//! Components are plain data attached to entities. Each component type gets
//! one bit in its world's [`ComponentMask`] the first time it is used there.

use std::any::{type_name, Any, TypeId};

use super::entity::Entity;
use super::mask::{ComponentMask, MAX_COMPONENTS};
use crate::collections::HashMap;
use crate::error::{StorageError, StorageResult};
use crate::memory::Generation;

/// Data that can be attached to an entity.
///
/// `Default` provides the value a component is constructed with and the
/// value a freed pool slot is reset to.
///
/// # Example
///
/// ```rust
/// use tessera_core::ecs::{Component, Entity};
///
/// #[derive(Clone, Default)]
/// struct Health {
///     points: u32,
/// }
///
/// impl Component for Health {
///     fn on_added(&mut self, _entity: Entity) {
///         self.points = 100;
///     }
/// }
/// ```
pub trait Component: Clone + Default + 'static {
    /// Called after the component was attached to `entity`.
    fn on_added(&mut self, _entity: Entity) {}

    /// Called right before the component is detached from `entity`,
    /// while it is still readable.
    fn on_removed(&mut self, _entity: Entity) {}
}

/// Where one of an entity's components lives.
///
/// The default value is the blank entry of a handle pool, not a usable
/// handle; [`ComponentHandle::new`] builds real ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComponentHandle {
    /// Bit of the component type, which also keys its pool.
    pub mask: ComponentMask,
    /// Slot in that type's pool.
    pub index: usize,
    /// Generation of the pool slot when the component was added.
    pub generation: Generation,
    /// User-controlled switch. Storage and queries ignore it; systems
    /// decide what a disabled component means.
    pub enabled: bool,
}

impl ComponentHandle {
    /// Handle to a freshly added component, enabled.
    #[inline]
    #[must_use]
    pub const fn new(mask: ComponentMask, index: usize, generation: Generation) -> Self {
        Self {
            mask,
            index,
            generation,
            enabled: true,
        }
    }

    /// Returns `true` if this handle points at a component of type `mask`.
    #[inline]
    #[must_use]
    pub const fn is(&self, mask: ComponentMask) -> bool {
        !mask.is_empty() && self.mask.contains(mask)
    }
}

/// Read-only, type-erased view of one of an entity's components.
#[derive(Clone, Copy, Debug)]
pub struct ComponentView<'a> {
    handle: ComponentHandle,
    name: &'static str,
    value: &'a dyn Any,
}

impl<'a> ComponentView<'a> {
    pub(crate) fn new(handle: ComponentHandle, name: &'static str, value: &'a dyn Any) -> Self {
        Self {
            handle,
            name,
            value,
        }
    }

    /// Where the component lives.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> ComponentHandle {
        self.handle
    }

    /// Type name of the component.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Bit of the component type.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> ComponentMask {
        self.handle.mask
    }

    /// The component's enabled flag.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.handle.enabled
    }

    /// The component as `Any`.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &'a dyn Any {
        self.value
    }

    /// The component as `C`, if that is its type.
    #[inline]
    #[must_use]
    pub fn downcast_ref<C: Component>(&self) -> Option<&'a C> {
        self.value.downcast_ref::<C>()
    }
}

/// Per-world assignment of component types to mask bits.
///
/// Bits are handed out in first-use order and never reclaimed.
#[derive(Clone, Debug)]
pub struct ComponentRegistry {
    bits: HashMap<TypeId, ComponentMask>,
    max: usize,
}

impl ComponentRegistry {
    /// Creates a registry that hands out at most `max` bits (capped at 64).
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            bits: HashMap::with_capacity(max.clamp(1, MAX_COMPONENTS) * 2),
            max: max.min(MAX_COMPONENTS),
        }
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` if no component type has been registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bit of `C`, if it was registered.
    #[inline]
    #[must_use]
    pub fn mask_of<C: Component>(&self) -> Option<ComponentMask> {
        self.bits.get(&TypeId::of::<C>()).copied()
    }

    /// Bit of `C`, registering the type on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ComponentLimit`] when every bit is taken.
    pub fn register<C: Component>(&mut self) -> StorageResult<ComponentMask> {
        if let Some(mask) = self.mask_of::<C>() {
            return Ok(mask);
        }
        let bit = self.bits.len();
        if bit >= self.max {
            return Err(StorageError::ComponentLimit { max: self.max });
        }
        let mask = ComponentMask::bit(bit);
        self.bits.insert(TypeId::of::<C>(), mask);
        tracing::debug!(component = type_name::<C>(), bit, "component type registered");
        Ok(mask)
    }
}
