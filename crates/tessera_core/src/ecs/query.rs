//! # Queries
//!
//! A query is a tuple of component types, e.g. `(Position, Velocity)`.
//! [`World::for_each`](super::World::for_each) visits every entity whose
//! mask contains all of them and hands out one mutable reference per type.
//!
//! The queried pools are moved out of the world's pool map for the duration
//! of the loop, so each can be borrowed mutably alongside the others.

use std::any::type_name;

use super::component::{Component, ComponentHandle, ComponentRegistry};
use super::entity::Entity;
use super::erased::{Column, PoolMap};
use super::mask::ComponentMask;
use crate::error::{StorageError, StorageResult};
use crate::memory::Pool;

/// A set of component types fetched together.
///
/// Implemented for tuples of one to six [`Component`] types.
pub trait Query {
    /// Pools moved out of the world while the query runs.
    type Columns;

    /// What the callback receives per matching entity.
    type Item<'a>
    where
        Self: 'a;

    /// Number of component types in the query.
    const ARITY: usize;

    /// OR of the component bits, or `None` if a type was never registered
    /// (then no entity can match).
    fn mask(registry: &ComponentRegistry) -> Option<ComponentMask>;

    /// Moves the queried pools out of `pools`.
    ///
    /// Returns `None`, leaving `pools` untouched, if any pool is missing.
    ///
    /// # Panics
    ///
    /// Panics if the same component type appears twice in the query.
    fn detach(registry: &ComponentRegistry, pools: &mut PoolMap) -> Option<Self::Columns>;

    /// Puts detached pools back.
    fn attach(columns: Self::Columns, pools: &mut PoolMap);

    /// Borrows one entity's components out of the detached pools.
    ///
    /// The entity's mask already claims every queried type, so a missing
    /// or stale handle is a broken invariant, never a non-match.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingComponent`] if `handles` has no entry
    /// for a queried type, or [`StorageError::StaleHandle`] if an entry
    /// points at a recycled slot.
    fn fetch<'a>(
        columns: &'a mut Self::Columns,
        entity: Entity,
        handles: &Pool<ComponentHandle>,
    ) -> StorageResult<Self::Item<'a>>;
}

impl<C: Component> Column<C> {
    /// Looks up this column's component for an entity.
    fn fetch(&mut self, entity: Entity, handles: &Pool<ComponentHandle>) -> StorageResult<&mut C> {
        let mask = self.mask();
        let Some((_, handle)) = handles.iter().find(|(_, handle)| handle.is(mask)) else {
            return Err(StorageError::MissingComponent {
                entity: entity.id(),
                component: type_name::<C>(),
            });
        };
        let (index, generation) = (handle.index, handle.generation);
        self.pool_mut().get_checked_mut(index, generation)
    }
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Query for ($($name,)+) {
            type Columns = ($(Column<$name>,)+);
            type Item<'a> = ($(&'a mut $name,)+)
            where
                Self: 'a;

            const ARITY: usize = count!($($name)+);

            fn mask(registry: &ComponentRegistry) -> Option<ComponentMask> {
                Some(ComponentMask::EMPTY $(| registry.mask_of::<$name>()?)+)
            }

            fn detach(registry: &ComponentRegistry, pools: &mut PoolMap) -> Option<Self::Columns> {
                let mask = Self::mask(registry)?;
                assert!(
                    mask.count() as usize == Self::ARITY,
                    "query names the same component type twice"
                );
                if mask.iter().any(|bit| !pools.contains_key(&bit)) {
                    return None;
                }
                Some(($(Column::<$name>::detach(pools, registry.mask_of::<$name>()?)?,)+))
            }

            #[allow(non_snake_case)]
            fn attach(columns: Self::Columns, pools: &mut PoolMap) {
                let ($($name,)+) = columns;
                $($name.attach(pools);)+
            }

            #[allow(non_snake_case)]
            fn fetch<'a>(
                columns: &'a mut Self::Columns,
                entity: Entity,
                handles: &Pool<ComponentHandle>,
            ) -> StorageResult<Self::Item<'a>> {
                let ($($name,)+) = columns;
                Ok(($($name.fetch(entity, handles)?,)+))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);
