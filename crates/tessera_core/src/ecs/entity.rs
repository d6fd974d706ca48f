//! # Entities
//!
//! An entity is nothing but an id. Whether it is alive is always decided by
//! looking the id up in the [`World`](super::World) that created it.

use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Unique identifier of an entity within a world.
///
/// Ids are random 64-bit values; 0 is reserved as the null id.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// The null id. Never alive.
    pub const NULL: Self = Self(0);

    /// Wraps a raw id value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this is the null id.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({:#018x})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Copyable reference to an entity.
///
/// Carries no state of its own; every query goes through the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Entity {
    id: EntityId,
}

impl Entity {
    /// The null entity.
    pub const NULL: Self = Self::new(EntityId::NULL);

    /// Wraps an id.
    #[inline]
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self { id }
    }

    /// The entity's id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Checks if this is the null entity.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.id.is_null()
    }
}

impl From<EntityId> for Entity {
    fn from(id: EntityId) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_entity() {
        assert!(Entity::default().is_null());
        assert!(Entity::NULL.id().is_null());
        assert!(!Entity::new(EntityId::from_raw(7)).is_null());
    }

    #[test]
    fn test_entities_cast_to_bytes() {
        let entities = [Entity::new(EntityId::from_raw(0xAABB)), Entity::NULL];
        let raw: &[u64] = bytemuck::cast_slice(&entities);
        assert_eq!(raw, &[0xAABB, 0]);
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(EntityId::from_raw(255).to_string(), "00000000000000ff");
    }
}
