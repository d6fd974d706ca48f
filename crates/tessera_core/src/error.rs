//! # Storage Error Types
//!
//! Every invariant violation the storage layer can detect.
//!
//! The plain container operations treat these as fatal: they log the
//! message and panic. The `try_*` twins hand the same value back to the
//! caller instead.

use thiserror::Error;

use crate::ecs::{ComponentMask, EntityId};

/// Invariant violations detected by the containers and the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The handle's generation no longer matches its slot.
    #[error("stale handle: slot {index} is at generation {current}, handle carries {found}")]
    StaleHandle {
        /// Slot index encoded in the handle.
        index: u32,
        /// Generation currently stored in the slot.
        current: u16,
        /// Generation carried by the handle.
        found: u16,
    },

    /// The handle was issued for a different element type.
    #[error("foreign handle: map has type tag {expected}, handle carries {found}")]
    ForeignHandle {
        /// Type tag of the map that was queried.
        expected: u16,
        /// Type tag carried by the handle.
        found: u16,
    },

    /// An index was outside the live range of a container.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the container.
        len: usize,
    },

    /// A pool slot was accessed while free.
    #[error("slot {0} is not in use")]
    SlotNotUsed(usize),

    /// A pool slot was claimed while already in use.
    #[error("slot {0} is already in use")]
    SlotInUse(usize),

    /// A key was inserted into a hash map that already holds it.
    #[error("an entry with the same key already exists in the map")]
    DuplicateKey,

    /// A key required to be present was not found.
    #[error("no entry for the requested key")]
    MissingKey,

    /// The entity id is not registered in the world.
    #[error("invalid entity {0:?}")]
    InvalidEntity(EntityId),

    /// An entity with this id is already alive.
    #[error("entity {0:?} already exists")]
    DuplicateEntity(EntityId),

    /// The entity does not own a component of the requested type.
    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        /// The entity that was queried.
        entity: EntityId,
        /// Type name of the requested component.
        component: &'static str,
    },

    /// The entity already owns a component of this type.
    #[error("entity {entity:?} already has a {component} component")]
    DuplicateComponent {
        /// The entity that was queried.
        entity: EntityId,
        /// Type name of the component.
        component: &'static str,
    },

    /// No more component bits are available in this world.
    #[error("component limit reached: at most {max} component types per world")]
    ComponentLimit {
        /// Configured maximum number of component types.
        max: usize,
    },

    /// A component handle points at a pool that does not exist.
    #[error("no component pool registered for mask {0:?}")]
    UnknownComponentType(ComponentMask),

    /// A system of this type is already registered.
    #[error("system {0} is already registered")]
    DuplicateSystem(&'static str),

    /// No system of this type is registered.
    #[error("no system {0} is registered")]
    MissingSystem(&'static str),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced while loading a [`StorageConfig`](crate::config::StorageConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Logs a violated invariant and aborts the current operation.
///
/// This is the single exit point for every fatal assertion in the crate.
#[cold]
#[track_caller]
pub(crate) fn fatal(err: StorageError) -> ! {
    tracing::error!(error = %err, "storage invariant violated");
    panic!("{err}");
}
