//! # Handles
//!
//! A handle is an opaque 64-bit token standing in for a pointer:
//!
//! ```text
//! 63          48 47          32 31                          0
//! ┌─────────────┬──────────────┬────────────────────────────┐
//! │  type tag   │  generation  │         slot index         │
//! └─────────────┴──────────────┴────────────────────────────┘
//! ```
//!
//! Equality and ordering compare the raw integer.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

use super::generation::Generation;

/// Untyped, packed handle value.
///
/// This is the form a handle takes when it crosses an API or byte
/// boundary; [`Handle<T>`] wraps it with the element type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct HandleId(u64);

impl HandleId {
    /// The null id. Never valid in any map.
    pub const NULL: Self = Self(0);

    /// Packs a slot index, generation and type tag.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: Generation, type_tag: u16) -> Self {
        Self(((type_tag as u64) << 48) | ((generation.raw() as u64) << 32) | index as u64)
    }

    /// Reconstructs an id from its raw integer.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Slot index portion.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation portion.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> Generation {
        Generation::from_raw((self.0 >> 32) as u16)
    }

    /// Type tag portion.
    #[inline]
    #[must_use]
    pub const fn type_tag(self) -> u16 {
        (self.0 >> 48) as u16
    }

    /// Checks if this is the null id.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Typed handle to a value stored in a [`HandleMap<T>`](super::HandleMap).
///
/// Handles are `Copy` regardless of `T` and carry no borrow: they stay
/// cheap to pass around and are checked on every access.
pub struct Handle<T> {
    id: HandleId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The null handle.
    pub const NULL: Self = Self::from_id(HandleId::NULL);

    /// Wraps an untyped id. The map still verifies tag and generation.
    #[inline]
    #[must_use]
    pub const fn from_id(id: HandleId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the untyped id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> HandleId {
        self.id
    }

    /// Slot index this handle points at.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.id.index()
    }

    /// Generation this handle was issued with.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.id.generation()
    }

    /// Type tag of the issuing map.
    #[inline]
    #[must_use]
    pub const fn type_tag(self) -> u16 {
        self.id.type_tag()
    }

    /// Checks if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.id.is_null()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index())
            .field("generation", &self.generation().raw())
            .field("type_tag", &self.type_tag())
            .finish()
    }
}

impl<T> From<Handle<T>> for HandleId {
    fn from(handle: Handle<T>) -> Self {
        handle.id
    }
}
