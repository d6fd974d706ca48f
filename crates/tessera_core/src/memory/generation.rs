//! # Generation Counters
//!
//! A slot's generation is bumped every time the slot is handed out again.
//! Handles remember the generation they were issued with, so a handle to a
//! recycled slot no longer matches.
//!
//! Both slot allocators (`SlotTable` behind `HandleMap`, and `Pool`) go
//! through [`Generation::bump`] and [`Generation::validate`], so a handle
//! goes stale under exactly the same rule everywhere.

use crate::error::{StorageError, StorageResult};

/// Reuse counter of a single slot.
///
/// Zero is reserved for "never issued": a freshly created slot starts at 0
/// and the first allocation moves it to 1. Wrapping skips 0 so that a null
/// handle (all bits zero) can never match a live slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Generation(u16);

impl Generation {
    /// The generation of a slot that has never been allocated.
    pub const NONE: Self = Self(0);

    /// Creates a generation from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns the generation that follows this one, skipping 0.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        match self.0.wrapping_add(1) {
            0 => Self(1),
            n => Self(n),
        }
    }

    /// Advances a slot to its next generation on allocation.
    #[inline]
    pub fn bump(&mut self) -> Self {
        *self = self.next();
        *self
    }

    /// Checks a remembered generation against the slot's current one.
    ///
    /// `self` is the slot's generation, `found` the one the caller kept.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::StaleHandle`] if the slot is free or has been
    /// reissued since `found` was observed.
    pub fn validate(self, index: usize, used: bool, found: Self) -> StorageResult<()> {
        if used && self == found {
            return Ok(());
        }
        Err(StorageError::StaleHandle {
            index: u32::try_from(index).unwrap_or(u32::MAX),
            current: self.0,
            found: found.0,
        })
    }
}
