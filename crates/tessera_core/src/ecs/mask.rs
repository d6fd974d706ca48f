//! # Component Masks
//!
//! One bit per component type, 64 types per world. An entity's mask is the
//! OR of its components' bits, so "has all of X, Y, Z" is a single AND.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Maximum number of component types a mask can describe.
pub const MAX_COMPONENTS: usize = 64;

/// Fixed-width set of component type bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The mask with no bits set.
    pub const EMPTY: Self = Self(0);

    /// Mask with only `bit` set.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= 64`.
    #[inline]
    #[must_use]
    pub const fn bit(bit: usize) -> Self {
        assert!(bit < MAX_COMPONENTS, "component bit out of range");
        Self(1 << bit)
    }

    /// Wraps a raw bit pattern.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bit pattern.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Superset test: every bit of `other` is also set here.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if the masks share at least one bit.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Sets every bit of `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears every bit of `other`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Splits the mask into single-bit masks, lowest bit first.
    pub fn iter(self) -> impl Iterator<Item = Self> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let lowest = bits & bits.wrapping_neg();
            bits &= bits - 1;
            Some(Self(lowest))
        })
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superset() {
        let position = ComponentMask::bit(0);
        let velocity = ComponentMask::bit(1);
        let entity = position | velocity;

        assert!(entity.contains(position));
        assert!(entity.contains(position | velocity));
        assert!(!position.contains(entity));
        assert!(entity.contains(ComponentMask::EMPTY));
    }

    #[test]
    fn test_insert_remove() {
        let mut mask = ComponentMask::EMPTY;
        mask.insert(ComponentMask::bit(5));
        mask.insert(ComponentMask::bit(63));
        assert_eq!(mask.count(), 2);

        mask.remove(ComponentMask::bit(5));
        assert_eq!(mask, ComponentMask::bit(63));
    }

    #[test]
    fn test_iter_splits_bits() {
        let mask = ComponentMask::bit(1) | ComponentMask::bit(4) | ComponentMask::bit(63);
        let parts: Vec<_> = mask.iter().collect();
        assert_eq!(
            parts,
            vec![
                ComponentMask::bit(1),
                ComponentMask::bit(4),
                ComponentMask::bit(63)
            ]
        );
    }
}
