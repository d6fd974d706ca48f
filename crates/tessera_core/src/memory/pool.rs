//! # Component Pool
//!
//! Slot storage whose indices never move. A freed slot is reset to the
//! pool's initializer and can be claimed again; running out of free slots
//! doubles the pool, appending new slots behind the existing ones.
//!
//! ## Layout
//!
//! ```text
//! used:        [ 1 ][ 0 ][ 1 ][ 1 ][ 0 ]
//! generations: [ 1 ][ 2 ][ 1 ][ 3 ][ 0 ]
//! data:        [ a ][ - ][ c ][ d ][ - ]      '-' = initializer
//! ```
//!
//! Each claim bumps the slot's generation so an index remembered together
//! with its generation can tell a recycled slot from the original. The bump
//! and the staleness check are the same [`Generation`] rules the handle
//! map's slot table applies. Unlike the slot table there is no dense
//! indirection: a pool index is the storage position and never moves.

use super::bitset::BitSet;
use super::generation::Generation;
use crate::error::{fatal, StorageError, StorageResult};

/// Stable-index slot array with a used bitset.
#[derive(Clone, Debug)]
pub struct Pool<T> {
    data: Vec<T>,
    used: BitSet,
    generations: Vec<Generation>,
    initializer: T,
}

impl<T: Clone + Default> Pool<T> {
    /// Creates a pool of `capacity` slots initialized with `T::default()`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_initializer(capacity, T::default())
    }
}

impl<T: Clone> Pool<T> {
    /// Creates a pool of `capacity` slots, each a clone of `initializer`.
    #[must_use]
    pub fn with_initializer(capacity: usize, initializer: T) -> Self {
        Self {
            data: vec![initializer.clone(); capacity],
            used: BitSet::new(capacity),
            generations: vec![Generation::NONE; capacity],
            initializer,
        }
    }

    /// Number of used slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.used.count_ones()
    }

    /// Returns `true` if no slot is used.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.used.count_ones() == 0
    }

    /// Number of slots, used or free.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The value freed slots are reset to.
    #[inline]
    #[must_use]
    pub const fn initializer(&self) -> &T {
        &self.initializer
    }

    /// Returns `true` if `index` holds a value.
    #[inline]
    #[must_use]
    pub fn is_used(&self, index: usize) -> bool {
        self.used.contains(index)
    }

    /// Generation of a slot. [`Generation::NONE`] if it was never claimed.
    #[inline]
    #[must_use]
    pub fn generation(&self, index: usize) -> Generation {
        self.generations
            .get(index)
            .copied()
            .unwrap_or(Generation::NONE)
    }

    /// Lowest free index, found by a linear scan of the used bits.
    #[inline]
    #[must_use]
    pub fn free_index(&self) -> Option<usize> {
        self.used.first_clear()
    }

    /// Extends the pool to at least `capacity` slots. Indices are kept.
    pub fn grow(&mut self, capacity: usize) {
        let old = self.data.len();
        if capacity <= old {
            return;
        }
        self.data.resize(capacity, self.initializer.clone());
        self.generations.resize(capacity, Generation::NONE);
        self.used.grow(capacity);
        tracing::debug!(from = old, to = capacity, "pool grown");
    }

    /// Claims the lowest free slot, growing when the pool is full.
    ///
    /// Returns the index and the freshly initialized value.
    pub fn alloc(&mut self) -> (usize, &mut T) {
        let index = match self.free_index() {
            Some(index) => index,
            None => {
                let index = self.data.len();
                self.grow((index * 2).max(4));
                index
            }
        };
        (index, self.claim(index))
    }

    /// Claims a specific free slot, growing the pool to reach it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SlotInUse`] if `index` already holds a value.
    pub fn try_alloc_at(&mut self, index: usize) -> StorageResult<&mut T> {
        if self.is_used(index) {
            return Err(StorageError::SlotInUse(index));
        }
        if index >= self.data.len() {
            self.grow((self.data.len() * 2).max(index + 1));
        }
        Ok(self.claim(index))
    }

    /// Claims a specific free slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` already holds a value.
    #[track_caller]
    pub fn alloc_at(&mut self, index: usize) -> &mut T {
        match self.try_alloc_at(index) {
            Ok(value) => value,
            Err(err) => fatal(err),
        }
    }

    fn claim(&mut self, index: usize) -> &mut T {
        self.used.insert(index);
        self.generations[index].bump();
        &mut self.data[index]
    }

    fn check(&self, index: usize) -> StorageResult<()> {
        if index >= self.data.len() {
            return Err(StorageError::IndexOutOfBounds {
                index,
                len: self.data.len(),
            });
        }
        if !self.is_used(index) {
            return Err(StorageError::SlotNotUsed(index));
        }
        Ok(())
    }

    /// Returns the value at a used slot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IndexOutOfBounds`] or
    /// [`StorageError::SlotNotUsed`].
    pub fn try_get(&self, index: usize) -> StorageResult<&T> {
        self.check(index)?;
        Ok(&self.data[index])
    }

    /// Returns the mutable value at a used slot.
    ///
    /// # Errors
    ///
    /// Same as [`Pool::try_get`].
    pub fn try_get_mut(&mut self, index: usize) -> StorageResult<&mut T> {
        self.check(index)?;
        Ok(&mut self.data[index])
    }

    /// Returns the value at a used slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range or free.
    #[track_caller]
    #[must_use]
    pub fn get(&self, index: usize) -> &T {
        match self.try_get(index) {
            Ok(value) => value,
            Err(err) => fatal(err),
        }
    }

    /// Returns the mutable value at a used slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range or free.
    #[track_caller]
    pub fn get_mut(&mut self, index: usize) -> &mut T {
        match self.try_get_mut(index) {
            Ok(value) => value,
            Err(err) => fatal(err),
        }
    }

    /// Returns the value at `index` if it is used and still at `generation`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::StaleHandle`] when the slot was recycled or
    /// freed since `generation` was observed.
    pub fn get_checked(&self, index: usize, generation: Generation) -> StorageResult<&T> {
        self.check_generation(index, generation)?;
        self.try_get(index)
    }

    /// Mutable twin of [`Pool::get_checked`].
    ///
    /// # Errors
    ///
    /// Same as [`Pool::get_checked`].
    pub fn get_checked_mut(
        &mut self,
        index: usize,
        generation: Generation,
    ) -> StorageResult<&mut T> {
        self.check_generation(index, generation)?;
        self.try_get_mut(index)
    }

    fn check_generation(&self, index: usize, generation: Generation) -> StorageResult<()> {
        self.generation(index)
            .validate(index, self.is_used(index), generation)
    }

    /// Overwrites the value at a used slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range or free.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) {
        *self.get_mut(index) = value;
    }

    /// Frees a used slot, returning its value. The slot is reset to the
    /// initializer.
    ///
    /// # Errors
    ///
    /// Same as [`Pool::try_get`].
    pub fn try_remove(&mut self, index: usize) -> StorageResult<T> {
        self.check(index)?;
        self.used.remove(index);
        Ok(std::mem::replace(
            &mut self.data[index],
            self.initializer.clone(),
        ))
    }

    /// Frees a used slot, returning its value.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range or free.
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> T {
        match self.try_remove(index) {
            Ok(value) => value,
            Err(err) => fatal(err),
        }
    }

    /// Frees every used slot. Generations are kept.
    pub fn clear(&mut self) {
        for index in self.used.iter_ones() {
            self.data[index] = self.initializer.clone();
        }
        self.used.clear();
    }

    /// Iterates over `(index, value)` for used slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.used.iter_ones().map(|index| (index, &self.data[index]))
    }

    /// Iterates over `(index, mutable value)` for used slots in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> + '_ {
        let used = &self.used;
        self.data
            .iter_mut()
            .enumerate()
            .filter(move |(index, _)| used.contains(*index))
    }

    /// Index of the first used slot whose value matches `predicate`.
    pub fn position(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.iter()
            .find(|(_, value)| predicate(value))
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Particle {
        life: u32,
    }

    impl Default for Particle {
        fn default() -> Self {
            Self { life: 100 }
        }
    }

    #[test]
    fn test_alloc_returns_initialized_value() {
        let mut pool: Pool<Particle> = Pool::new(4);
        let (index, particle) = pool.alloc();
        assert_eq!(index, 0);
        assert_eq!(particle.life, 100);
        assert!(pool.is_used(0));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_remove_then_alloc_reuses_reset_slot() {
        let mut pool: Pool<Particle> = Pool::new(4);
        let (a, particle) = pool.alloc();
        particle.life = 3;
        let (_b, _) = pool.alloc();

        assert_eq!(pool.remove(a), Particle { life: 3 });
        assert!(!pool.is_used(a));

        let (again, particle) = pool.alloc();
        let particle = particle.clone();
        assert_eq!(again, a);
        assert_eq!(particle, *pool.initializer());
    }

    #[test]
    fn test_generation_detects_reuse() {
        let mut pool = Pool::with_initializer(2, 0u8);
        let (index, _) = pool.alloc();
        let first = pool.generation(index);

        pool.remove(index);
        pool.alloc();

        assert!(pool.get_checked(index, first).is_err());
        assert!(pool.get_checked(index, first.next()).is_ok());
    }

    #[test]
    fn test_grows_without_moving_indices() {
        let mut pool = Pool::with_initializer(2, 0u32);
        for value in 0..5 {
            let (index, slot) = pool.alloc();
            *slot = value;
            assert_eq!(index, value as usize);
        }
        assert!(pool.capacity() >= 5);
        assert_eq!(*pool.get(3), 3);
    }

    #[test]
    fn test_alloc_at_specific_index() {
        let mut pool = Pool::with_initializer(4, 'x');
        *pool.alloc_at(2) = 'y';
        assert_eq!(pool.free_index(), Some(0));
        assert_eq!(pool.try_alloc_at(2), Err(StorageError::SlotInUse(2)));
        assert_eq!(*pool.get(2), 'y');

        pool.alloc_at(9);
        assert!(pool.capacity() >= 10);
    }

    #[test]
    #[should_panic(expected = "slot 1 is not in use")]
    fn test_get_free_slot_is_fatal() {
        let pool = Pool::with_initializer(4, 0i64);
        let _ = pool.get(1);
    }

    #[test]
    fn test_set_and_position() {
        let mut pool = Pool::with_initializer(4, 0i32);
        pool.alloc();
        let (index, _) = pool.alloc();
        pool.set(index, 42);
        assert_eq!(pool.position(|v| *v == 42), Some(index));
        assert_eq!(pool.position(|v| *v == 7), None);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut pool = Pool::with_initializer(4, 1u16);
        for _ in 0..3 {
            let (_, value) = pool.alloc();
            *value = 9;
        }
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.iter().count(), 0);
        let (_, value) = pool.alloc();
        assert_eq!(*value, 1);
    }

    #[test]
    fn test_iter_mut_skips_free_slots() {
        let mut pool = Pool::with_initializer(4, 0u32);
        pool.alloc();
        let (middle, _) = pool.alloc();
        pool.alloc();
        pool.remove(middle);

        for (_, value) in pool.iter_mut() {
            *value += 1;
        }
        let indices: Vec<_> = pool.iter().map(|(i, v)| (i, *v)).collect();
        assert_eq!(indices, vec![(0, 1), (2, 1)]);
    }
}
