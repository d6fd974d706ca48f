//! # Handle Map
//!
//! Dense storage addressed through generation-checked handles.
//!
//! ## Performance
//!
//! - Insert: O(1), amortized when the slot table has to grow
//! - Lookup: O(1), two indirections
//! - Remove: O(1), swap-remove keeps the values contiguous
//!
//! References returned by [`HandleMap::get`] are invalidated by the next
//! `remove`, because the last value is moved into the hole.

use super::handle::{Handle, HandleId};
use super::slots::SlotTable;
use crate::error::{fatal, StorageError, StorageResult};
use crate::type_tag::type_tag;

/// Default number of slots of [`HandleMap::new`].
pub const DEFAULT_CAPACITY: usize = 100;

/// Generation-checked slot allocator over a packed value array.
///
/// # Example
///
/// ```rust
/// use tessera_core::HandleMap;
///
/// let mut meshes = HandleMap::with_capacity(4);
/// let cube = meshes.insert("cube");
/// assert_eq!(meshes.get(cube), &"cube");
///
/// assert!(meshes.remove(cube).is_some());
/// assert!(!meshes.is_valid(cube));
/// ```
#[derive(Clone, Debug)]
pub struct HandleMap<T> {
    table: SlotTable,
    dense: Vec<T>,
    tag: u16,
}

impl<T: 'static> HandleMap<T> {
    /// Creates a map with [`DEFAULT_CAPACITY`] slots.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a map with `capacity` free slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: SlotTable::with_capacity(capacity),
            dense: Vec::with_capacity(capacity),
            tag: type_tag::<T>(),
        }
    }
}

impl<T: 'static> Default for HandleMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleMap<T> {
    /// Type tag stamped into every handle this map issues.
    #[inline]
    #[must_use]
    pub const fn type_tag(&self) -> u16 {
        self.tag
    }

    /// Number of live values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if no value is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Number of slots, used or free.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Stores a value and returns its handle.
    ///
    /// Recycles the oldest free slot with a bumped generation. When no
    /// slot is free the table grows.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        let allocation = self.table.allocate();
        debug_assert_eq!(allocation.dense, self.dense.len());
        self.dense.push(value);
        Handle::from_id(HandleId::new(
            allocation.slot,
            allocation.generation,
            self.tag,
        ))
    }

    /// Resolves a handle to its dense position.
    fn resolve(&self, handle: Handle<T>) -> StorageResult<usize> {
        if handle.type_tag() != self.tag {
            return Err(StorageError::ForeignHandle {
                expected: self.tag,
                found: handle.type_tag(),
            });
        }
        self.table.resolve(handle.index(), handle.generation())
    }

    /// Checks a handle without asserting.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Removes the value behind `handle`.
    ///
    /// Returns `None` for a handle that is not valid; that is not an error.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        self.resolve(handle).ok()?;
        let dense = self.table.release(handle.index());
        Some(self.dense.swap_remove(dense))
    }

    /// Returns the value behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ForeignHandle`] or
    /// [`StorageError::StaleHandle`] when the handle does not match.
    pub fn try_get(&self, handle: Handle<T>) -> StorageResult<&T> {
        let dense = self.resolve(handle)?;
        Ok(&self.dense[dense])
    }

    /// Returns the mutable value behind `handle`.
    ///
    /// # Errors
    ///
    /// Same as [`HandleMap::try_get`].
    pub fn try_get_mut(&mut self, handle: Handle<T>) -> StorageResult<&mut T> {
        let dense = self.resolve(handle)?;
        Ok(&mut self.dense[dense])
    }

    /// Returns the value behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics on a stale or foreign handle.
    #[track_caller]
    #[must_use]
    pub fn get(&self, handle: Handle<T>) -> &T {
        match self.try_get(handle) {
            Ok(value) => value,
            Err(err) => fatal(err),
        }
    }

    /// Returns the mutable value behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics on a stale or foreign handle.
    #[track_caller]
    pub fn get_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.try_get_mut(handle) {
            Ok(value) => value,
            Err(err) => fatal(err),
        }
    }

    /// Drops every value. Outstanding handles become stale.
    pub fn clear(&mut self) {
        self.table.clear();
        self.dense.clear();
    }

    /// Live values in dense order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.dense
    }

    /// Live values in dense order, mutably.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// Rebuilds the handle of the value at a dense position.
    fn handle_at(table: &SlotTable, tag: u16, dense: usize) -> Handle<T> {
        let slot = table.slot_of(dense);
        Handle::from_id(HandleId::new(slot, table.generation(slot), tag))
    }

    /// Iterates over `(handle, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.dense
            .iter()
            .enumerate()
            .map(|(dense, value)| (Self::handle_at(&self.table, self.tag, dense), value))
    }

    /// Iterates over `(handle, mutable value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> + '_ {
        let Self { table, dense, tag } = self;
        let (table, tag) = (&*table, *tag);
        dense
            .iter_mut()
            .enumerate()
            .map(move |(index, value)| (Self::handle_at(table, tag, index), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut map = HandleMap::with_capacity(4);
        let a = map.insert(1u32);
        let b = map.insert(2u32);
        assert_eq!(*map.get(a), 1);
        assert_eq!(*map.get(b), 2);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_recycled_slot_gets_new_generation() {
        let mut map = HandleMap::with_capacity(4);
        let handles: Vec<_> = [10, 20, 30, 40].into_iter().map(|v| map.insert(v)).collect();

        assert_eq!(map.remove(handles[1]), Some(20));
        let recycled = map.insert(50);

        assert_eq!(recycled.index(), handles[1].index());
        assert_eq!(recycled.generation(), handles[1].generation().next());
        assert_eq!(*map.get(handles[0]), 10);
        assert!(!map.is_valid(handles[1]));
        assert_eq!(*map.get(recycled), 50);
    }

    #[test]
    fn test_remove_keeps_other_handles_valid() {
        let mut map = HandleMap::with_capacity(8);
        let handles: Vec<_> = (0..5).map(|v| map.insert(v)).collect();

        map.remove(handles[0]);

        for (i, handle) in handles.iter().enumerate().skip(1) {
            assert_eq!(*map.get(*handle), i);
        }
        assert_eq!(map.values().len(), 4);
    }

    #[test]
    fn test_double_remove_is_noop() {
        let mut map = HandleMap::with_capacity(2);
        let handle = map.insert("x");
        assert!(map.remove(handle).is_some());
        assert!(map.remove(handle).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut words: HandleMap<&str> = HandleMap::with_capacity(2);
        let numbers: HandleMap<u64> = HandleMap::with_capacity(2);
        let word = words.insert("hello");

        let forged: Handle<u64> = Handle::from_id(word.id());
        assert!(!numbers.is_valid(forged));
        assert!(matches!(
            numbers.try_get(forged),
            Err(StorageError::ForeignHandle { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "stale handle")]
    fn test_get_stale_handle_is_fatal() {
        let mut map = HandleMap::with_capacity(2);
        let handle = map.insert(1u8);
        map.remove(handle);
        let _ = map.get(handle);
    }

    #[test]
    fn test_null_handle_is_never_valid() {
        let mut map: HandleMap<u8> = HandleMap::with_capacity(2);
        map.insert(1);
        assert!(!map.is_valid(Handle::NULL));
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut map = HandleMap::with_capacity(2);
        let handles: Vec<_> = (0..10).map(|v| map.insert(v)).collect();
        assert!(map.capacity() >= 10);
        for (v, handle) in handles.into_iter().enumerate() {
            assert_eq!(*map.get(handle), v);
        }
    }

    #[test]
    fn test_iter_yields_matching_handles() {
        let mut map = HandleMap::with_capacity(4);
        let a = map.insert('a');
        let b = map.insert('b');
        map.remove(a);
        let c = map.insert('c');

        let mut seen: Vec<_> = map.iter().map(|(h, v)| (h, *v)).collect();
        seen.sort_by_key(|(_, v)| *v);
        assert_eq!(seen, vec![(b, 'b'), (c, 'c')]);

        for (_, value) in map.iter_mut() {
            *value = value.to_ascii_uppercase();
        }
        assert_eq!(*map.get(c), 'C');
    }

    #[test]
    fn test_iter_mut_handles_match_iter() {
        let mut map = HandleMap::with_capacity(8);
        let handles: Vec<_> = (0..5u32).map(|v| map.insert(v)).collect();
        map.remove(handles[1]);
        map.remove(handles[3]);
        map.insert(40);

        let shared: Vec<_> = map.iter().map(|(handle, _)| handle).collect();
        let mut exclusive = Vec::new();
        for (handle, value) in map.iter_mut() {
            *value += 100;
            exclusive.push(handle);
        }
        assert_eq!(shared, exclusive);
        for handle in exclusive {
            assert!(*map.get(handle) >= 100);
        }

        let mut first = map.iter_mut().take(1);
        assert!(first.next().is_some());
        assert!(first.next().is_none());
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut map = HandleMap::with_capacity(4);
        let handle = map.insert(5u16);
        map.clear();
        assert!(map.is_empty());
        assert!(!map.is_valid(handle));
    }
}
