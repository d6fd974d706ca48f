//! # Slot Table
//!
//! Indirection between stable slot indices and positions in a packed dense
//! array.
//!
//! ```text
//! slots:  [ s0 ][ s1 ][ s2 ][ s3 ]      inner: slot -> dense position
//!            \     |     /               outer: dense position -> slot
//! dense:  [ d0 ][ d1 ][ d2 ]
//! ```
//!
//! Removing a value swaps the last dense element into the hole, so the
//! dense array never has gaps. The `outer` back-link tells us which slot
//! owned the moved element so its `inner` can be patched.
//!
//! Free slots form a singly linked FIFO list threaded through `inner`.
//! Recycling the oldest free slot first delays generation reuse.

use super::generation::Generation;
use crate::error::{StorageError, StorageResult};

/// Sentinel for "no slot" in links and back-links.
const NIL: u32 = u32::MAX;

/// Per-slot bookkeeping.
#[derive(Clone, Copy, Debug)]
struct SlotIndex {
    /// Dense position while used, next free slot while free.
    inner: u32,
    /// Slot owning the dense position equal to this slot's index.
    outer: u32,
    /// Bumped on every allocation of this slot.
    generation: Generation,
    /// Whether the slot currently owns a dense element.
    used: bool,
}

impl SlotIndex {
    const fn free(next: u32) -> Self {
        Self {
            inner: next,
            outer: NIL,
            generation: Generation::NONE,
            used: false,
        }
    }
}

/// A freshly allocated slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotAllocation {
    /// Stable slot index.
    pub slot: u32,
    /// Generation the slot was moved to.
    pub generation: Generation,
    /// Dense position the caller must write to (always the old live count).
    pub dense: usize,
}

/// Slot allocator with swap-compaction back-links and a FIFO free list.
///
/// The table only does bookkeeping; the owner keeps the dense values and
/// mirrors every allocation (`push`) and release (`swap_remove`).
#[derive(Clone, Debug)]
pub struct SlotTable {
    slots: Vec<SlotIndex>,
    /// Number of used slots, equal to the dense array length.
    live: usize,
    /// Dequeue end of the free list.
    free_head: u32,
    /// Enqueue end of the free list.
    free_tail: u32,
}

impl SlotTable {
    /// Creates a table with `capacity` free slots linked in index order.
    ///
    /// # Panics
    ///
    /// Panics if capacity does not fit in a `u32` slot index.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self {
            slots: Vec::with_capacity(capacity),
            live: 0,
            free_head: NIL,
            free_tail: NIL,
        };
        table.grow_to(capacity);
        table
    }

    /// Number of slots, used or free.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of used slots.
    #[inline]
    #[must_use]
    pub const fn live(&self) -> usize {
        self.live
    }

    /// Appends free slots until the table holds `capacity` of them.
    fn grow_to(&mut self, capacity: usize) {
        assert!(
            capacity < NIL as usize,
            "Slot table cannot exceed u32::MAX - 1 slots"
        );
        let start = self.slots.len();
        for index in start..capacity {
            let slot = index as u32;
            self.slots.push(SlotIndex::free(NIL));
            self.enqueue(slot);
        }
    }

    /// Appends a slot to the tail of the free list.
    fn enqueue(&mut self, slot: u32) {
        self.slots[slot as usize].inner = NIL;
        if self.free_tail == NIL {
            self.free_head = slot;
        } else {
            self.slots[self.free_tail as usize].inner = slot;
        }
        self.free_tail = slot;
    }

    /// Pops the head of the free list.
    fn dequeue(&mut self) -> Option<u32> {
        if self.free_head == NIL {
            return None;
        }
        let slot = self.free_head;
        self.free_head = self.slots[slot as usize].inner;
        if self.free_head == NIL {
            self.free_tail = NIL;
        }
        Some(slot)
    }

    /// Claims the oldest free slot, growing the table when none is left.
    pub fn allocate(&mut self) -> SlotAllocation {
        if self.free_head == NIL {
            let grown = (self.slots.len() * 2).max(4);
            tracing::debug!(from = self.slots.len(), to = grown, "slot table grown");
            self.grow_to(grown);
        }
        let Some(slot) = self.dequeue() else {
            unreachable!("free list is never empty after growth");
        };

        let dense = self.live;
        let entry = &mut self.slots[slot as usize];
        let generation = entry.generation.bump();
        entry.used = true;
        entry.inner = dense as u32;

        self.slots[dense].outer = slot;
        self.live += 1;

        SlotAllocation {
            slot,
            generation,
            dense,
        }
    }

    /// Resolves a slot and generation to a dense position.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IndexOutOfBounds`] for an unknown slot and
    /// [`StorageError::StaleHandle`] if the slot is free or was recycled.
    pub fn resolve(&self, slot: u32, generation: Generation) -> StorageResult<usize> {
        let entry = self
            .slots
            .get(slot as usize)
            .ok_or(StorageError::IndexOutOfBounds {
                index: slot as usize,
                len: self.slots.len(),
            })?;

        entry
            .generation
            .validate(slot as usize, entry.used, generation)?;

        let dense = entry.inner as usize;
        if dense >= self.live {
            return Err(StorageError::IndexOutOfBounds {
                index: dense,
                len: self.live,
            });
        }
        Ok(dense)
    }

    /// Releases a used slot and appends it to the free list.
    ///
    /// Returns the dense position that became vacant. The owner must
    /// `swap_remove` that position: the last dense element moves into it,
    /// and the moved element's slot has already been re-pointed here.
    pub fn release(&mut self, slot: u32) -> usize {
        let dense = self.slots[slot as usize].inner as usize;
        let last = self.live - 1;

        if dense != last {
            let moved = self.slots[last].outer;
            self.slots[moved as usize].inner = dense as u32;
            self.slots[dense].outer = moved;
        }
        self.slots[last].outer = NIL;

        self.slots[slot as usize].used = false;
        self.enqueue(slot);
        self.live -= 1;
        dense
    }

    /// Returns the slot owning a dense position.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, dense: usize) -> u32 {
        self.slots[dense].outer
    }

    /// Current generation of a slot.
    #[inline]
    #[must_use]
    pub fn generation(&self, slot: u32) -> Generation {
        self.slots
            .get(slot as usize)
            .map_or(Generation::NONE, |entry| entry.generation)
    }

    /// Frees every slot. Generations are kept so old handles stay stale.
    pub fn clear(&mut self) {
        self.free_head = NIL;
        self.free_tail = NIL;
        self.live = 0;
        for slot in 0..self.slots.len() as u32 {
            let entry = &mut self.slots[slot as usize];
            entry.used = false;
            entry.outer = NIL;
            self.enqueue(slot);
        }
    }
}
