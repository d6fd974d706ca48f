//! # Bit Set
//!
//! Word-packed occupancy bits, 64 slots per `u64`.
//!
//! ## Performance
//!
//! - Set / clear / test: O(1)
//! - First free bit: O(n/64)
//! - Clear all: O(n/64)

/// Number of bits stored per word.
const WORD_BITS: usize = 64;

/// A growable set of bits indexed by slot.
#[derive(Clone, Debug, Default)]
pub struct BitSet {
    /// 1 = set, 0 = clear. 64 slots per word.
    words: Vec<u64>,
    /// Number of addressable bits.
    len: usize,
    /// Cached number of set bits.
    ones: usize,
}

impl BitSet {
    /// Creates a bit set with `len` cleared bits.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
            ones: 0,
        }
    }

    /// Number of addressable bits.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the set addresses no bits at all.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bits currently set.
    #[inline]
    #[must_use]
    pub const fn count_ones(&self) -> usize {
        self.ones
    }

    /// Tests a bit. Out-of-range bits read as clear.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    /// Sets a bit, returning `true` if it was previously clear.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        debug_assert!(index < self.len, "Index out of bounds");
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        let was_clear = *word & mask == 0;
        *word |= mask;
        if was_clear {
            self.ones += 1;
        }
        was_clear
    }

    /// Clears a bit, returning `true` if it was previously set.
    #[inline]
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        let was_set = *word & mask != 0;
        *word &= !mask;
        if was_set {
            self.ones -= 1;
        }
        was_set
    }

    /// Returns the lowest clear bit, if any.
    #[must_use]
    pub fn first_clear(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u64::MAX)
            .map(|(i, word)| i * WORD_BITS + word.trailing_ones() as usize)
            .filter(|&index| index < self.len)
    }

    /// Extends the set to `len` bits. New bits are clear.
    pub fn grow(&mut self, len: usize) {
        if len <= self.len {
            return;
        }
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        self.len = len;
    }

    /// Clears every bit without shrinking.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
        self.ones = 0;
    }

    /// Iterates over the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }
}
