//! # Open-Addressing Hash Map
//!
//! All entries live in one bucket array. Collisions are resolved by linear
//! probing, and removal uses backward-shift deletion so no tombstones are
//! ever left behind:
//!
//! ```text
//! remove B (ideal 1):
//!   [ _ | B | C | D | _ ]     C ideal 1, D ideal 3
//!   [ _ | C | _ | D | _ ]     C shifts into the gap
//!                             D stays: its ideal bucket is past the gap
//! ```
//!
//! A stored hash is never 0, so the empty sentinel can never be confused
//! with a real entry.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::hasher::SipBuildHasher;
use crate::error::{fatal, StorageError, StorageResult};

/// Hash value reserved for "no entry".
pub const EMPTY_HASH: u64 = 0;

/// When and how fast a [`HashMap`] grows.
///
/// Small tables favour fewer, larger rehashes; above
/// `iter_capacity_threshold` full-table operations get expensive, so the
/// stricter divisors kick in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthPolicy {
    /// Bucket count of a map created without an explicit capacity.
    pub initial_capacity: usize,
    /// Capacity up to which the permissive divisors apply.
    pub iter_capacity_threshold: usize,
    /// Grow when `count >= capacity / iter_count_div` (small tables).
    pub iter_count_div: usize,
    /// Grow when `collisions >= capacity / iter_collisions_div` (small tables).
    pub iter_collisions_div: usize,
    /// Grow when `count >= capacity / count_div` (large tables).
    pub count_div: usize,
    /// Grow when `collisions >= capacity / collisions_div` (large tables).
    pub collisions_div: usize,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            initial_capacity: 100,
            iter_capacity_threshold: 1000,
            iter_count_div: 1,
            iter_collisions_div: 2,
            count_div: 2,
            collisions_div: 4,
        }
    }
}

impl GrowthPolicy {
    /// Decides whether a table must grow before the next insert.
    #[inline]
    #[must_use]
    pub const fn should_grow(&self, count: usize, collisions: usize, capacity: usize) -> bool {
        // A full table cannot take another entry, whatever the divisors say.
        if count + 1 > capacity {
            return true;
        }
        let (count_div, collisions_div) = if capacity <= self.iter_capacity_threshold {
            (self.iter_count_div, self.iter_collisions_div)
        } else {
            (self.count_div, self.collisions_div)
        };
        count >= capacity / nonzero(count_div) || collisions >= capacity / nonzero(collisions_div)
    }

    /// Capacity after one growth step.
    #[inline]
    #[must_use]
    pub const fn grown(capacity: usize) -> usize {
        capacity + capacity
    }
}

const fn nonzero(div: usize) -> usize {
    if div == 0 {
        1
    } else {
        div
    }
}

/// An occupied bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashMapPair<K, V> {
    /// Cached hash of `key`. Never [`EMPTY_HASH`].
    pub hash: u64,
    /// The key.
    pub key: K,
    /// The value.
    pub value: V,
}

/// Open-addressing hash map with linear probing.
///
/// Probing compares the stored hash first and the key second, so distinct
/// keys that share a hash coexist. Inserting a key that is already present
/// is an invariant violation: remove it first or use [`HashMap::upsert`].
///
/// # Example
///
/// ```rust
/// use tessera_core::HashMap;
///
/// let mut map: HashMap<u32, &str> = HashMap::with_capacity(8);
/// map.insert(7, "seven");
/// assert_eq!(map.get(&7), Some(&"seven"));
/// assert_eq!(map.remove(&7), Some("seven"));
/// assert!(map.is_empty());
/// ```
#[derive(Clone)]
pub struct HashMap<K, V, S = SipBuildHasher> {
    buckets: Vec<Option<HashMapPair<K, V>>>,
    count: usize,
    /// Sum of every live entry's distance from its ideal bucket.
    collisions: usize,
    policy: GrowthPolicy,
    hasher: S,
}

impl<K, V, S: Default> HashMap<K, V, S> {
    /// Creates a map using the default growth policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(GrowthPolicy::default())
    }

    /// Creates a map with `capacity` buckets.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }

    /// Creates a map using `policy` for its initial size and growth.
    #[must_use]
    pub fn with_policy(policy: GrowthPolicy) -> Self {
        Self::with_policy_and_hasher(policy, S::default())
    }
}

impl<K, V, S: Default> Default for HashMap<K, V, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates a map with `capacity` buckets and an explicit hasher.
    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        let policy = GrowthPolicy {
            initial_capacity: capacity,
            ..GrowthPolicy::default()
        };
        Self::with_policy_and_hasher(policy, hasher)
    }

    /// Creates a map from a growth policy and an explicit hasher.
    #[must_use]
    pub fn with_policy_and_hasher(policy: GrowthPolicy, hasher: S) -> Self {
        Self {
            buckets: empty_buckets(policy.initial_capacity.max(1)),
            count: 0,
            collisions: 0,
            policy,
            hasher,
        }
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of buckets.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Sum of every live entry's distance from its ideal bucket.
    ///
    /// Removals give displacement back, so a table whose population stays
    /// flat under churn does not grow.
    #[inline]
    #[must_use]
    pub const fn collisions(&self) -> usize {
        self.collisions
    }

    /// The growth policy in effect.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> &GrowthPolicy {
        &self.policy
    }

    /// Returns the occupied bucket at `index`, if any.
    #[inline]
    #[must_use]
    pub fn bucket(&self, index: usize) -> Option<&HashMapPair<K, V>> {
        self.buckets.get(index)?.as_ref()
    }

    /// Drops every entry, keeping the bucket array.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = None;
        }
        self.count = 0;
        self.collisions = 0;
    }

    /// Iterates over occupied buckets in bucket order.
    pub fn pairs(&self) -> impl Iterator<Item = &HashMapPair<K, V>> {
        self.buckets.iter().filter_map(Option::as_ref)
    }

    /// Iterates over `(key, value)` pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.pairs().map(|pair| (&pair.key, &pair.value))
    }

    /// Iterates over `(key, mutable value)` pairs in bucket order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.buckets
            .iter_mut()
            .filter_map(Option::as_mut)
            .map(|pair| (&pair.key, &mut pair.value))
    }

    /// Iterates over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.pairs().map(|pair| &pair.key)
    }

    /// Iterates over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.pairs().map(|pair| &pair.value)
    }

    /// Iterates over mutable values.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.iter_mut().map(|(_, value)| value)
    }

    #[inline]
    fn ideal(hash: u64, capacity: usize) -> usize {
        (hash % capacity as u64) as usize
    }

    #[inline]
    fn next(index: usize, capacity: usize) -> usize {
        (index + 1) % capacity
    }

    /// How far bucket `index` lies past `hash`'s ideal bucket.
    #[inline]
    fn displacement(hash: u64, index: usize, capacity: usize) -> usize {
        (index + capacity - Self::ideal(hash, capacity)) % capacity
    }

    /// Removes the entry in bucket `index`.
    ///
    /// # Panics
    ///
    /// Panics if the bucket is empty or out of range.
    #[track_caller]
    pub fn remove_at(&mut self, index: usize) -> (K, V) {
        let len = self.buckets.len();
        let Some(bucket) = self.buckets.get_mut(index) else {
            fatal(StorageError::IndexOutOfBounds { index, len });
        };
        let Some(pair) = bucket.take() else {
            fatal(StorageError::SlotNotUsed(index));
        };
        self.count -= 1;
        self.collisions = self
            .collisions
            .saturating_sub(Self::displacement(pair.hash, index, len));
        self.reorganize(index);
        (pair.key, pair.value)
    }

    /// Backward-shift deletion starting at the vacated bucket `gap`.
    ///
    /// Every entry in the following run whose probe path covers the gap
    /// moves into it; the gap then continues from the moved entry's old
    /// position. The run always ends because the gap itself is empty.
    fn reorganize(&mut self, mut gap: usize) {
        let capacity = self.buckets.len();
        let mut next = Self::next(gap, capacity);

        while let Some(pair) = &self.buckets[next] {
            let displacement = Self::displacement(pair.hash, next, capacity);
            let distance_to_gap = (next + capacity - gap) % capacity;

            if displacement >= distance_to_gap {
                self.buckets[gap] = self.buckets[next].take();
                self.collisions = self.collisions.saturating_sub(distance_to_gap);
                gap = next;
            }
            next = Self::next(next, capacity);
        }
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Hashes a key, remapping the reserved empty value.
    #[inline]
    fn hash_of<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        match self.hasher.hash_one(key) {
            EMPTY_HASH => 1,
            hash => hash,
        }
    }

    /// Finds the bucket holding `key`.
    ///
    /// Probing stops at the first empty bucket or after a full loop.
    #[must_use]
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        let capacity = self.buckets.len();
        let start = Self::ideal(hash, capacity);
        let mut index = start;

        loop {
            let pair = self.buckets[index].as_ref()?;
            if pair.hash == hash && pair.key.borrow() == key {
                return Some(index);
            }
            index = Self::next(index, capacity);
            if index == start {
                return None;
            }
        }
    }

    /// Returns `true` if the map holds `key`.
    #[inline]
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        self.buckets[index].as_ref().map(|pair| &pair.value)
    }

    /// Returns the mutable value stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        self.buckets[index].as_mut().map(|pair| &mut pair.value)
    }

    /// Inserts a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateKey`] if `key` is already present.
    /// A rejected key leaves the table untouched, growth included.
    pub fn try_insert(&mut self, key: K, value: V) -> StorageResult<&mut V> {
        if self.contains_key(&key) {
            return Err(StorageError::DuplicateKey);
        }
        if self
            .policy
            .should_grow(self.count, self.collisions, self.buckets.len())
        {
            self.reserve(GrowthPolicy::grown(self.buckets.len()));
        }

        let hash = self.hash_of(&key);
        let capacity = self.buckets.len();
        let mut index = Self::ideal(hash, capacity);
        let mut steps = 0;

        while self.buckets[index].is_some() {
            index = Self::next(index, capacity);
            steps += 1;
        }

        self.collisions += steps;
        self.count += 1;
        let pair = self.buckets[index].insert(HashMapPair { hash, key, value });
        Ok(&mut pair.value)
    }

    /// Inserts a new entry and returns its value.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already present.
    #[track_caller]
    pub fn insert(&mut self, key: K, value: V) -> &mut V {
        match self.try_insert(key, value) {
            Ok(value) => value,
            Err(err) => fatal(err),
        }
    }

    /// Inserts or replaces, returning the previous value.
    pub fn upsert(&mut self, key: K, value: V) -> Option<V> {
        match self.find(&key) {
            Some(index) => self.buckets[index]
                .as_mut()
                .map(|pair| std::mem::replace(&mut pair.value, value)),
            None => {
                self.insert(key, value);
                None
            }
        }
    }

    /// Returns the value under `key`, inserting `make()` if absent.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        match self.find(&key) {
            Some(index) => match self.buckets[index].as_mut() {
                Some(pair) => &mut pair.value,
                None => unreachable!("find returned an empty bucket"),
            },
            None => self.insert(key, make()),
        }
    }

    /// Returns the value under `key`, inserting `V::default()` if absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        Some(self.remove_at(index).1)
    }

    /// Rehashes into `new_capacity` buckets. Never shrinks.
    ///
    /// Each entry keeps its cached hash and lands at `hash % new_capacity`.
    /// The collision counter is recomputed for the new layout.
    pub fn reserve(&mut self, new_capacity: usize) {
        let old_capacity = self.buckets.len();
        if new_capacity <= old_capacity {
            return;
        }

        let old = std::mem::replace(&mut self.buckets, empty_buckets(new_capacity));
        self.collisions = 0;

        for pair in old.into_iter().flatten() {
            let mut index = Self::ideal(pair.hash, new_capacity);
            while self.buckets[index].is_some() {
                index = Self::next(index, new_capacity);
                self.collisions += 1;
            }
            self.buckets[index] = Some(pair);
        }

        tracing::debug!(
            from = old_capacity,
            to = new_capacity,
            count = self.count,
            collisions = self.collisions,
            "hash map rehashed"
        );
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Vec<Option<HashMapPair<K, V>>> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

impl<K, Q, V, S> Index<&Q> for HashMap<K, V, S>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    type Output = V;

    #[track_caller]
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => fatal(StorageError::MissingKey),
        }
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.upsert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
