//! # Storage Scenarios
//!
//! End-to-end behavior of the handle map, the hash map and the pool through
//! the public API only.

use std::hash::{BuildHasherDefault, Hasher};

use tessera_core::{Handle, HandleMap, HashMap, Pool, StorageError};

/// Hashes integers to themselves so bucket placement is predictable.
#[derive(Default)]
struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = (self.0 << 8) | u64::from(*byte);
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

type IdentityMap<V> = HashMap<u64, V, BuildHasherDefault<IdentityHasher>>;

// =============================================================================
// HANDLE MAP
// =============================================================================

#[test]
fn handle_map_recycles_slot_with_next_generation() {
    let mut map: HandleMap<i32> = HandleMap::with_capacity(4);
    let h: Vec<Handle<i32>> = [10, 20, 30, 40].into_iter().map(|v| map.insert(v)).collect();

    assert!(map.remove(h[1]).is_some());
    let h4 = map.insert(50);

    assert_eq!(h4.index(), h[1].index());
    assert_eq!(h4.generation(), h[1].generation().next());
    assert_eq!(*map.get(h[0]), 10);
    assert!(!map.is_valid(h[1]));
    assert_eq!(*map.get(h4), 50);
    assert_eq!(map.len(), 4);
}

#[test]
fn handle_map_handles_stay_valid_until_removed() {
    let mut map = HandleMap::with_capacity(8);
    let handles: Vec<_> = (0..32u32).map(|v| map.insert(v)).collect();

    for handle in handles.iter().step_by(3) {
        assert!(map.remove(*handle).is_some());
    }

    for (value, handle) in handles.iter().enumerate() {
        if value % 3 == 0 {
            assert!(!map.is_valid(*handle));
            assert!(map.try_get(*handle).is_err());
        } else {
            assert_eq!(*map.get(*handle) as usize, value);
        }
    }
}

#[test]
fn handle_map_same_slot_never_valid_twice() {
    let mut map = HandleMap::with_capacity(1);
    let old = map.insert("old");
    map.remove(old);
    let new = map.insert("new");

    assert_eq!(old.index(), new.index());
    assert!(!map.is_valid(old));
    assert!(map.is_valid(new));
    assert!(matches!(
        map.try_get(old),
        Err(StorageError::StaleHandle { .. })
    ));
}

// =============================================================================
// HASH MAP
// =============================================================================

#[test]
fn hash_map_colliding_chain_survives_removal() {
    let mut map: IdentityMap<&str> = HashMap::with_capacity(8);
    map.insert(3, "three");
    map.insert(11, "eleven");
    map.insert(5, "five");

    assert_eq!(map.get(&3), Some(&"three"));
    assert_eq!(map.get(&11), Some(&"eleven"));
    assert_eq!(map.get(&5), Some(&"five"));

    assert_eq!(map.remove(&3), Some("three"));
    assert_eq!(map.get(&11), Some(&"eleven"));
    assert_eq!(map.get(&5), Some(&"five"));
    assert_eq!(map.get(&3), None);
}

#[test]
fn hash_map_insert_then_find_returns_pair() {
    let mut map: HashMap<String, usize> = HashMap::new();
    for i in 0..500 {
        map.insert(format!("key-{i}"), i);
    }
    for i in 0..500 {
        let index = map.find(format!("key-{i}").as_str()).unwrap();
        let pair = map.bucket(index).unwrap();
        assert_eq!(pair.key, format!("key-{i}"));
        assert_eq!(pair.value, i);
    }
    assert_eq!(map.len(), 500);
}

#[test]
fn hash_map_interleaved_removal_keeps_every_survivor() {
    let mut map: IdentityMap<u64> = HashMap::with_capacity(16);
    // Long chains around buckets 0 and 15 that wrap into each other.
    let keys: Vec<u64> = (0..6).flat_map(|i| [i * 32, i * 32 + 15]).collect();
    for &key in &keys {
        map.insert(key, key * 10);
    }

    for &key in keys.iter().step_by(2) {
        assert_eq!(map.remove(&key), Some(key * 10));
    }
    for &key in keys.iter().skip(1).step_by(2) {
        assert_eq!(map.get(&key), Some(&(key * 10)));
    }
}

#[test]
fn hash_map_auto_insert_default() {
    let mut counts: HashMap<char, u32> = HashMap::with_capacity(8);
    for c in "abracadabra".chars() {
        *counts.get_or_insert_default(c) += 1;
    }
    assert_eq!(counts[&'a'], 5);
    assert_eq!(counts[&'b'], 2);
    assert_eq!(counts[&'r'], 2);
    assert!(!counts.contains_key(&'z'));
}

// =============================================================================
// POOL
// =============================================================================

#[test]
fn pool_reuses_freed_slot_with_initializer() {
    let mut pool = Pool::with_initializer(4, String::from("fresh"));
    let (first, value) = pool.alloc();
    value.push_str("-used");

    assert_eq!(pool.remove(first), "fresh-used");
    let (again, value) = pool.alloc();
    assert_eq!(again, first);
    assert_eq!(*value, "fresh");
}

#[test]
fn pool_indices_are_stable_across_growth() {
    let mut pool: Pool<u64> = Pool::new(1);
    let indices: Vec<usize> = (0..100u64)
        .map(|value| {
            let (index, slot) = pool.alloc();
            *slot = value;
            index
        })
        .collect();

    for (value, index) in indices.into_iter().enumerate() {
        assert_eq!(*pool.get(index), value as u64);
    }
}
