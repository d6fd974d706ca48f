//! # Type Tags
//!
//! A small integer per Rust type, embedded in every handle so a handle issued
//! by a `HandleMap<A>` is rejected by a `HandleMap<B>`.
//!
//! Tags are assigned on first request, in request order, and live for the
//! rest of the process. Tag 0 is never issued.

use std::any::{type_name, TypeId};

use parking_lot::Mutex;

use crate::collections::HashMap;

/// Registry state: assigned tags and the next free one.
struct Registry {
    tags: HashMap<TypeId, u16>,
    next: u16,
}

static REGISTRY: Mutex<Option<Registry>> = parking_lot::const_mutex(None);

/// Returns the process-wide tag of `T`.
///
/// # Panics
///
/// Panics once more than `u16::MAX` distinct types have asked for a tag.
#[must_use]
pub fn type_tag<T: 'static>() -> u16 {
    let id = TypeId::of::<T>();
    let mut guard = REGISTRY.lock();
    let registry = guard.get_or_insert_with(|| Registry {
        tags: HashMap::with_capacity(64),
        next: 1,
    });

    if let Some(&tag) = registry.tags.get(&id) {
        return tag;
    }

    let tag = registry.next;
    assert!(tag != 0, "type tag space exhausted");
    registry.next = tag.wrapping_add(1);
    registry.tags.insert(id, tag);
    tracing::debug!(ty = type_name::<T>(), tag, "type tag assigned");
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[test]
    fn test_tags_are_stable_and_distinct() {
        let alpha = type_tag::<Alpha>();
        let beta = type_tag::<Beta>();

        assert_ne!(alpha, 0);
        assert_ne!(beta, 0);
        assert_ne!(alpha, beta);
        assert_eq!(type_tag::<Alpha>(), alpha);
    }

    #[test]
    fn test_generic_instantiations_differ() {
        assert_ne!(type_tag::<Vec<u8>>(), type_tag::<Vec<u16>>());
    }
}
