//! # Collections
//!
//! The open-addressing [`HashMap`] used as the engine's general key/value
//! store, and the deterministic hasher it defaults to.

pub mod hash_map;
pub mod hasher;

pub use hash_map::{GrowthPolicy, HashMap, HashMapPair};
pub use hasher::SipBuildHasher;
