//! # TESSERA Core
//!
//! Handle-based object storage for a real-time engine:
//! - Generation-checked handles instead of pointers
//! - Open-addressing hash map with backward-shift deletion
//! - Stable-index component pools
//! - A sparse-set-lite entity/component registry
//!
//! ## Architecture Rules
//!
//! 1. **Stale handles are detected** - every access checks the generation
//! 2. **Dense storage** - values live in contiguous arrays
//! 3. **No hidden globals** - a [`World`] owns all of its tables
//!
//! ## Failure Model
//!
//! Broken invariants (stale handle, missing component, duplicate key) are
//! bugs: the plain operations log them and panic. Every such operation has
//! a `try_*` twin returning [`StorageError`] instead.
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{HandleMap, HashMap};
//!
//! let mut textures = HandleMap::with_capacity(16);
//! let grass = textures.insert("grass.png");
//!
//! let mut by_name: HashMap<&str, _> = HashMap::with_capacity(16);
//! by_name.insert("grass", grass);
//!
//! assert_eq!(textures.get(by_name["grass"]), &"grass.png");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod collections;
pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod type_tag;

pub use collections::{GrowthPolicy, HashMap, HashMapPair, SipBuildHasher};
pub use config::{EcsConfig, StorageConfig};
pub use ecs::{Component, ComponentMask, Entity, EntityId, System, SystemManager, World};
pub use error::{ConfigError, StorageError, StorageResult};
pub use memory::{Generation, Handle, HandleId, HandleMap, Pool};
pub use type_tag::type_tag;
