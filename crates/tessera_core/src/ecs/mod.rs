//! # Entity Component System
//!
//! A sparse-set-lite ECS: one pool per component type plus a per-entity
//! table of component handles.
//!
//! ## Design
//!
//! - Entities are random ids; liveness is a registry lookup
//! - Component types get a mask bit on first use, per world
//! - Queries test entity masks, then fetch from the typed pools
//! - Lifecycle changes are broadcast to channel subscribers
//! - Systems run phase hooks against a world in insertion order

pub mod component;
pub mod entity;
pub mod erased;
pub mod events;
pub mod mask;
pub mod query;
pub mod system;
mod world;

pub use component::{Component, ComponentHandle, ComponentRegistry, ComponentView};
pub use entity::{Entity, EntityId};
pub use erased::{ErasedPool, PoolMap};
pub use events::{EcsEvent, EventBus, EventHub, EventReceiver, EventSender, SendStatus};
pub use mask::ComponentMask;
pub use query::Query;
pub use system::{AsAny, System, SystemManager};
pub use world::World;
