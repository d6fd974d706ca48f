//! # Memory
//!
//! Handle-addressed containers:
//!
//! - [`HandleMap`]: packed values behind generation-checked handles
//! - [`Pool`]: stable indices with a used bitset, for component storage
//! - [`SlotTable`]: the slot bookkeeping shared by handle-based storage

pub mod bitset;
pub mod generation;
pub mod handle;
pub mod handle_map;
pub mod pool;
pub mod slots;

pub use bitset::BitSet;
pub use generation::Generation;
pub use handle::{Handle, HandleId};
pub use handle_map::HandleMap;
pub use pool::Pool;
pub use slots::{SlotAllocation, SlotTable};
