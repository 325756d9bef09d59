//! Specialized collection types
//!
//! The generational [`SlotMap`] is the storage backbone for every spatial
//! index in the engine: indices only ever hold [`SlotId`]s, never references
//! into the dense value array.

mod slot_id;
mod slot_map;

pub use slot_id::SlotId;
pub use slot_map::{Iter, IterMut, SlotMap, SlotMapError};
