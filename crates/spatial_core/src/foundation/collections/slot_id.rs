//! Generation-counted handle into a [`SlotMap`](super::SlotMap)

use std::fmt;

/// Handle pairing a slot index with the generation it was issued at
///
/// The pair is packed as `(index << 32) | generation`, and equality, ordering
/// and hashing all operate on that packed value. A generation of zero is
/// reserved for handles that were never allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId {
    value: u64,
}

impl SlotId {
    /// Handle that never refers to live data
    pub const INVALID: Self = Self { value: 0 };

    /// Create a handle from a slot index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            value: ((index as u64) << 32) | generation as u64,
        }
    }

    /// Rebuild a handle from its packed form
    #[inline]
    pub const fn from_value(value: u64) -> Self {
        Self { value }
    }

    /// Slot index in the indirection table
    #[inline]
    pub const fn index(&self) -> u32 {
        (self.value >> 32) as u32
    }

    /// Generation this handle was issued at
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.value as u32
    }

    /// Packed `(index << 32) | generation` form
    #[inline]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Whether this handle was ever issued (generation is non-zero)
    ///
    /// This says nothing about whether the slot is still alive; use
    /// [`SlotMap::exists`](super::SlotMap::exists) for that.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.generation() != 0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index(), self.generation())
    }
}

impl From<SlotId> for u64 {
    fn from(id: SlotId) -> Self {
        id.value
    }
}
