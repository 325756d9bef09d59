//! Dense generational slot map
//!
//! Values live contiguously in a dense array that is compacted with
//! swap-and-pop on removal. External code holds [`SlotId`] handles which go
//! through an indirection table, so handles stay valid while the dense array
//! is reordered, and become detectably stale once their slot is erased.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::{Index, IndexMut};

use thiserror::Error;

use super::SlotId;

/// Marks an indirection entry whose slot is on the free list
const FREE_SLOT: u32 = u32::MAX;

/// Slot map access errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotMapError {
    /// Handle index was never allocated by this map
    #[error("Invalid slot handle {0}: index out of bounds")]
    InvalidHandle(SlotId),

    /// Handle refers to a slot that has since been erased or reused
    #[error("Stale slot handle {id}: slot is now at generation {current}")]
    StaleHandle {
        /// The rejected handle
        id: SlotId,
        /// Generation currently stored for the slot
        current: u32,
    },

    /// Dense position past the end of storage
    #[error("Dense position {position} out of range (len {len})")]
    OutOfRange {
        /// Requested position
        position: usize,
        /// Number of live values
        len: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    dense_index: u32,
    generation: u32,
}

/// Dense array of `T` addressed through generation-checked [`SlotId`]s
///
/// Insert, erase and lookup are all O(1). Erasing bumps the slot's
/// generation, so any handle issued before the erase stops resolving even
/// after the slot index is recycled.
#[derive(Clone)]
pub struct SlotMap<T> {
    dense: Vec<T>,
    indices: Vec<IndexEntry>,
    free_list: Vec<u32>,
    /// Owning slot index for each dense position
    index_lookup: Vec<u32>,
}

impl<T> SlotMap<T> {
    /// Create an empty slot map
    pub const fn new() -> Self {
        Self {
            dense: Vec::new(),
            indices: Vec::new(),
            free_list: Vec::new(),
            index_lookup: Vec::new(),
        }
    }

    /// Create an empty slot map with room for `capacity` values
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense: Vec::with_capacity(capacity),
            indices: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            index_lookup: Vec::with_capacity(capacity),
        }
    }

    /// Reserve room for `additional` more values
    pub fn reserve(&mut self, additional: usize) {
        self.dense.reserve(additional);
        self.index_lookup.reserve(additional);
        let spare = self.free_list.len();
        if additional > spare {
            self.indices.reserve(additional - spare);
        }
    }

    /// Number of live values
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the map holds no live values
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Capacity of the dense storage
    pub fn capacity(&self) -> usize {
        self.dense.capacity()
    }

    /// Number of slots ever allocated, live or free
    pub fn slot_count(&self) -> usize {
        self.indices.len()
    }

    /// Insert a value, returning its handle and a reference to the stored value
    pub fn insert(&mut self, value: T) -> (SlotId, &mut T) {
        let dense_index = u32::try_from(self.dense.len())
            .ok()
            .filter(|&index| index != FREE_SLOT)
            .unwrap_or_else(|| panic!("SlotMap exceeded {} entries", FREE_SLOT));

        self.dense.push(value);

        let slot = if let Some(slot) = self.free_list.pop() {
            let entry = &mut self.indices[slot as usize];
            entry.dense_index = dense_index;
            log::trace!("Reusing slot {} at generation {}", slot, entry.generation);
            slot
        } else {
            let slot = self.indices.len() as u32;
            self.indices.push(IndexEntry {
                dense_index,
                generation: 1,
            });
            slot
        };
        self.index_lookup.push(slot);

        let id = SlotId::new(slot, self.indices[slot as usize].generation);
        (id, &mut self.dense[dense_index as usize])
    }

    /// Whether `id` refers to a live value
    pub fn exists(&self, id: SlotId) -> bool {
        self.check(id).is_ok()
    }

    /// Dense position currently holding the value for `id`
    pub fn position_of(&self, id: SlotId) -> Option<usize> {
        self.check(id).ok()
    }

    /// Shared reference to the value for `id`
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.position_of(id).map(|position| &self.dense[position])
    }

    /// Mutable reference to the value for `id`
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.position_of(id).map(|position| &mut self.dense[position])
    }

    /// Checked access that reports why a handle failed to resolve
    pub fn at(&self, id: SlotId) -> Result<&T, SlotMapError> {
        let position = self.check(id)?;
        Ok(&self.dense[position])
    }

    /// Checked mutable access that reports why a handle failed to resolve
    pub fn at_mut(&mut self, id: SlotId) -> Result<&mut T, SlotMapError> {
        let position = self.check(id)?;
        Ok(&mut self.dense[position])
    }

    /// Remove the value for `id` and return it
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let position = self.position_of(id)?;
        Some(self.remove_dense(position))
    }

    /// Erase the value for `id`; false if the handle is stale or unknown
    ///
    /// # Panics
    ///
    /// Erasing from an empty map is a logic error in the caller's
    /// bookkeeping and panics.
    pub fn erase(&mut self, id: SlotId) -> bool {
        if self.is_empty() {
            log::error!("Erase of {} requested on an empty SlotMap", id);
            panic!("SlotMap::erase({id}) called on an empty map");
        }
        self.remove(id).is_some()
    }

    /// Erase the value at a dense position; false if out of range
    pub fn erase_at(&mut self, position: usize) -> bool {
        if position >= self.dense.len() {
            return false;
        }
        self.remove_dense(position);
        true
    }

    /// Handle for the value at a dense position
    pub fn slot_id_for(&self, position: usize) -> Option<SlotId> {
        let slot = *self.index_lookup.get(position)?;
        Some(SlotId::new(slot, self.indices[slot as usize].generation))
    }

    /// Raw slot index owning a dense position
    pub fn entry_id_for(&self, position: usize) -> Option<u32> {
        self.index_lookup.get(position).copied()
    }

    /// Drop every value and invalidate all outstanding handles
    ///
    /// The slot table stays allocated so that subsequent inserts recycle the
    /// existing slots at their bumped generations.
    pub fn clear(&mut self) {
        for &slot in &self.index_lookup {
            let entry = &mut self.indices[slot as usize];
            entry.generation = Self::next_generation(entry.generation, slot);
            entry.dense_index = FREE_SLOT;
            self.free_list.push(slot);
        }
        self.dense.clear();
        self.index_lookup.clear();
    }

    /// Drop every value and release all storage, including the slot table
    ///
    /// Handles issued before a reset may alias values inserted after it.
    pub fn reset(&mut self) {
        self.dense = Vec::new();
        self.indices = Vec::new();
        self.free_list = Vec::new();
        self.index_lookup = Vec::new();
    }

    /// Values in dense order
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    /// Iterate values in dense order
    pub fn values(&self) -> std::slice::Iter<'_, T> {
        self.dense.iter()
    }

    /// Iterate values mutably in dense order
    pub fn values_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.dense.iter_mut()
    }

    /// Iterate live handles in dense order
    pub fn ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Iterate `(handle, value)` pairs in dense order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            indices: &self.indices,
            lookup: self.index_lookup.iter(),
            dense: self.dense.iter(),
        }
    }

    /// Iterate `(handle, value)` pairs mutably in dense order
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            indices: &self.indices,
            lookup: self.index_lookup.iter(),
            dense: self.dense.iter_mut(),
        }
    }

    fn check(&self, id: SlotId) -> Result<usize, SlotMapError> {
        let entry = self
            .indices
            .get(id.index() as usize)
            .ok_or(SlotMapError::InvalidHandle(id))?;

        if entry.generation != id.generation() || entry.dense_index == FREE_SLOT {
            return Err(SlotMapError::StaleHandle {
                id,
                current: entry.generation,
            });
        }
        Ok(entry.dense_index as usize)
    }

    fn remove_dense(&mut self, position: usize) -> T {
        let slot = self.index_lookup[position];
        let entry = &mut self.indices[slot as usize];
        entry.generation = Self::next_generation(entry.generation, slot);
        entry.dense_index = FREE_SLOT;
        self.free_list.push(slot);

        let value = self.dense.swap_remove(position);
        self.index_lookup.swap_remove(position);

        // Patch the slot of the element that was moved into the hole
        if let Some(&moved) = self.index_lookup.get(position) {
            self.indices[moved as usize].dense_index = position as u32;
        }
        value
    }

    fn next_generation(generation: u32, slot: u32) -> u32 {
        let next = generation.wrapping_add(1);
        if next == 0 {
            log::warn!("Generation overflow on slot {}; stale handles may alias", slot);
        }
        next
    }
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for SlotMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T> Index<SlotId> for SlotMap<T> {
    type Output = T;

    fn index(&self, id: SlotId) -> &T {
        self.at(id).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T> IndexMut<SlotId> for SlotMap<T> {
    fn index_mut(&mut self, id: SlotId) -> &mut T {
        self.at_mut(id).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T> Extend<T> for SlotMap<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T> FromIterator<T> for SlotMap<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, T> IntoIterator for &'a SlotMap<T> {
    type Item = (SlotId, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut SlotMap<T> {
    type Item = (SlotId, &'a mut T);
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Iterator over `(SlotId, &T)` in dense order
pub struct Iter<'a, T> {
    indices: &'a [IndexEntry],
    lookup: std::slice::Iter<'a, u32>,
    dense: std::slice::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = *self.lookup.next()?;
        let value = self.dense.next()?;
        Some((SlotId::new(slot, self.indices[slot as usize].generation), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.dense.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over `(SlotId, &mut T)` in dense order
pub struct IterMut<'a, T> {
    indices: &'a [IndexEntry],
    lookup: std::slice::Iter<'a, u32>,
    dense: std::slice::IterMut<'a, T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (SlotId, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = *self.lookup.next()?;
        let value = self.dense.next()?;
        Some((SlotId::new(slot, self.indices[slot as usize].generation), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.dense.size_hint()
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}
