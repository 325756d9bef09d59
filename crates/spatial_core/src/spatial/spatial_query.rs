//! Abstract spatial index interface
//!
//! Lets broad-phase consumers (picking, collision, visibility) swap the
//! flat [`SparseGrid`] for the hierarchical [`SpatialOctree`] without
//! changing how they insert, move and query entries.

use std::collections::HashSet;

use super::{MoveResult, SparseGrid, SpatialOctree};
use crate::foundation::collections::SlotId;
use crate::foundation::math::Vec3;

/// Common insert / move / remove / line-query contract of the spatial indices
pub trait SpatialIndex<T> {
    /// Store `value` covering `position ± half_size`; invalid id if off the lattice
    fn insert(&mut self, value: T, position: Vec3, half_size: Vec3) -> SlotId;

    /// Move an entry to cover `position ± half_size`
    fn move_entry(&mut self, id: SlotId, position: Vec3, half_size: Vec3) -> MoveResult;

    /// Remove an entry and return its value
    fn take(&mut self, id: SlotId) -> Option<T>;

    /// Remove an entry; false if it is not stored
    fn remove(&mut self, id: SlotId) -> bool {
        self.take(id).is_some()
    }

    /// Value stored under `id`
    fn get(&self, id: SlotId) -> Option<&T>;

    /// Number of stored values
    fn len(&self) -> usize;

    /// Whether no values are stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every value
    fn clear(&mut self);

    /// Entries crossed by the segment `start..end`, each once, nearest first
    fn query_line(&self, start: Vec3, end: Vec3) -> Vec<SlotId>;
}

fn push_unseen(
    found: &mut Vec<SlotId>,
    seen: &mut HashSet<SlotId>,
    ids: impl IntoIterator<Item = SlotId>,
) {
    for id in ids {
        if seen.insert(id) {
            found.push(id);
        }
    }
}

impl<T> SpatialIndex<T> for SparseGrid<T> {
    fn insert(&mut self, value: T, position: Vec3, half_size: Vec3) -> SlotId {
        self.insert(value, position, half_size)
    }

    fn move_entry(&mut self, id: SlotId, position: Vec3, half_size: Vec3) -> MoveResult {
        self.move_entry(id, position, half_size)
    }

    fn take(&mut self, id: SlotId) -> Option<T> {
        self.take(id)
    }

    fn get(&self, id: SlotId) -> Option<&T> {
        self.get(id)
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn clear(&mut self) {
        self.clear();
    }

    fn query_line(&self, start: Vec3, end: Vec3) -> Vec<SlotId> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        self.trace_line(start, end, |hit| {
            // Bucket order is arbitrary; sort for a stable result within a cell
            let mut ids: Vec<_> = hit.ids.iter().copied().collect();
            ids.sort_unstable();
            push_unseen(&mut found, &mut seen, ids);
            true
        });
        found
    }
}

impl<T> SpatialIndex<T> for SpatialOctree<T> {
    fn insert(&mut self, value: T, position: Vec3, half_size: Vec3) -> SlotId {
        self.insert(value, position, half_size)
    }

    fn move_entry(&mut self, id: SlotId, position: Vec3, half_size: Vec3) -> MoveResult {
        self.move_entry(id, position, half_size)
    }

    fn take(&mut self, id: SlotId) -> Option<T> {
        self.take(id)
    }

    fn get(&self, id: SlotId) -> Option<&T> {
        self.get(id)
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn clear(&mut self) {
        self.clear();
    }

    fn query_line(&self, start: Vec3, end: Vec3) -> Vec<SlotId> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        self.trace_line(start, end, |hit| {
            let mut ids = hit.values.to_vec();
            ids.sort_unstable();
            push_unseen(&mut found, &mut seen, ids);
            true
        });
        found
    }
}
