//! Morton-coded sparse uniform grid
//!
//! Values are stored in a [`SlotMap`]; each value's [`SlotId`] is also
//! indexed into a hash map keyed by the Morton code of every lattice cell
//! its bounding box covers. Only occupied cells have a bucket.

use std::collections::{HashMap, HashSet};

use super::lattice::{cells_in_range, range_contains, CellRange, LatticeRay, LatticeTransform};
use super::location::{ILoc, MortonIndex};
use super::MoveResult;
use crate::config::{ConfigError, SpatialConfig};
use crate::foundation::collections::{SlotId, SlotMap};
use crate::foundation::math::{utils, Vec3};

/// Value stored in a [`SparseGrid`] together with the cells it covers
#[derive(Debug, Clone)]
pub struct GridEntry<T> {
    /// Inclusive lattice cell range
    pub bounds: CellRange,
    /// The stored value
    pub value: T,
}

/// Populated cell reported by [`SparseGrid::iterate`]
#[derive(Debug, Clone, Copy)]
pub struct GridCell<'a> {
    /// Lattice coordinate
    pub cell: ILoc,
    /// World position of the cell's minimum corner
    pub origin: Vec3,
    /// World-space cell size
    pub size: Vec3,
    /// Entries whose bounds cover this cell
    pub ids: &'a HashSet<SlotId>,
}

/// Populated cell crossed by a traced line
#[derive(Debug, Clone, Copy)]
pub struct GridRayHit<'a> {
    /// Lattice coordinate
    pub cell: ILoc,
    /// World position where the line enters the cell
    pub entry: Vec3,
    /// World position where the line leaves the cell
    pub exit: Vec3,
    /// Line parameter at `entry`, in `[0, 1]`
    pub t_entry: f32,
    /// Line parameter at `exit`, in `[0, 1]`
    pub t_exit: f32,
    /// Entries whose bounds cover this cell
    pub ids: &'a HashSet<SlotId>,
}

/// Sparse hashed uniform grid over a fixed 256³ lattice
pub struct SparseGrid<T> {
    transform: LatticeTransform,
    data: SlotMap<GridEntry<T>>,
    grid: HashMap<MortonIndex, HashSet<SlotId>>,
}

impl<T> SparseGrid<T> {
    /// Create a grid whose cell `(0, 0, 0)` starts at `origin`
    pub fn new(origin: Vec3, cell_size: Vec3) -> Self {
        Self::with_transform(LatticeTransform::new(origin, cell_size))
    }

    /// Create a grid spanning `extent` world units from `origin`
    pub fn with_extent(origin: Vec3, extent: Vec3) -> Self {
        Self::new(origin, extent / super::LATTICE_SIZE)
    }

    /// Create a grid from a configuration, validating it first
    pub fn from_config(config: &SpatialConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_transform(LatticeTransform::from_config(config)?))
    }

    fn with_transform(transform: LatticeTransform) -> Self {
        log::debug!(
            "Creating sparse grid at {:?} with cell size {:?}",
            transform.origin().as_slice(),
            transform.cell_size().as_slice()
        );
        Self {
            transform,
            data: SlotMap::new(),
            grid: HashMap::new(),
        }
    }

    /// World-to-lattice mapping used by this grid
    pub fn transform(&self) -> &LatticeTransform {
        &self.transform
    }

    /// World-space size of one cell
    pub fn cell_size(&self) -> Vec3 {
        self.transform.cell_size()
    }

    /// World position of a cell's minimum corner
    pub fn cell_origin(&self, cell: ILoc) -> Vec3 {
        self.transform.cell_origin(cell)
    }

    /// Cell containing a world position
    pub fn cell_at(&self, world: Vec3) -> Option<ILoc> {
        self.transform.cell_at(world)
    }

    /// Inclusive cell range covered by `position ± half_size`
    pub fn get_node_range(&self, position: Vec3, half_size: Vec3) -> Option<CellRange> {
        self.transform.cell_range(position, half_size)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no values are stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    /// Whether `id` refers to a stored value
    pub fn contains(&self, id: SlotId) -> bool {
        self.data.exists(id)
    }

    /// Value stored under `id`
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.data.get(id).map(|entry| &entry.value)
    }

    /// Mutable value stored under `id`
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.data.get_mut(id).map(|entry| &mut entry.value)
    }

    /// Cell range currently covered by `id`
    pub fn bounds(&self, id: SlotId) -> Option<CellRange> {
        self.data.get(id).map(|entry| entry.bounds)
    }

    /// Entries covering a cell, `None` if the cell is empty
    pub fn cell(&self, cell: ILoc) -> Option<&HashSet<SlotId>> {
        self.grid.get(&cell.to_morton_index())
    }

    /// Iterate `(id, value)` pairs in storage order
    pub fn values(&self) -> impl Iterator<Item = (SlotId, &T)> + '_ {
        self.data.iter().map(|(id, entry)| (id, &entry.value))
    }

    /// Store `value` covering the box `position ± half_size`
    ///
    /// Returns [`SlotId::INVALID`] without storing anything when the box is
    /// entirely off the lattice.
    pub fn insert(&mut self, value: T, position: Vec3, half_size: Vec3) -> SlotId {
        let Some(bounds) = self.get_node_range(position, half_size) else {
            log::trace!("Insert at {:?} is off the grid lattice", position.as_slice());
            return SlotId::INVALID;
        };

        let (id, _) = self.data.insert(GridEntry { bounds, value });
        for cell in cells_in_range(bounds) {
            self.insert_entry_at(cell, id);
        }
        log::trace!("Inserted {} covering {:?}..={:?}", id, bounds.0, bounds.1);
        id
    }

    /// Move `id` to cover the box `position ± half_size`
    ///
    /// Moving entirely off the lattice removes the entry.
    pub fn move_entry(&mut self, id: SlotId, position: Vec3, half_size: Vec3) -> MoveResult {
        let Some(old) = self.bounds(id) else {
            return MoveResult::Failed;
        };

        let Some(new) = self.get_node_range(position, half_size) else {
            log::debug!("{} moved off the grid lattice; removing", id);
            self.remove(id);
            return MoveResult::Removed;
        };

        if old == new {
            return MoveResult::Success;
        }

        // Add before removing so overlapping cells never empty out in between
        for cell in cells_in_range(new) {
            if !range_contains(&old, cell) {
                self.insert_entry_at(cell, id);
            }
        }
        for cell in cells_in_range(old) {
            if !range_contains(&new, cell) {
                self.remove_entry_from(cell, id);
            }
        }
        if let Some(entry) = self.data.get_mut(id) {
            entry.bounds = new;
        }
        MoveResult::Success
    }

    /// Remove `id` and return its value
    pub fn take(&mut self, id: SlotId) -> Option<T> {
        let entry = self.data.remove(id)?;
        for cell in cells_in_range(entry.bounds) {
            self.remove_entry_from(cell, id);
        }
        Some(entry.value)
    }

    /// Remove `id`; false if it is not stored
    pub fn remove(&mut self, id: SlotId) -> bool {
        self.take(id).is_some()
    }

    /// Remove every value and cell bucket
    pub fn clear(&mut self) {
        self.data.clear();
        self.grid.clear();
    }

    /// Visit every populated cell, in no particular order
    pub fn iterate<F>(&self, mut visitor: F)
    where
        F: FnMut(&GridCell<'_>),
    {
        let size = self.cell_size();
        for (&code, ids) in &self.grid {
            let cell = ILoc::from_morton_index(code);
            visitor(&GridCell {
                cell,
                origin: self.cell_origin(cell),
                size,
                ids,
            });
        }
    }

    /// Distinct entries covering any cell of the box `position ± half_size`
    ///
    /// Sorted by id.
    pub fn query_aabb(&self, position: Vec3, half_size: Vec3) -> Vec<SlotId> {
        let Some(range) = self.get_node_range(position, half_size) else {
            return Vec::new();
        };
        let mut found: Vec<SlotId> = cells_in_range(range)
            .filter_map(|cell| self.cell(cell))
            .flatten()
            .copied()
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Walk the populated cells crossed by the segment `start..end`
    ///
    /// Cells are visited in order along the segment. The visitor returns
    /// false to stop early; the return value is false iff it did.
    pub fn trace_line<F>(&self, start: Vec3, end: Vec3, mut visitor: F) -> bool
    where
        F: FnMut(&GridRayHit<'_>) -> bool,
    {
        let local_start = self.transform.to_local(start);
        let local_end = self.transform.to_local(end);
        let Some(ray) = LatticeRay::new(local_start, local_end) else {
            log::trace!("Line misses the grid lattice");
            return true;
        };

        for step in ray {
            let Some(ids) = self.cell(step.cell) else {
                continue;
            };
            let hit = GridRayHit {
                cell: step.cell,
                entry: utils::lerp(start, end, step.t_entry),
                exit: utils::lerp(start, end, step.t_exit),
                t_entry: step.t_entry,
                t_exit: step.t_exit,
                ids,
            };
            if !visitor(&hit) {
                return false;
            }
        }
        true
    }

    /// Walk populated cells along `direction` for `distance` world units
    pub fn cast_ray<F>(&self, origin: Vec3, direction: Vec3, distance: f32, visitor: F) -> bool
    where
        F: FnMut(&GridRayHit<'_>) -> bool,
    {
        let Some(direction) = direction.try_normalize(f32::EPSILON) else {
            return true;
        };
        self.trace_line(origin, origin + direction * distance, visitor)
    }

    fn insert_entry_at(&mut self, cell: ILoc, id: SlotId) {
        let bucket = self.grid.entry(cell.to_morton_index()).or_default();
        bucket.insert(id);
    }

    fn remove_entry_from(&mut self, cell: ILoc, id: SlotId) {
        let code = cell.to_morton_index();
        let removed = self
            .grid
            .get_mut(&code)
            .is_some_and(|bucket| bucket.remove(&id));
        if !removed {
            log::error!("Grid index corrupted: {} missing from cell {:?}", id, cell);
            panic!("sparse grid index corrupted: {id} missing from cell {cell:?}");
        }
        if self.grid.get(&code).is_some_and(HashSet::is_empty) {
            self.grid.remove(&code);
        }
    }
}

impl<T> Default for SparseGrid<T> {
    /// Unit cells with the lattice starting at the world origin
    fn default() -> Self {
        Self::with_transform(LatticeTransform::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SparseGrid<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseGrid")
            .field("transform", &self.transform)
            .field("entries", &self.data)
            .field("cells", &self.grid.len())
            .finish()
    }
}
