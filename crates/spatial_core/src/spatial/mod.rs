//! Spatial partitioning data structures
//!
//! Provides efficient spatial indexing for collision detection,
//! ray casting, and proximity queries in 3D space.
//!
//! Both indices map world space onto a fixed 256³ integer lattice, store
//! their values in a [`SlotMap`](crate::foundation::collections::SlotMap) and
//! hand out [`SlotId`](crate::foundation::collections::SlotId) handles. The
//! index structures only ever hold those handles. None of the types here
//! are internally synchronized.

mod lattice;
mod location;
mod octree;
mod sparse_grid;
mod spatial_query;

#[cfg(test)]
mod tests;

pub use lattice::{
    cells_in_range, range_contains, CellRange, LatticeRay, LatticeTransform, RayCell, LATTICE_SIZE,
};
pub use location::{ChildMask, ILoc, Location, MortonIndex, MAX_DEPTH};
pub use octree::{LocationRange, OctreeEntry, OctreeNode, OctreeRayHit, SpatialOctree};
pub use sparse_grid::{GridCell, GridEntry, GridRayHit, SparseGrid};
pub use spatial_query::SpatialIndex;

/// Outcome of moving an entry inside a spatial index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveResult {
    /// The id does not refer to a stored entry
    Failed,
    /// The new bounds are off the lattice, so the entry was removed
    Removed,
    /// The entry now covers its new bounds
    Success,
}
