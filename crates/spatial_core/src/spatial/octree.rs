//! Hashed sparse octree
//!
//! Efficiently divides 3D space into hierarchical regions for fast
//! spatial queries, without any pointers between nodes. Leaves live at
//! [`MAX_DEPTH`] in one hash map keyed by [`Location`]; every ancestor of a
//! populated leaf has a branch record in a second map whose [`ChildMask`]
//! says which of its eight octants hold descendants.
//!
//! Invariants maintained by every insert / remove pair:
//! - a leaf exists iff its value list is non-empty
//! - a branch exists iff its child mask is non-empty
//! - a child bit is set iff the corresponding child node exists

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::lattice::{cells_in_range, range_contains, CellRange, LatticeRay, LatticeTransform};
use super::location::{ChildMask, Location, MAX_DEPTH};
use super::MoveResult;
use crate::config::{ConfigError, SpatialConfig};
use crate::foundation::collections::{SlotId, SlotMap};
use crate::foundation::math::{utils, Vec3};

/// Inclusive range of max-depth locations covered by an entry
pub type LocationRange = (Location, Location);

/// Value stored in a [`SpatialOctree`] together with the leaves it covers
#[derive(Debug, Clone)]
pub struct OctreeEntry<T> {
    /// Inclusive max-depth location range
    pub range: LocationRange,
    /// The stored value
    pub value: T,
}

#[derive(Debug, Clone, Default)]
struct LeafNode {
    values: Vec<SlotId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct BranchNode {
    child_mask: ChildMask,
}

/// Node reported by [`SpatialOctree::traverse`]
#[derive(Debug, Clone, Copy)]
pub enum OctreeNode<'a> {
    /// Interior node with at least one populated octant
    Branch {
        /// Node address
        location: Location,
        /// World position of the node's minimum corner
        origin: Vec3,
        /// World-space node size
        size: Vec3,
        /// Populated octants
        child_mask: ChildMask,
    },
    /// Max-depth node holding entries
    Leaf {
        /// Node address
        location: Location,
        /// World position of the node's minimum corner
        origin: Vec3,
        /// World-space node size
        size: Vec3,
        /// Entries covering this leaf
        values: &'a [SlotId],
    },
}

impl OctreeNode<'_> {
    /// Address of the visited node
    pub fn location(&self) -> Location {
        match self {
            Self::Branch { location, .. } | Self::Leaf { location, .. } => *location,
        }
    }

    /// Depth of the visited node
    pub fn depth(&self) -> u8 {
        self.location().depth()
    }

    /// Whether this is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Populated leaf crossed by a cast ray
#[derive(Debug, Clone, Copy)]
pub struct OctreeRayHit<'a> {
    /// Leaf address
    pub location: Location,
    /// World position where the ray enters the leaf
    pub entry: Vec3,
    /// World position where the ray leaves the leaf
    pub exit: Vec3,
    /// Segment parameter at `entry`, in `[0, 1]`
    pub t_entry: f32,
    /// Segment parameter at `exit`, in `[0, 1]`
    pub t_exit: f32,
    /// Entries covering the leaf
    pub values: &'a [SlotId],
}

/// Sparse octree over the 256³ lattice, [`MAX_DEPTH`] levels deep
pub struct SpatialOctree<T> {
    transform: LatticeTransform,
    data: SlotMap<OctreeEntry<T>>,
    /// Max-depth leaves
    sparse_grid: HashMap<Location, LeafNode>,
    /// Every ancestor depth of a populated leaf
    parent_grid: HashMap<Location, BranchNode>,
}

fn cell_range(range: &LocationRange) -> CellRange {
    (range.0.cell(), range.1.cell())
}

impl<T> SpatialOctree<T> {
    /// Create an octree whose lattice cell `(0, 0, 0)` starts at `origin`
    pub fn new(origin: Vec3, cell_size: Vec3) -> Self {
        Self::with_transform(LatticeTransform::new(origin, cell_size))
    }

    /// Create an octree spanning `extent` world units from `origin`
    pub fn with_extent(origin: Vec3, extent: Vec3) -> Self {
        Self::new(origin, extent / super::LATTICE_SIZE)
    }

    /// Create an octree from a configuration, validating it first
    pub fn from_config(config: &SpatialConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_transform(LatticeTransform::from_config(config)?))
    }

    fn with_transform(transform: LatticeTransform) -> Self {
        log::debug!(
            "Creating spatial octree at {:?} with leaf size {:?}",
            transform.origin().as_slice(),
            transform.cell_size().as_slice()
        );
        Self {
            transform,
            data: SlotMap::new(),
            sparse_grid: HashMap::new(),
            parent_grid: HashMap::new(),
        }
    }

    /// World-to-lattice mapping used by this octree
    pub fn transform(&self) -> &LatticeTransform {
        &self.transform
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no values are stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of populated leaves
    pub fn leaf_count(&self) -> usize {
        self.sparse_grid.len()
    }

    /// Number of branch nodes, root included
    pub fn branch_count(&self) -> usize {
        self.parent_grid.len()
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

    /// Leaf range currently covered by `id`
    pub fn range(&self, id: SlotId) -> Option<LocationRange> {
        self.data.get(id).map(|entry| entry.range)
    }

    /// Entries stored in a max-depth leaf
    pub fn leaf(&self, location: Location) -> Option<&[SlotId]> {
        self.sparse_grid.get(&location).map(|leaf| leaf.values.as_slice())
    }

    /// Populated octants of a branch node
    pub fn branch_mask(&self, location: Location) -> Option<ChildMask> {
        self.parent_grid.get(&location).map(|branch| branch.child_mask)
    }

    /// Max-depth leaf range covered by `position ± half_size`
    pub fn get_node_range(&self, position: Vec3, half_size: Vec3) -> Option<LocationRange> {
        self.transform
            .cell_range(position, half_size)
            .map(|(min, max)| (Location::from_cell(min), Location::from_cell(max)))
    }

    /// Address of the node at `depth` containing a world position
    pub fn node_location(&self, world: Vec3, depth: u8) -> Option<Location> {
        let cell = self.transform.cell_at(world)?;
        Some(Location::from_cell(cell).at_depth(depth))
    }

    /// World position of the minimum corner of the node at `depth` containing `world`
    pub fn node_position(&self, world: Vec3, depth: u8) -> Option<Vec3> {
        self.node_location(world, depth)
            .map(|location| self.transform.cell_origin(location.cell()))
    }

    /// World-space size of a node at `depth`
    pub fn node_size(&self, depth: u8) -> Vec3 {
        let extent = Location::root().at_depth(depth).cell_extent();
        self.transform.cell_size() * extent as f32
    }

    /// Store `value` covering the box `position ± half_size`
    ///
    /// Returns [`SlotId::INVALID`] without storing anything when the box is
    /// entirely off the lattice.
    pub fn insert(&mut self, value: T, position: Vec3, half_size: Vec3) -> SlotId {
        let Some(range) = self.get_node_range(position, half_size) else {
            log::trace!("Insert at {:?} is off the octree lattice", position.as_slice());
            return SlotId::INVALID;
        };

        let (id, _) = self.data.insert(OctreeEntry { range, value });
        for cell in cells_in_range(cell_range(&range)) {
            self.insert_entry_at(Location::from_cell(cell), id);
        }
        log::trace!("Inserted {} into octree", id);
        id
    }

    /// Move `id` to cover the box `position ± half_size`
    ///
    /// Moving entirely off the lattice removes the entry.
    pub fn move_entry(&mut self, id: SlotId, position: Vec3, half_size: Vec3) -> MoveResult {
        let Some(old) = self.range(id) else {
            return MoveResult::Failed;
        };

        let Some(new) = self.get_node_range(position, half_size) else {
            log::debug!("{} moved off the octree lattice; removing", id);
            self.remove(id);
            return MoveResult::Removed;
        };

        if old == new {
            return MoveResult::Success;
        }

        let (old_cells, new_cells) = (cell_range(&old), cell_range(&new));
        for cell in cells_in_range(new_cells) {
            if !range_contains(&old_cells, cell) {
                self.insert_entry_at(Location::from_cell(cell), id);
            }
        }
        for cell in cells_in_range(old_cells) {
            if !range_contains(&new_cells, cell) {
                self.remove_entry_from(Location::from_cell(cell), id);
            }
        }
        if let Some(entry) = self.data.get_mut(id) {
            entry.range = new;
        }
        MoveResult::Success
    }

    /// Remove `id` and return its value
    pub fn take(&mut self, id: SlotId) -> Option<T> {
        let entry = self.data.remove(id)?;
        for cell in cells_in_range(cell_range(&entry.range)) {
            self.remove_entry_from(Location::from_cell(cell), id);
        }
        Some(entry.value)
    }

    /// Remove `id`; false if it is not stored
    pub fn remove(&mut self, id: SlotId) -> bool {
        self.take(id).is_some()
    }

    /// Remove every value and node
    pub fn clear(&mut self) {
        self.data.clear();
        self.sparse_grid.clear();
        self.parent_grid.clear();
    }

    /// Depth-first walk over every node, starting at the root
    ///
    /// Octants are visited in ascending order. The visitor returns false to
    /// stop; the return value is false iff it did.
    pub fn traverse<F>(&self, mut visitor: F) -> bool
    where
        F: FnMut(&OctreeNode<'_>) -> bool,
    {
        let mut stack = Vec::new();
        if self.parent_grid.contains_key(&Location::root()) {
            stack.push(Location::root());
        }

        while let Some(location) = stack.pop() {
            let Some(branch) = self.parent_grid.get(&location) else {
                continue;
            };
            let node = OctreeNode::Branch {
                location,
                origin: self.transform.cell_origin(location.cell()),
                size: self.node_size(location.depth()),
                child_mask: branch.child_mask,
            };
            if !visitor(&node) {
                return false;
            }

            if location.depth() == MAX_DEPTH - 1 {
                for octant in branch.child_mask.octants() {
                    let child = location.child(octant);
                    let Some(values) = self.leaf(child) else {
                        continue;
                    };
                    let leaf = OctreeNode::Leaf {
                        location: child,
                        origin: self.transform.cell_origin(child.cell()),
                        size: self.transform.cell_size(),
                        values,
                    };
                    if !visitor(&leaf) {
                        return false;
                    }
                }
            } else {
                // Reverse so the lowest octant is popped first
                let mut children: Vec<u8> = branch.child_mask.octants().collect();
                children.reverse();
                stack.extend(children.into_iter().map(|octant| location.child(octant)));
            }
        }
        true
    }

    /// Walk the populated leaves crossed by the segment `start..end`
    ///
    /// Steps leaf by leaf over the max-depth lattice. The visitor returns
    /// false to stop early; the return value is false iff it did.
    pub fn trace_line<F>(&self, start: Vec3, end: Vec3, mut visitor: F) -> bool
    where
        F: FnMut(&OctreeRayHit<'_>) -> bool,
    {
        let Some(ray) =
            LatticeRay::new(self.transform.to_local(start), self.transform.to_local(end))
        else {
            log::trace!("Ray misses the octree lattice");
            return true;
        };

        for step in ray {
            let location = Location::from_cell(step.cell);
            let Some(values) = self.leaf(location) else {
                continue;
            };
            let hit = OctreeRayHit {
                location,
                entry: utils::lerp(start, end, step.t_entry),
                exit: utils::lerp(start, end, step.t_exit),
                t_entry: step.t_entry,
                t_exit: step.t_exit,
                values,
            };
            if !visitor(&hit) {
                return false;
            }
        }
        true
    }

    /// Walk populated leaves along `direction` for `distance` world units
    pub fn cast_ray<F>(&self, origin: Vec3, direction: Vec3, distance: f32, visitor: F) -> bool
    where
        F: FnMut(&OctreeRayHit<'_>) -> bool,
    {
        let Some(direction) = direction.try_normalize(f32::EPSILON) else {
            return true;
        };
        self.trace_line(origin, origin + direction * distance, visitor)
    }

    fn insert_entry_at(&mut self, location: Location, id: SlotId) {
        let created = match self.sparse_grid.entry(location) {
            Entry::Occupied(mut leaf) => {
                leaf.get_mut().values.push(id);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(LeafNode { values: vec![id] });
                true
            }
        };
        if !created {
            return;
        }

        // A new leaf needs its bit set in every ancestor; stop at the first
        // ancestor that already existed since everything above it is set.
        for depth in (0..MAX_DEPTH).rev() {
            let bit = ChildMask::from_octant(location.index_at(depth));
            match self.parent_grid.entry(location.at_depth(depth)) {
                Entry::Occupied(mut branch) => {
                    branch.get_mut().child_mask |= bit;
                    break;
                }
                Entry::Vacant(slot) => {
                    slot.insert(BranchNode { child_mask: bit });
                }
            }
        }
    }

    fn remove_entry_from(&mut self, location: Location, id: SlotId) {
        let Some(leaf) = self.sparse_grid.get_mut(&location) else {
            index_corrupted(location, id, "leaf missing");
        };
        let Some(position) = leaf.values.iter().position(|value| *value == id) else {
            index_corrupted(location, id, "id missing from leaf");
        };
        leaf.values.swap_remove(position);
        if !leaf.values.is_empty() {
            return;
        }
        self.sparse_grid.remove(&location);

        // Clear the emptied branch bits upward until an ancestor keeps other children
        for depth in (0..MAX_DEPTH).rev() {
            let parent = location.at_depth(depth);
            let Some(branch) = self.parent_grid.get_mut(&parent) else {
                index_corrupted(parent, id, "ancestor branch missing");
            };
            branch.child_mask.remove(ChildMask::from_octant(location.index_at(depth)));
            if !branch.child_mask.is_empty() {
                break;
            }
            self.parent_grid.remove(&parent);
        }
    }
}

fn index_corrupted(location: Location, id: SlotId, what: &str) -> ! {
    log::error!("Octree index corrupted at {:?} for {}: {}", location, id, what);
    panic!("spatial octree index corrupted at {location:?} for {id}: {what}");
}

impl<T> Default for SpatialOctree<T> {
    /// Unit leaves with the lattice starting at the world origin
    fn default() -> Self {
        Self::with_transform(LatticeTransform::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SpatialOctree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialOctree")
            .field("transform", &self.transform)
            .field("entries", &self.data)
            .field("leaves", &self.sparse_grid.len())
            .field("branches", &self.parent_grid.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::foundation::logging;
    use crate::spatial::ILoc;
    use approx::assert_relative_eq;

    /// Check the leaf / branch / child-bit invariants exhaustively
    pub(crate) fn assert_consistent<T>(tree: &SpatialOctree<T>) {
        for (location, leaf) in &tree.sparse_grid {
            assert_eq!(location.depth(), MAX_DEPTH);
            assert!(!leaf.values.is_empty(), "empty leaf at {location:?}");
            for id in &leaf.values {
                assert!(tree.data.exists(*id), "dangling {id} at {location:?}");
            }
            for depth in 0..MAX_DEPTH {
                let mask = tree
                    .branch_mask(location.at_depth(depth))
                    .unwrap_or_else(|| panic!("missing ancestor of {location:?} at depth {depth}"));
                assert!(mask.contains(ChildMask::from_octant(location.index_at(depth))));
            }
        }
        for (location, branch) in &tree.parent_grid {
            assert!(location.depth() < MAX_DEPTH);
            assert!(!branch.child_mask.is_empty(), "empty branch at {location:?}");
            for octant in 0..8 {
                let child = location.child(octant);
                let exists = if child.depth() == MAX_DEPTH {
                    tree.sparse_grid.contains_key(&child)
                } else {
                    tree.parent_grid.contains_key(&child)
                };
                assert_eq!(branch.child_mask.contains(ChildMask::from_octant(octant)), exists);
            }
        }
    }

    fn unit_tree() -> SpatialOctree<u32> {
        logging::init_for_tests();
        SpatialOctree::new(Vec3::zeros(), utils::splat(1.0))
    }

    #[test]
    fn test_single_insert_builds_full_parent_chain() {
        let mut tree = unit_tree();
        let id = tree.insert(7, Vec3::new(200.5, 3.5, 90.5), utils::splat(0.25));
        assert!(id.is_valid());
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.branch_count(), MAX_DEPTH as usize);

        let leaf = Location::from_cell(ILoc::new(200, 3, 90));
        assert_eq!(tree.leaf(leaf), Some(&[id][..]));
        assert_eq!(tree.range(id), Some((leaf, leaf)));
        assert_consistent(&tree);
    }

    #[test]
    fn test_sibling_insert_shares_ancestors() {
        let mut tree = unit_tree();
        tree.insert(1, Vec3::new(0.5, 0.5, 0.5), utils::splat(0.25));
        tree.insert(2, Vec3::new(1.5, 0.5, 0.5), utils::splat(0.25));

        // Cells 0 and 1 on x share every ancestor down to depth 7
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.branch_count(), MAX_DEPTH as usize);
        let parent = Location::from_cell(ILoc::new(0, 0, 0)).at_depth(MAX_DEPTH - 1);
        assert_eq!(tree.branch_mask(parent), Some(ChildMask::OCTANT_0 | ChildMask::OCTANT_1));
        assert_consistent(&tree);

        // Far away cell branches off at the root
        tree.insert(3, Vec3::new(255.5, 0.5, 0.5), utils::splat(0.25));
        assert_eq!(
            tree.branch_mask(Location::root()),
            Some(ChildMask::OCTANT_0 | ChildMask::OCTANT_1)
        );
        assert_eq!(tree.branch_count(), 2 * MAX_DEPTH as usize - 1);
        assert_consistent(&tree);
    }

    #[test]
    fn test_remove_prunes_to_empty() {
        let mut tree = unit_tree();
        let a = tree.insert(1, Vec3::new(10.5, 10.5, 10.5), utils::splat(1.2));
        let b = tree.insert(2, Vec3::new(100.5, 40.5, 7.5), utils::splat(0.2));
        assert_eq!(tree.leaf_count(), 27 + 1);
        assert_consistent(&tree);

        assert_eq!(tree.take(a), Some(1));
        assert_eq!(tree.leaf_count(), 1);
        assert_consistent(&tree);

        assert!(tree.remove(b));
        assert!(!tree.remove(b));
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.branch_count(), 0);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_shared_leaf_survives_partial_remove() {
        let mut tree = unit_tree();
        let a = tree.insert(1, Vec3::new(5.5, 5.5, 5.5), utils::splat(0.3));
        let b = tree.insert(2, Vec3::new(5.4, 5.6, 5.5), utils::splat(0.3));
        let leaf = Location::from_cell(ILoc::new(5, 5, 5));
        assert_eq!(tree.leaf(leaf).map(<[SlotId]>::len), Some(2));

        tree.remove(a);
        assert_eq!(tree.leaf(leaf), Some(&[b][..]));
        assert_consistent(&tree);
    }

    #[test]
    fn test_move_entry() {
        let mut tree = unit_tree();
        let half = utils::splat(0.4);
        let id = tree.insert(9, Vec3::new(0.5, 0.5, 0.5), half);

        assert_eq!(tree.move_entry(id, Vec3::new(0.55, 0.5, 0.5), half), MoveResult::Success);
        assert_eq!(tree.move_entry(id, Vec3::new(130.5, 0.5, 0.5), half), MoveResult::Success);
        assert!(tree.leaf(Location::from_cell(ILoc::new(0, 0, 0))).is_none());
        assert!(tree.leaf(Location::from_cell(ILoc::new(130, 0, 0))).is_some());
        assert_eq!(tree.branch_count(), MAX_DEPTH as usize);
        assert_consistent(&tree);

        assert_eq!(tree.move_entry(id, Vec3::new(-40.0, 0.5, 0.5), half), MoveResult::Removed);
        assert_eq!(tree.branch_count(), 0);
        assert_eq!(tree.move_entry(id, Vec3::new(1.0, 1.0, 1.0), half), MoveResult::Failed);
    }

    #[test]
    fn test_traverse_visits_branches_then_leaves() {
        let mut tree = unit_tree();
        let a = tree.insert(1, Vec3::new(0.5, 0.5, 0.5), utils::splat(0.25));
        let b = tree.insert(2, Vec3::new(1.5, 0.5, 0.5), utils::splat(0.25));

        let mut branches = Vec::new();
        let mut leaves = Vec::new();
        assert!(tree.traverse(|node| {
            match node {
                OctreeNode::Branch { location, size, .. } => {
                    branches.push((location.depth(), size.x));
                }
                OctreeNode::Leaf { location, origin, values, .. } => {
                    leaves.push((location.cell(), origin.x, values.to_vec()));
                }
            }
            true
        }));

        let expected_branches: Vec<_> = (0..MAX_DEPTH)
            .map(|depth| (depth, f32::from(1u16 << (MAX_DEPTH - depth))))
            .collect();
        assert_eq!(branches, expected_branches);
        assert_eq!(
            leaves,
            vec![(ILoc::new(0, 0, 0), 0.0, vec![a]), (ILoc::new(1, 0, 0), 1.0, vec![b])]
        );
    }

    #[test]
    fn test_traverse_abort() {
        let mut tree = unit_tree();
        tree.insert(1, Vec3::new(3.5, 3.5, 3.5), utils::splat(0.25));
        let mut visits = 0;
        let completed = tree.traverse(|node| {
            visits += 1;
            node.depth() < 3
        });
        assert!(!completed);
        assert_eq!(visits, 4);

        let empty = unit_tree();
        assert!(empty.traverse(|_| panic!("empty tree has no nodes")));
    }

    #[test]
    fn test_cast_ray_hits_populated_leaf() {
        let mut tree = unit_tree();
        let id = tree.insert(5, Vec3::new(2.5, 0.5, 0.5), utils::splat(0.4));
        tree.insert(6, Vec3::new(2.5, 4.5, 0.5), utils::splat(0.4));

        let mut hits = Vec::new();
        assert!(tree.cast_ray(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 10.0, |hit| {
            hits.push((
                hit.location.cell(),
                hit.entry.x,
                hit.exit.x,
                hit.t_entry,
                hit.values.to_vec(),
            ));
            true
        }));
        assert_eq!(hits.len(), 1);
        let (cell, entry, exit, t_entry, values) = &hits[0];
        assert_eq!(*cell, ILoc::new(2, 0, 0));
        assert_relative_eq!(*entry, 2.0, epsilon = 1e-4);
        assert_relative_eq!(*exit, 3.0, epsilon = 1e-4);
        assert_relative_eq!(*t_entry, 0.2, epsilon = 1e-5);
        assert_eq!(values, &vec![id]);
    }

    #[test]
    fn test_trace_line_abort_and_miss() {
        let mut tree = unit_tree();
        for x in [2.5, 6.5] {
            tree.insert(0, Vec3::new(x, 0.5, 0.5), utils::splat(0.4));
        }
        let mut visits = 0;
        assert!(!tree.trace_line(Vec3::new(0.0, 0.5, 0.5), Vec3::new(9.0, 0.5, 0.5), |_| {
            visits += 1;
            false
        }));
        assert_eq!(visits, 1);
        assert!(tree.trace_line(Vec3::new(0.0, -3.0, 0.5), Vec3::new(9.0, -3.0, 0.5), |_| {
            panic!("line is off the lattice")
        }));
    }

    #[test]
    fn test_node_position_quantizes_at_depth() {
        let tree: SpatialOctree<()> =
            SpatialOctree::new(Vec3::new(-64.0, 0.0, 0.0), utils::splat(0.5));
        let world = Vec3::new(-20.3, 37.9, 1.2);

        let leaf = tree.node_position(world, MAX_DEPTH).expect("on lattice");
        assert_relative_eq!(leaf, Vec3::new(-20.5, 37.5, 1.0));

        // Depth 4 nodes cover 16 cells = 8 world units
        let coarse = tree.node_position(world, 4).expect("on lattice");
        assert_relative_eq!(coarse, Vec3::new(-24.0, 32.0, 0.0));
        assert_relative_eq!(tree.node_size(4), utils::splat(8.0));

        assert_relative_eq!(
            tree.node_position(world, 0).expect("on lattice"),
            Vec3::new(-64.0, 0.0, 0.0)
        );
        assert!(tree.node_position(Vec3::new(100.0, 0.0, 0.0), 3).is_none());
        assert_eq!(tree.node_location(world, 2).map(|l| l.depth()), Some(2));
    }

    #[test]
    fn test_off_lattice_insert() {
        let mut tree = unit_tree();
        assert_eq!(tree.insert(1, Vec3::new(0.0, 0.0, 500.0), utils::splat(1.0)), SlotId::INVALID);
        assert!(tree.is_empty());
        assert_eq!(tree.branch_count(), 0);
    }

    #[test]
    fn test_box_touching_low_face_is_off_lattice() {
        let mut tree = unit_tree();
        let id = tree.insert(1, Vec3::new(0.5, 0.5, -0.5), Vec3::new(0.4, 0.4, 0.5));
        assert_eq!(id, SlotId::INVALID);
        assert_eq!(tree.get_node_range(Vec3::new(0.5, 0.5, -0.5), Vec3::new(0.4, 0.4, 0.5)), None);
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.branch_count(), 0);
    }
}
