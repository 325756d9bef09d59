//! Morton / Z-order lattice coordinates
//!
//! [`ILoc`] is a cell on the 256³ lattice used by the sparse grid, hashed by
//! its interleaved Morton index. [`Location`] is the octree's node address:
//! the same interleaved bits, truncated to a depth, so a node at depth `d`
//! keeps only the top `d` bits of each axis.
//!
//! Octant selectors are 3-bit codes with bit 0 = x, bit 1 = y, bit 2 = z.

use bitflags::bitflags;

/// Interleaved 24-bit Morton code of an [`ILoc`]
pub type MortonIndex = u32;

/// Deepest octree level; one node per lattice cell
pub const MAX_DEPTH: u8 = 8;

/// All bits a 3×8-bit Morton code can occupy
const MORTON_BITS: MortonIndex = 0x00FF_FFFF;

/// Spreads the 8 bits of a byte so bit `i` lands on bit `3i`
static MORTON_SPREAD: [MortonIndex; 256] = build_spread_table();

/// Gathers bits 0, 3 and 6 of a 9-bit group into bits 0, 1 and 2
static MORTON_GATHER: [u8; 512] = build_gather_table();

const fn build_spread_table() -> [MortonIndex; 256] {
    let mut table = [0; 256];
    let mut value = 0;
    while value < 256 {
        let mut spread = 0;
        let mut bit = 0;
        while bit < 8 {
            if value & (1 << bit) != 0 {
                spread |= 1 << (bit * 3);
            }
            bit += 1;
        }
        table[value] = spread;
        value += 1;
    }
    table
}

const fn build_gather_table() -> [u8; 512] {
    let mut table = [0; 512];
    let mut value = 0;
    while value < 512 {
        table[value] = ((value & 1) | ((value >> 2) & 2) | ((value >> 4) & 4)) as u8;
        value += 1;
    }
    table
}

#[inline]
fn gather_axis(code: MortonIndex) -> u8 {
    let low = MORTON_GATHER[(code & 0x1FF) as usize];
    let mid = MORTON_GATHER[((code >> 9) & 0x1FF) as usize];
    let high = MORTON_GATHER[((code >> 18) & 0x1FF) as usize];
    low | (mid << 3) | (high << 6)
}

/// Integer cell on the 256³ lattice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ILoc {
    /// X cell coordinate
    pub x: u8,
    /// Y cell coordinate
    pub y: u8,
    /// Z cell coordinate
    pub z: u8,
}

impl ILoc {
    /// Create a cell coordinate
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Coordinates as `[x, y, z]`
    pub const fn to_array(self) -> [u8; 3] {
        [self.x, self.y, self.z]
    }

    /// Cell from `[x, y, z]`
    pub const fn from_array(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }

    /// Interleave the three coordinates into a 24-bit Morton code
    #[inline]
    pub fn to_morton_index(self) -> MortonIndex {
        MORTON_SPREAD[self.x as usize]
            | (MORTON_SPREAD[self.y as usize] << 1)
            | (MORTON_SPREAD[self.z as usize] << 2)
    }

    /// Recover the coordinates from a Morton code
    #[inline]
    pub fn from_morton_index(code: MortonIndex) -> Self {
        Self {
            x: gather_axis(code),
            y: gather_axis(code >> 1),
            z: gather_axis(code >> 2),
        }
    }
}

impl From<[u8; 3]> for ILoc {
    fn from(c: [u8; 3]) -> Self {
        Self::from_array(c)
    }
}

bitflags! {
    /// Which of a branch node's eight octants have live descendants
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChildMask: u8 {
        /// -X -Y -Z
        const OCTANT_0 = 1 << 0;
        /// +X -Y -Z
        const OCTANT_1 = 1 << 1;
        /// -X +Y -Z
        const OCTANT_2 = 1 << 2;
        /// +X +Y -Z
        const OCTANT_3 = 1 << 3;
        /// -X -Y +Z
        const OCTANT_4 = 1 << 4;
        /// +X -Y +Z
        const OCTANT_5 = 1 << 5;
        /// -X +Y +Z
        const OCTANT_6 = 1 << 6;
        /// +X +Y +Z
        const OCTANT_7 = 1 << 7;
    }
}

impl ChildMask {
    /// Mask with the single bit for `octant` (0..8)
    #[inline]
    pub const fn from_octant(octant: u8) -> Self {
        Self::from_bits_retain(1 << (octant & 7))
    }

    /// Octant codes whose bit is set, ascending
    pub fn octants(self) -> impl Iterator<Item = u8> {
        (0..8u8).filter(move |octant| self.contains(Self::from_octant(*octant)))
    }
}

/// Depth-qualified Z-order address of an octree node
///
/// Ordered by depth first, then Z-order, so sorting a set of locations walks
/// the tree level by level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    depth: u8,
    z_order: MortonIndex,
}

impl Location {
    /// The root node (depth 0)
    pub const fn root() -> Self {
        Self {
            depth: 0,
            z_order: 0,
        }
    }

    /// Max-depth location of a lattice cell
    pub fn from_cell(cell: ILoc) -> Self {
        Self {
            depth: MAX_DEPTH,
            z_order: cell.to_morton_index(),
        }
    }

    /// Location from a raw Z-order, truncated to `depth`
    pub fn from_z_order(z_order: MortonIndex, depth: u8) -> Self {
        let depth = depth.min(MAX_DEPTH);
        Self {
            depth,
            z_order: z_order & Self::depth_mask(depth),
        }
    }

    /// Depth of this node, 0 being the root
    #[inline]
    pub const fn depth(&self) -> u8 {
        self.depth
    }

    /// Z-order bits, with everything below `depth` cleared
    #[inline]
    pub const fn z_order(&self) -> MortonIndex {
        self.z_order
    }

    /// Combined `(depth, z_order)` value the ordering is defined over
    pub const fn key(&self) -> u64 {
        ((self.depth as u64) << 32) | self.z_order as u64
    }

    /// Whether this is the root node
    pub const fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Minimum-corner lattice cell of this node
    pub fn cell(&self) -> ILoc {
        ILoc::from_morton_index(self.z_order)
    }

    /// Lattice cells covered per axis by a node at this depth
    pub const fn cell_extent(&self) -> u32 {
        1 << (MAX_DEPTH - self.depth)
    }

    /// Ancestor (or self) at `depth`
    pub fn at_depth(&self, depth: u8) -> Self {
        Self::from_z_order(self.z_order, depth)
    }

    /// Truncate in place to `depth`
    pub fn set_depth(&mut self, depth: u8) {
        *self = self.at_depth(depth);
    }

    /// Descend into `octant` (0..8)
    pub fn go_to_node(&mut self, octant: u8) {
        debug_assert!(self.depth < MAX_DEPTH, "cannot descend below max depth");
        debug_assert!(octant < 8, "octant {octant} out of range");
        let shift = 3 * u32::from(MAX_DEPTH - 1 - self.depth);
        self.z_order |= MortonIndex::from(octant & 7) << shift;
        self.depth += 1;
    }

    /// Step to the parent node; the root stays the root
    pub fn go_up(&mut self) {
        if self.depth > 0 {
            self.set_depth(self.depth - 1);
        }
    }

    /// Child location in `octant`
    pub fn child(&self, octant: u8) -> Self {
        let mut child = *self;
        child.go_to_node(octant);
        child
    }

    /// Parent location, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        (self.depth > 0).then(|| self.at_depth(self.depth - 1))
    }

    /// Octant taken when descending from the ancestor at `depth`
    ///
    /// Only meaningful for `depth < self.depth()`.
    #[inline]
    pub fn index_at(&self, depth: u8) -> u8 {
        debug_assert!(depth < MAX_DEPTH);
        let shift = 3 * u32::from(MAX_DEPTH - 1 - depth);
        ((self.z_order >> shift) & 7) as u8
    }

    /// Whether `other` is this node or one of its descendants
    pub fn contains(&self, other: &Self) -> bool {
        other.depth >= self.depth && other.at_depth(self.depth) == *self
    }

    fn depth_mask(depth: u8) -> MortonIndex {
        if depth == 0 {
            return 0;
        }
        let dropped = 3 * u32::from(MAX_DEPTH - depth);
        (MORTON_BITS >> dropped) << dropped
    }
}

impl From<ILoc> for Location {
    fn from(cell: ILoc) -> Self {
        Self::from_cell(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straightforward bit-by-bit interleave to check the tables against
    fn naive_morton(x: u8, y: u8, z: u8) -> u32 {
        let mut code = 0;
        for bit in 0..8 {
            code |= u32::from((x >> bit) & 1) << (3 * bit);
            code |= u32::from((y >> bit) & 1) << (3 * bit + 1);
            code |= u32::from((z >> bit) & 1) << (3 * bit + 2);
        }
        code
    }

    #[test]
    fn test_morton_matches_naive_interleave() {
        let samples = [
            (0, 0, 0),
            (1, 0, 0),
            (0, 1, 0),
            (0, 0, 1),
            (255, 255, 255),
            (3, 130, 77),
        ];
        for &(x, y, z) in &samples {
            let cell = ILoc::new(x, y, z);
            assert_eq!(cell.to_morton_index(), naive_morton(x, y, z));
        }
        assert_eq!(ILoc::new(255, 255, 255).to_morton_index(), MORTON_BITS);
    }

    #[test]
    fn test_morton_inverse_over_axes() {
        for value in 0..=255u8 {
            for cell in [
                ILoc::new(value, 0, 0),
                ILoc::new(0, value, 0),
                ILoc::new(0, 0, value),
                ILoc::new(value, value.wrapping_mul(7), value.wrapping_add(101)),
            ] {
                assert_eq!(ILoc::from_morton_index(cell.to_morton_index()), cell);
            }
        }
    }

    #[test]
    fn test_morton_preserves_locality_per_octant() {
        // All eight cells of a 2x2x2 block are consecutive codes
        let mut codes: Vec<_> = (0..8u8)
            .map(|o| {
                ILoc::new(4 + (o & 1), 6 + ((o >> 1) & 1), 2 + ((o >> 2) & 1)).to_morton_index()
            })
            .collect();
        codes.sort_unstable();
        assert_eq!(codes[7] - codes[0], 7);
    }

    #[test]
    fn test_go_to_node_builds_cell_coordinates() {
        // Descend toward cell (5, 0, 255): x = 00000101, z = 11111111
        let target = ILoc::new(5, 0, 255);
        let mut location = Location::root();
        for depth in 0..MAX_DEPTH {
            let bit = 7 - depth;
            let octant = ((target.x >> bit) & 1)
                | (((target.y >> bit) & 1) << 1)
                | (((target.z >> bit) & 1) << 2);
            location.go_to_node(octant);
        }
        assert_eq!(location.depth(), MAX_DEPTH);
        assert_eq!(location, Location::from_cell(target));
        assert_eq!(location.cell(), target);
    }

    #[test]
    fn test_at_depth_masks_low_bits() {
        let location = Location::from_cell(ILoc::new(0b1011_0110, 0b0100_0001, 0b1111_1111));
        let coarse = location.at_depth(3);
        assert_eq!(coarse.depth(), 3);
        assert_eq!(coarse.cell(), ILoc::new(0b1010_0000, 0b0100_0000, 0b1110_0000));
        assert_eq!(coarse.cell_extent(), 32);
        assert_eq!(location.at_depth(0), Location::root());

        let mut truncated = location;
        truncated.set_depth(3);
        assert_eq!(truncated, coarse);
    }

    #[test]
    fn test_index_at_and_go_up_invert_go_to_node() {
        let mut location = Location::root();
        let path = [3u8, 0, 7, 5, 1, 6, 2, 4];
        for &octant in &path {
            location.go_to_node(octant);
        }
        for (depth, &octant) in path.iter().enumerate() {
            assert_eq!(location.index_at(depth as u8), octant);
        }

        let mut walker = location;
        for depth in (0..MAX_DEPTH).rev() {
            walker.go_up();
            assert_eq!(walker.depth(), depth);
            assert_eq!(walker.child(location.index_at(depth)), location.at_depth(depth + 1));
        }
        walker.go_up();
        assert!(walker.is_root());
        assert_eq!(walker.parent(), None);
    }

    #[test]
    fn test_ordering_is_depth_first() {
        let deep = Location::from_cell(ILoc::new(0, 0, 0));
        let shallow = Location::from_cell(ILoc::new(255, 255, 255)).at_depth(1);
        assert!(shallow < deep);
        assert!(shallow.key() < deep.key());
        assert!(Location::root() < shallow);

        let a = Location::from_cell(ILoc::new(1, 0, 0));
        let b = Location::from_cell(ILoc::new(0, 1, 0));
        assert!(a < b);
    }

    #[test]
    fn test_contains() {
        let leaf = Location::from_cell(ILoc::new(200, 10, 90));
        let branch = leaf.at_depth(4);
        assert!(Location::root().contains(&leaf));
        assert!(branch.contains(&leaf));
        assert!(!leaf.contains(&branch));
        assert!(!branch.contains(&Location::from_cell(ILoc::new(0, 10, 90))));
    }

    #[test]
    fn test_child_mask() {
        let mut mask = ChildMask::empty();
        mask |= ChildMask::from_octant(6);
        mask |= ChildMask::from_octant(1);
        assert_eq!(mask, ChildMask::OCTANT_1 | ChildMask::OCTANT_6);
        assert_eq!(mask.octants().collect::<Vec<_>>(), vec![1, 6]);
        mask.remove(ChildMask::from_octant(1));
        mask.remove(ChildMask::from_octant(6));
        assert!(mask.is_empty());
    }
}
