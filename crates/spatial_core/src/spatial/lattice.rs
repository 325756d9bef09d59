//! World space to integer lattice mapping
//!
//! Both spatial indices quantize world positions onto a fixed 256³ lattice
//! through an affine transform. This module owns that transform, the
//! AABB-to-cell-range computation and the DDA walker ("fast voxel
//! traversal") that enumerates the cells a segment passes through.

use super::location::ILoc;
use crate::config::{ConfigError, SpatialConfig};
use crate::foundation::math::{utils, Vec3};

/// Number of lattice cells along each axis
pub const LATTICE_SIZE: f32 = 256.0;

/// Highest valid cell coordinate
const LAST_CELL: i32 = 255;

/// Inclusive cell range `(min, max)` covered by a box
pub type CellRange = (ILoc, ILoc);

/// Affine mapping from world space onto the lattice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeTransform {
    origin: Vec3,
    unit_scale: Vec3,
}

impl LatticeTransform {
    /// Map `origin` to the minimum corner of cell `(0, 0, 0)` with cells of `cell_size`
    pub fn new(origin: Vec3, cell_size: Vec3) -> Self {
        Self {
            origin,
            unit_scale: utils::recip(cell_size),
        }
    }

    /// Build the transform described by a validated configuration
    pub fn from_config(config: &SpatialConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.origin, config.cell_size()))
    }

    /// World position of the lattice origin
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// World-to-lattice scale (inverse cell size)
    pub fn unit_scale(&self) -> Vec3 {
        self.unit_scale
    }

    /// World-space size of one cell
    pub fn cell_size(&self) -> Vec3 {
        utils::recip(self.unit_scale)
    }

    /// World position to continuous lattice coordinates
    #[inline]
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        (world - self.origin).component_mul(&self.unit_scale)
    }

    /// Continuous lattice coordinates to world position
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        local.component_div(&self.unit_scale) + self.origin
    }

    /// World position of a cell's minimum corner
    pub fn cell_origin(&self, cell: ILoc) -> Vec3 {
        self.to_world(Vec3::new(
            f32::from(cell.x),
            f32::from(cell.y),
            f32::from(cell.z),
        ))
    }

    /// Cell containing a world position, `None` off the lattice
    pub fn cell_at(&self, world: Vec3) -> Option<ILoc> {
        let local = self.to_local(world);
        let mut cell = [0u8; 3];
        for axis in 0..3 {
            let c = local[axis];
            if !(0.0..LATTICE_SIZE).contains(&c) {
                return None;
            }
            cell[axis] = c.floor() as u8;
        }
        Some(ILoc::from_array(cell))
    }

    /// Inclusive cell range covering the box `position ± half_size`
    ///
    /// The range is clamped to the lattice; `None` means the box lies
    /// entirely outside it. A box whose maximum edge sits exactly on a cell
    /// boundary does not claim the cell beyond that boundary, unless the box
    /// would otherwise cover no cell on that axis.
    // @bug: the bump back only looks at the max edge, so a box whose min edge
    // is exactly on a boundary still claims the cell above it.
    pub fn cell_range(&self, position: Vec3, half_size: Vec3) -> Option<CellRange> {
        let low = self.to_local(position - half_size);
        let high = self.to_local(position + half_size);

        let mut min = [0u8; 3];
        let mut max = [0u8; 3];
        for axis in 0..3 {
            let (a, b) = (low[axis].min(high[axis]), low[axis].max(high[axis]));
            if !a.is_finite() || !b.is_finite() || b < 0.0 || a >= LATTICE_SIZE {
                return None;
            }

            // Bump back against the unclamped floor so a box touching the
            // low face from outside stays off the lattice
            let first = a.floor();
            let mut last = b.floor();
            if last == b && last > first {
                last -= 1.0;
            }
            if last < 0.0 {
                return None;
            }
            let first = first.max(0.0);
            let last = last.min(LATTICE_SIZE - 1.0);

            min[axis] = first as u8;
            max[axis] = last as u8;
        }
        Some((ILoc::from_array(min), ILoc::from_array(max)))
    }
}

impl Default for LatticeTransform {
    fn default() -> Self {
        Self::new(Vec3::zeros(), utils::splat(1.0))
    }
}

/// Whether `cell` lies inside the inclusive `range`
#[inline]
pub fn range_contains(range: &CellRange, cell: ILoc) -> bool {
    let (min, max) = range;
    (min.x..=max.x).contains(&cell.x)
        && (min.y..=max.y).contains(&cell.y)
        && (min.z..=max.z).contains(&cell.z)
}

/// Every cell of an inclusive range, x varying fastest
pub fn cells_in_range(range: CellRange) -> impl Iterator<Item = ILoc> {
    let (min, max) = range;
    (min.z..=max.z).flat_map(move |z| {
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| ILoc::new(x, y, z)))
    })
}

/// One lattice cell crossed by a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCell {
    /// The cell
    pub cell: ILoc,
    /// Segment parameter where the segment enters the cell
    pub t_entry: f32,
    /// Segment parameter where the segment leaves the cell
    pub t_exit: f32,
}

/// DDA walk over the cells a lattice-space segment passes through
///
/// The segment is first clipped against the lattice bounds; cells are then
/// yielded in order along the segment, each with its parametric span in
/// `[0, 1]` of the original (unclipped) segment.
#[derive(Debug, Clone)]
pub struct LatticeRay {
    start: Vec3,
    delta: Vec3,
    cell: [i32; 3],
    step: [i32; 3],
    t_max: [f32; 3],
    t: f32,
    t_end: f32,
    done: bool,
}

impl LatticeRay {
    /// Clip `start..end` (lattice space) and prepare the walk
    ///
    /// `None` when the segment misses the lattice entirely.
    pub fn new(start: Vec3, end: Vec3) -> Option<Self> {
        if !utils::is_finite(&start) || !utils::is_finite(&end) {
            return None;
        }

        let delta = end - start;
        let (mut t_min, mut t_max) = (0.0_f32, 1.0_f32);
        for axis in 0..3 {
            if delta[axis] == 0.0 {
                if start[axis] < 0.0 || start[axis] > LATTICE_SIZE {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / delta[axis];
            let mut near = -start[axis] * inv;
            let mut far = (LATTICE_SIZE - start[axis]) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t_min = t_min.max(near);
            t_max = t_max.min(far);
        }
        if t_max < t_min {
            return None;
        }

        let mut ray = Self {
            start,
            delta,
            cell: [0; 3],
            step: [0; 3],
            t_max: [f32::INFINITY; 3],
            t: t_min,
            t_end: t_max,
            done: false,
        };

        let entry = start + delta * t_min;
        for axis in 0..3 {
            let mut cell = (entry[axis].floor() as i32).clamp(0, LAST_CELL);
            let step = if delta[axis] > 0.0 {
                1
            } else if delta[axis] < 0.0 {
                -1
            } else {
                0
            };
            // Entering on a boundary while heading down belongs to the lower cell
            if step < 0 && entry[axis] == cell as f32 && cell > 0 {
                cell -= 1;
            }
            ray.cell[axis] = cell;
            ray.step[axis] = step;
            ray.t_max[axis] = ray.boundary_t(axis);
        }
        Some(ray)
    }

    /// Parameter at which the walk leaves the current cell along `axis`
    fn boundary_t(&self, axis: usize) -> f32 {
        let boundary = match self.step[axis] {
            0 => return f32::INFINITY,
            s if s > 0 => self.cell[axis] + 1,
            _ => self.cell[axis],
        };
        (boundary as f32 - self.start[axis]) / self.delta[axis]
    }

    fn next_axis(&self) -> usize {
        let mut axis = 0;
        for candidate in 1..3 {
            if self.t_max[candidate] < self.t_max[axis] {
                axis = candidate;
            }
        }
        axis
    }

    fn current_cell(&self) -> ILoc {
        ILoc::new(self.cell[0] as u8, self.cell[1] as u8, self.cell[2] as u8)
    }
}

impl Iterator for LatticeRay {
    type Item = RayCell;

    fn next(&mut self) -> Option<RayCell> {
        while !self.done {
            let axis = self.next_axis();
            let t_entry = self.t;
            let t_exit = self.t_max[axis].min(self.t_end);
            let cell = self.current_cell();

            if self.t_max[axis] >= self.t_end {
                self.done = true;
            } else {
                self.cell[axis] += self.step[axis];
                if !(0..=LAST_CELL).contains(&self.cell[axis]) {
                    self.done = true;
                }
                self.t = self.t_max[axis];
                self.t_max[axis] = self.boundary_t(axis);
            }

            // Corner grazes produce zero-length spans; skip them
            if t_exit > t_entry {
                return Some(RayCell {
                    cell,
                    t_entry,
                    t_exit,
                });
            }
        }
        None
    }
}

impl std::iter::FusedIterator for LatticeRay {}
