//! Randomized scenario tests for the spatial indices
//!
//! Each index is driven through long seeded sequences of inserts, moves and
//! removals and compared against a brute-force model after every step.


use rand::rngs::StdRng;
use rand::Rng;

use crate::foundation::math::Vec3;

/// Random box in lattice units, sometimes partially or fully off the lattice
pub(super) fn random_box(rng: &mut StdRng) -> (Vec3, Vec3) {
    let position = Vec3::new(
        rng.gen_range(-8.0..264.0),
        rng.gen_range(-8.0..264.0),
        rng.gen_range(-8.0..264.0),
    );
    let half_size = Vec3::new(
        rng.gen_range(0.05..2.5),
        rng.gen_range(0.05..2.5),
        rng.gen_range(0.05..2.5),
    );
    (position, half_size)
}

/// Cells overlapped by `position ± half_size` on a unit lattice at the origin
///
/// A cell `c` overlaps when the open intervals `(c, c + 1)` and
/// `(min, max)` intersect on every axis.
pub(super) fn overlapped_cells(position: Vec3, half_size: Vec3) -> Vec<[u8; 3]> {
    let min = position - half_size;
    let max = position + half_size;
    let axis_cells = |axis: usize| -> Vec<u8> {
        (0..=255u8)
            .filter(|&c| f32::from(c) < max[axis] && f32::from(c) + 1.0 > min[axis])
            .collect()
    };
    let (xs, ys, zs) = (axis_cells(0), axis_cells(1), axis_cells(2));
    let mut cells = Vec::new();
    for &z in &zs {
        for &y in &ys {
            for &x in &xs {
                cells.push([x, y, z]);
            }
        }
    }
    cells
}
