//! Spatial index demo
//!
//! Scatters ships through a bounded volume, lets them drift and bounce off
//! the walls, keeps both a sparse grid and an octree up to date and fires
//! picking rays through the scene every few frames.
//!
//! Usage: `spatial_demo [config.toml|config.ron]`

use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spatial_core::config::Config;
use spatial_core::foundation::logging;
use spatial_core::foundation::math::utils;
use spatial_core::prelude::*;

// Volume bounds: -50 to +50 on each axis
const VOLUME_SIZE: f32 = 100.0;

const NUM_SMALL_SHIPS: usize = 400;
const NUM_LARGE_SHIPS: usize = 40;

const SMALL_SHIP_SPEED: f32 = 6.0;
const LARGE_SHIP_SPEED: f32 = 3.0;
const SMALL_SHIP_SIZE: f32 = 0.8;
const LARGE_SHIP_SIZE: f32 = 2.0;

const FRAMES: u32 = 240;
const FRAME_TIME: f32 = 1.0 / 60.0;
const PICK_INTERVAL: u32 = 30;

struct Ship {
    position: Vec3,
    velocity: Vec3,
    half_size: Vec3,
    grid_id: SlotId,
    octree_id: SlotId,
}

fn random_ship(rng: &mut StdRng, speed: f32, size: f32) -> Ship {
    let limit = VOLUME_SIZE / 2.0 - size;
    let position = Vec3::new(
        rng.gen_range(-limit..limit),
        rng.gen_range(-limit..limit),
        rng.gen_range(-limit..limit),
    );
    let heading = Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    );
    let velocity = heading.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x) * speed;
    Ship {
        position,
        velocity,
        half_size: utils::splat(size / 2.0),
        grid_id: SlotId::INVALID,
        octree_id: SlotId::INVALID,
    }
}

/// Advance a ship and reflect it off the volume walls
fn integrate(ship: &mut Ship, delta_time: f32) {
    ship.position += ship.velocity * delta_time;
    let limit = VOLUME_SIZE / 2.0;
    for axis in 0..3 {
        let half = ship.half_size[axis];
        if ship.position[axis] - half < -limit || ship.position[axis] + half > limit {
            ship.velocity[axis] = -ship.velocity[axis];
            ship.position[axis] = ship.position[axis].clamp(-limit + half, limit - half);
        }
    }
}

/// Push a ship's new bounds into an index, dropping the handle if it fell off the lattice
fn sync(index: &mut dyn SpatialIndex<usize>, id: &mut SlotId, position: Vec3, half_size: Vec3) {
    match index.move_entry(*id, position, half_size) {
        MoveResult::Success | MoveResult::Failed => {}
        MoveResult::Removed => {
            warn!("entry {} left the lattice", id);
            *id = SlotId::INVALID;
        }
    }
}

/// Ship index of the first hit along a ray
fn nearest(hits: &[SlotId], index: &dyn SpatialIndex<usize>) -> Option<usize> {
    hits.first().and_then(|id| index.get(*id)).copied()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading lattice config from {}", path);
            SpatialConfig::load_from_file(&path)?
        }
        None => SpatialConfig::new(utils::splat(-VOLUME_SIZE / 2.0), utils::splat(VOLUME_SIZE)),
    };
    info!("Lattice origin {:?}, cell size {:?}", config.origin, config.cell_size());

    let mut grid = SparseGrid::from_config(&config)?;
    let mut octree = SpatialOctree::from_config(&config)?;

    let mut rng = StdRng::seed_from_u64(42);
    let mut ships: Vec<Ship> = (0..NUM_SMALL_SHIPS)
        .map(|_| random_ship(&mut rng, SMALL_SHIP_SPEED, SMALL_SHIP_SIZE))
        .collect();
    for _ in 0..NUM_LARGE_SHIPS {
        ships.push(random_ship(&mut rng, LARGE_SHIP_SPEED, LARGE_SHIP_SIZE));
    }

    for (index, ship) in ships.iter_mut().enumerate() {
        ship.grid_id = grid.insert(index, ship.position, ship.half_size);
        ship.octree_id = octree.insert(index, ship.position, ship.half_size);
    }
    info!(
        "Inserted {} ships: {} grid cells, {} octree leaves, {} branches",
        ships.len(),
        grid.cell_count(),
        octree.leaf_count(),
        octree.branch_count()
    );

    let start = Instant::now();
    for frame in 0..FRAMES {
        for ship in &mut ships {
            integrate(ship, FRAME_TIME);
            if ship.grid_id.is_valid() {
                sync(&mut grid, &mut ship.grid_id, ship.position, ship.half_size);
            }
            if ship.octree_id.is_valid() {
                sync(&mut octree, &mut ship.octree_id, ship.position, ship.half_size);
            }
        }

        if frame % PICK_INTERVAL == 0 {
            let eye = Vec3::new(-VOLUME_SIZE / 2.0, 0.0, 0.0);
            let target = Vec3::new(
                VOLUME_SIZE / 2.0,
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );

            let grid_hits = grid.query_line(eye, target);
            let octree_hits = octree.query_line(eye, target);
            info!(
                "frame {:3}: ray hits {} ships in grid, {} in octree, nearest ship {:?} / {:?}",
                frame,
                grid_hits.len(),
                octree_hits.len(),
                nearest(&grid_hits, &grid),
                nearest(&octree_hits, &octree)
            );
            if grid_hits.len() != octree_hits.len() {
                warn!("grid and octree disagree on ray hits");
            }
        }
    }

    let elapsed = start.elapsed();
    debug!("Octree nodes after simulation:");
    octree.traverse(|node| {
        if let OctreeNode::Branch { location, child_mask, .. } = node {
            if location.depth() <= 2 {
                debug!("  branch {:?} children {:?}", location, child_mask);
            }
        }
        true
    });
    info!(
        "Simulated {} frames in {:.2?}: {} grid cells, {} octree leaves, {} branches",
        FRAMES,
        elapsed,
        grid.cell_count(),
        octree.leaf_count(),
        octree.branch_count()
    );
    Ok(())
}
