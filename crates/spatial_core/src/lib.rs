//! # Spatial Core
//!
//! Generational storage and spatial indexing for game engine broad-phase work.
//!
//! ## Features
//!
//! - **Slot maps**: Dense, cache-friendly storage behind stable generational handles
//! - **Morton coordinates**: Z-order encoding of a fixed 256³ lattice
//! - **Sparse grid**: Hash-bucketed uniform grid with DDA ray traversal
//! - **Spatial octree**: Hashed linear octree with node-presence bookkeeping
//! - **Config files**: Lattice placement loaded from TOML or RON
//!
//! ## Quick Start
//!
//! ```rust
//! use spatial_core::prelude::*;
//!
//! let mut grid = SparseGrid::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
//! let id = grid.insert("crate", Vec3::new(4.5, 0.5, 0.5), Vec3::new(0.4, 0.4, 0.4));
//!
//! let hits = grid.query_line(Vec3::new(0.0, 0.5, 0.5), Vec3::new(10.0, 0.5, 0.5));
//! assert_eq!(hits, vec![id]);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod foundation;
pub mod spatial;

/// Common imports for spatial index users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, SpatialConfig},
        foundation::{
            collections::{SlotId, SlotMap, SlotMapError},
            math::Vec3,
        },
        spatial::{
            ILoc, LatticeTransform, Location, MoveResult, OctreeNode, SparseGrid, SpatialIndex,
            SpatialOctree,
        },
    };
}
