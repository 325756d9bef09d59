//! World-to-lattice mapping shared by the grid and octree

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::math::{utils, Vec3};
use crate::spatial::LATTICE_SIZE;

/// # Spatial Index Configuration
///
/// Describes the world-space box that is mapped onto the fixed
/// `[0, 255]` integer lattice. Fixed at construction of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialConfig {
    /// World-space position of lattice cell `(0, 0, 0)`'s minimum corner
    pub origin: Vec3,
    /// World-space size of the whole lattice along each axis
    pub extent: Vec3,
}

impl SpatialConfig {
    /// Create a configuration covering `extent` starting at `origin`
    pub fn new(origin: Vec3, extent: Vec3) -> Self {
        Self { origin, extent }
    }

    /// Create a configuration from the size of a single lattice cell
    pub fn from_cell_size(origin: Vec3, cell_size: Vec3) -> Self {
        Self {
            origin,
            extent: cell_size * LATTICE_SIZE,
        }
    }

    /// World-space size of one lattice cell
    pub fn cell_size(&self) -> Vec3 {
        self.extent / LATTICE_SIZE
    }

    /// Reject extents that cannot form an invertible mapping
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !utils::is_finite(&self.origin) {
            return Err(ConfigError::Invalid(format!(
                "origin must be finite, got {:?}",
                self.origin.as_slice()
            )));
        }
        if !utils::is_finite(&self.extent) || self.extent.iter().any(|c| *c <= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "extent must be finite and positive, got {:?}",
                self.extent.as_slice()
            )));
        }
        Ok(())
    }
}

impl Default for SpatialConfig {
    /// One world unit per cell, lattice starting at the world origin
    fn default() -> Self {
        Self::from_cell_size(Vec3::zeros(), utils::splat(1.0))
    }
}

impl Config for SpatialConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_unit_cells() {
        let config = SpatialConfig::default();
        assert_relative_eq!(config.cell_size(), utils::splat(1.0));
        assert_relative_eq!(config.extent, utils::splat(256.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_degenerate_extent() {
        let flat = SpatialConfig::new(Vec3::zeros(), Vec3::new(10.0, 0.0, 10.0));
        assert!(matches!(flat.validate(), Err(ConfigError::Invalid(_))));

        let inverted = SpatialConfig::new(Vec3::zeros(), Vec3::new(-1.0, 1.0, 1.0));
        assert!(inverted.validate().is_err());

        let nan_origin = SpatialConfig::new(Vec3::new(f32::NAN, 0.0, 0.0), utils::splat(1.0));
        assert!(nan_origin.validate().is_err());
    }

    #[test]
    fn test_toml_parsing() {
        let config = SpatialConfig::from_toml_str(
            "origin = [-64.0, -64.0, -64.0]\nextent = [128.0, 128.0, 128.0]\n",
        )
        .expect("valid toml");
        assert_relative_eq!(config.origin, utils::splat(-64.0));
        assert_relative_eq!(config.cell_size(), utils::splat(0.5));
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("spatial_config_{}.ron", std::process::id()));
        let path = path.to_string_lossy().into_owned();

        let config = SpatialConfig::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(32.0, 64.0, 128.0));
        config.save_to_file(&path).expect("write config");
        let loaded = SpatialConfig::load_from_file(&path).expect("read config");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = SpatialConfig::load_from_file("spatial.yaml");
        assert!(result.is_err());
        let err = SpatialConfig::default().save_to_file("spatial.json");
        assert!(matches!(err, Err(ConfigError::UnsupportedFormat(_))));
    }
}
