//! Math utilities and types
//!
//! Provides the vector types shared by the spatial indices.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Math utility functions
pub mod utils {
    use super::Vec3;

    /// Linear interpolation between two points
    pub fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
        a + (b - a) * t
    }

    /// Vector with all three components set to `value`
    pub fn splat(value: f32) -> Vec3 {
        Vec3::new(value, value, value)
    }

    /// Component-wise reciprocal
    pub fn recip(v: Vec3) -> Vec3 {
        v.map(f32::recip)
    }

    /// Whether every component is finite
    pub fn is_finite(v: &Vec3) -> bool {
        v.iter().all(|c| c.is_finite())
    }
}
