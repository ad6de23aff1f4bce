// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod aabb;
mod interval;
mod ray;

pub mod distribution;
pub mod sampling;

pub use aabb::Aabb;
pub use distribution::{Distribution1D, Distribution2D};
pub use interval::Interval;
pub use ray::{Ray, RAY_EPSILON};

/// RGB radiance / reflectance triple.
pub type Color = Vec3;
