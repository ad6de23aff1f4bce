use crate::{Interval, Vec3};

/// Default lower bound of a ray's parameter range, keeps secondary rays from
/// re-hitting the surface they start on.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray in 3D space with origin, direction and a half-open parameter range.
///
/// The direction is not normalized by the type; the intersection kernels and
/// integrators pass unit directions wherever distances matter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Smallest accepted hit parameter (inclusive).
    pub t_min: f32,
    /// Largest accepted hit parameter (exclusive).
    pub t_max: f32,
}

impl Ray {
    /// Create a ray with the default range `[RAY_EPSILON, inf)`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            t_min: RAY_EPSILON,
            t_max: f32::INFINITY,
        }
    }

    /// Create a ray with an explicit parameter range.
    pub fn with_range(origin: Vec3, direction: Vec3, t_min: f32, t_max: f32) -> Self {
        Self {
            origin,
            direction,
            t_min,
            t_max,
        }
    }

    /// Narrow the ray so that it stops short of a target `length` away.
    ///
    /// Used for shadow rays: anything at or behind the target does not count.
    pub fn length_exclusive(&mut self, length: f32) {
        self.t_max = length - self.t_min;
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// The accepted parameter range as an interval.
    #[inline]
    pub fn interval(&self) -> Interval {
        Interval::new(self.t_min, self.t_max)
    }

    /// Returns true if a hit at parameter `t` lies in `[t_min, t_max)`.
    #[inline]
    pub fn accepts(&self, t: f32) -> bool {
        self.interval().contains_half_open(t)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_default_range() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        assert_eq!(ray.t_min, RAY_EPSILON);
        assert_eq!(ray.t_max, f32::INFINITY);
        assert!(!ray.accepts(0.0));
        assert!(ray.accepts(1e6));
    }

    #[test]
    fn test_length_exclusive() {
        let mut ray = Ray::new(Vec3::ZERO, Vec3::Z);
        ray.length_exclusive(2.0);

        assert!(ray.accepts(1.5));
        assert!(!ray.accepts(2.0));
        assert!(!ray.accepts(2.0 - RAY_EPSILON));
    }
}
