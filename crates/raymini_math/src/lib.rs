// Re-export glam for convenience
pub use glam::*;

// raymini math types
mod aabb;
mod interval;
mod ray;
mod vertex;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::{Intersection, Ray};
pub use vertex::Vertex;

/// Below this length a vector is treated as degenerate.
pub const EPSILON_LENGTH: f32 = 1e-12;

/// Helpers on top of glam's `Vec3` that the tracer relies on.
pub trait Vec3Ext {
    /// Normalize, also returning the length before normalization.
    ///
    /// Near-zero vectors yield `(Vec3::ZERO, 0.0)` instead of NaNs.
    fn normalize_with_length(self) -> (Vec3, f32);

    /// Remove the component along `normal` (projection on the plane it defines).
    fn project_on_plane(self, normal: Vec3) -> Vec3;
}

impl Vec3Ext for Vec3 {
    fn normalize_with_length(self) -> (Vec3, f32) {
        let length = self.length();
        if length <= EPSILON_LENGTH || !length.is_finite() {
            return (Vec3::ZERO, 0.0);
        }
        (self / length, length)
    }

    fn project_on_plane(self, normal: Vec3) -> Vec3 {
        let n2 = normal.length_squared();
        if n2 <= EPSILON_LENGTH {
            return self;
        }
        self - normal * (self.dot(normal) / n2)
    }
}
