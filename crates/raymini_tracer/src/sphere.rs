//! Analytic sphere index.
//!
//! Cheaper and exact compared to a tessellated `MeshBvh`; handy for quick
//! scenes and light blockers.

use raymini_core::SpatialIndex;
use raymini_math::{Interval, Ray, Vec3, Vertex};

/// A sphere in object space.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }
}

impl SpatialIndex for Sphere {
    fn intersect(&self, ray: &mut Ray) -> bool {
        ray.clear();
        if self.radius == 0.0 {
            return false;
        }

        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return false;
        }

        let sqrtd = discriminant.sqrt();
        let ray_t = Interval::new(0.0, f32::INFINITY);

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return false;
            }
        }

        let p = ray.at(root);
        let outward_normal = (p - self.center) / self.radius;
        ray.record(root, Vertex::new(p, outward_normal));
        true
    }
}
