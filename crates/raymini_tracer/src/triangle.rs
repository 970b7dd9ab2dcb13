//! Triangle primitive for mesh intersection.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use raymini_math::{Aabb, Interval, Ray, Vec3, Vertex};

/// A triangle with per-vertex normals for smooth shading.
#[derive(Debug, Clone)]
pub struct Triangle {
    v0: Vec3,
    /// v1 - v0
    edge1: Vec3,
    /// v2 - v0
    edge2: Vec3,
    normals: [Vec3; 3],
    bbox: Aabb,
}

impl Triangle {
    /// Create a triangle from mesh vertices.
    ///
    /// Missing (zero) vertex normals fall back to the face normal.
    pub fn new(vertices: [Vertex; 3]) -> Self {
        let [a, b, c] = vertices;
        let edge1 = b.position - a.position;
        let edge2 = c.position - a.position;
        let face_normal = edge1.cross(edge2).normalize_or_zero();

        let normals = [a.normal, b.normal, c.normal].map(|n| {
            if n.length_squared() > 0.0 {
                n
            } else {
                face_normal
            }
        });

        Self {
            v0: a.position,
            edge1,
            edge2,
            normals,
            bbox: Aabb::enclosing([a.position, b.position, c.position]),
        }
    }

    /// Intersect within `ray_t`, returning the distance and the shading vertex.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<(f32, Vertex)> {
        let h = ray.direction().cross(self.edge2);
        let a = self.edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        let normal = ((1.0 - u - v) * self.normals[0] + u * self.normals[1] + v * self.normals[2])
            .normalize_or_zero();
        Some((t, Vertex::new(ray.at(t), normal)))
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_at_z(z: f32) -> Triangle {
        Triangle::new([
            Vertex::new(Vec3::new(-1.0, -1.0, z), Vec3::ZERO),
            Vertex::new(Vec3::new(1.0, -1.0, z), Vec3::ZERO),
            Vertex::new(Vec3::new(0.0, 1.0, z), Vec3::ZERO),
        ])
    }

    #[test]
    fn test_triangle_hit() {
        let tri = triangle_at_z(-1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        let (t, vertex) = tri
            .hit(&ray, Interval::new(0.0, f32::INFINITY))
            .expect("ray should hit");
        assert!((t - 1.0).abs() < 0.001);
        assert!((vertex.position - Vec3::new(0.0, 0.0, -1.0)).length() < 0.001);
        // Face normal fallback, counter-clockwise seen from +Z
        assert!((vertex.normal - Vec3::Z).length() < 0.001);
    }

    #[test]
    fn test_triangle_miss() {
        let tri = triangle_at_z(-1.0);

        let away = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(tri.hit(&away, Interval::new(0.0, f32::INFINITY)).is_none());

        // Hit exists but lies beyond the allowed range
        let toward = Ray::new(Vec3::ZERO, -Vec3::Z);
        assert!(tri.hit(&toward, Interval::new(0.0, 0.5)).is_none());
    }

    #[test]
    fn test_interpolated_normal() {
        let tri = Triangle::new([
            Vertex::new(Vec3::new(0.0, 0.0, 0.0), Vec3::X),
            Vertex::new(Vec3::new(1.0, 0.0, 0.0), Vec3::Y),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
        ]);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z);

        let (_, vertex) = tri
            .hit(&ray, Interval::new(0.0, f32::INFINITY))
            .expect("ray should hit the corner");
        assert!((vertex.normal - Vec3::X).length() < 0.001);
    }
}
