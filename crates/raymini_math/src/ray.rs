use crate::{Vec3, Vertex};

/// Closest hit recorded on a ray by a spatial index.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    /// Parameter along the ray (the direction is unit length, so a distance)
    pub distance: f32,
    /// Hit point and shading normal
    pub vertex: Vertex,
}

/// A ray with origin, direction and its intersection outcome.
///
/// A ray is created fresh for every query, handed mutably to the spatial
/// index which records the closest hit, then read by the caller.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    intersection: Option<Intersection>,
}

impl Ray {
    /// Create a new ray with no intersection.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            intersection: None,
        }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Whether a hit has been recorded.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.intersection.is_some()
    }

    /// Distance of the recorded hit, `f32::INFINITY` when there is none.
    #[inline]
    pub fn distance(&self) -> f32 {
        self.intersection
            .map(|hit| hit.distance)
            .unwrap_or(f32::INFINITY)
    }

    #[inline]
    pub fn intersection(&self) -> Option<&Intersection> {
        self.intersection.as_ref()
    }

    /// Hit point and normal, if any.
    #[inline]
    pub fn vertex(&self) -> Option<&Vertex> {
        self.intersection.as_ref().map(|hit| &hit.vertex)
    }

    /// Record a hit, replacing any previous one.
    pub fn record(&mut self, distance: f32, vertex: Vertex) {
        self.intersection = Some(Intersection { distance, vertex });
    }

    /// Forget the recorded hit.
    pub fn clear(&mut self) {
        self.intersection = None;
    }

    /// Move the ray (and its hit point) by `offset`.
    ///
    /// Used to bring a hit found in object space back to world space.
    pub fn translate(&mut self, offset: Vec3) {
        self.origin += offset;
        if let Some(hit) = &mut self.intersection {
            hit.vertex = hit.vertex.translated(offset);
        }
    }
}
