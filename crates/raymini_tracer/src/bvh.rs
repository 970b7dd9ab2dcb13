//! Bounding Volume Hierarchy over a mesh's triangles.
//!
//! Binary tree with median splits on the longest centroid axis. This is the
//! spatial index objects use when built from a `Mesh`.

use raymini_core::{Mesh, SpatialIndex};
use raymini_math::{Aabb, Interval, Ray};

use crate::Triangle;

/// Maximum triangles per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with triangles.
pub enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        triangles: Vec<Triangle>,
        bbox: Aabb,
    },
    Empty,
}

impl BvhNode {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        if triangles.is_empty() {
            return BvhNode::Empty;
        }
        Self::build(triangles)
    }

    fn build(mut triangles: Vec<Triangle>) -> Self {
        let n = triangles.len();

        let bounds = triangles
            .iter()
            .map(Triangle::bounding_box)
            .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, &b));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                triangles,
                bbox: bounds,
            };
        }

        let centroid_bounds =
            Aabb::enclosing(triangles.iter().map(|t| t.bounding_box().centroid()));
        let axis = centroid_bounds.longest_axis();

        triangles.sort_unstable_by(|a, b| {
            let a_val = a.bounding_box().centroid()[axis];
            let b_val = b.bounding_box().centroid()[axis];
            a_val
                .partial_cmp(&b_val)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let right = triangles.split_off(n / 2);

        BvhNode::Branch {
            left: Box::new(Self::build(triangles)),
            right: Box::new(Self::build(right)),
            bbox: bounds,
        }
    }

    /// Record the closest hit within `ray_t` on `ray`.
    fn hit(&self, ray: &mut Ray, ray_t: Interval) -> bool {
        match self {
            BvhNode::Empty => false,

            BvhNode::Leaf { triangles, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return false;
                }

                let mut closest = ray_t.max;
                let mut hit_anything = false;
                for triangle in triangles {
                    if let Some((t, vertex)) = triangle.hit(ray, ray_t.with_max(closest)) {
                        closest = t;
                        ray.record(t, vertex);
                        hit_anything = true;
                    }
                }
                hit_anything
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return false;
                }

                let hit_left = left.hit(ray, ray_t);
                // Only check right up to closest hit
                let right_max = if hit_left { ray.distance() } else { ray_t.max };
                let hit_right = right.hit(ray, ray_t.with_max(right_max));

                hit_left || hit_right
            }
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }
}

/// Spatial index of a mesh in object space.
pub struct MeshBvh {
    root: BvhNode,
}

impl MeshBvh {
    /// Build the hierarchy; meshes without normals get smooth ones.
    pub fn new(mesh: &Mesh) -> Self {
        let triangles: Vec<Triangle> = if mesh.normals.is_some() {
            mesh.triangles().into_iter().map(Triangle::new).collect()
        } else {
            let mut mesh = mesh.clone();
            mesh.ensure_normals();
            mesh.triangles().into_iter().map(Triangle::new).collect()
        };
        log::debug!("Built BVH over {} triangles", triangles.len());

        Self {
            root: BvhNode::new(triangles),
        }
    }
}

impl SpatialIndex for MeshBvh {
    fn intersect(&self, ray: &mut Ray) -> bool {
        ray.clear();
        self.root.hit(ray, Interval::new(0.0, f32::INFINITY))
    }
}
