//! Triangle mesh representation.
//!
//! Meshes are plain vertex/index arrays in object space. Loading them from
//! files is left to the caller; a few procedural shapes are provided for
//! scenes built in code (and for the skybox).

use std::f32::consts::PI;

use raymini_math::{Aabb, Vec3, Vertex};

/// A mesh consisting of vertex positions, optional normals, and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - see `ensure_normals`)
    pub normals: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle, counter-clockwise)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::enclosing(positions.iter().copied());
        Self {
            positions,
            normals,
            indices,
            bounds,
        }
    }

    /// Compute smooth vertex normals by averaging face normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            // Isolated vertices get an arbitrary up normal
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Ensure the mesh has one normal per vertex, computing them if necessary.
    pub fn ensure_normals(&mut self) {
        let should_compute = match &self.normals {
            None => true,
            Some(normals) => normals.len() != self.positions.len(),
        };

        if should_compute {
            if let Some(normals) = &self.normals {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), computing smooth normals",
                    normals.len(),
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex `i` with its normal (zero when the mesh has none).
    pub fn vertex(&self, i: usize) -> Vertex {
        let normal = self
            .normals
            .as_ref()
            .and_then(|normals| normals.get(i).copied())
            .unwrap_or(Vec3::ZERO);
        Vertex::new(self.positions[i], normal)
    }

    /// Extract triangles as vertex triplets, skipping out-of-range indices.
    pub fn triangles(&self) -> Vec<[Vertex; 3]> {
        let mut triangles = Vec::with_capacity(self.triangle_count());

        for chunk in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize];

            if i0 >= self.positions.len()
                || i1 >= self.positions.len()
                || i2 >= self.positions.len()
            {
                log::warn!(
                    "Invalid triangle indices: [{}, {}, {}], vertex count: {}",
                    i0,
                    i1,
                    i2,
                    self.positions.len()
                );
                continue;
            }

            triangles.push([self.vertex(i0), self.vertex(i1), self.vertex(i2)]);
        }

        triangles
    }

    /// Axis-aligned cube of side 2 centered at the origin, flat shaded.
    pub fn cube() -> Self {
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for axis in 0..3 {
            for sign in [1.0f32, -1.0] {
                let mut normal = Vec3::ZERO;
                normal[axis] = sign;
                // Two tangents so that u x v == normal
                let u = Vec3::new(normal.y, normal.z, normal.x);
                let v = normal.cross(u);

                let base = positions.len() as u32;
                for (a, b) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                    positions.push(normal + a * u + b * v);
                    normals.push(normal);
                }
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
        }

        Self::new(positions, indices, Some(normals))
    }

    /// UV sphere of the given radius centered at the origin, smooth shaded.
    pub fn sphere(radius: f32, stacks: u32, slices: u32) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);
        let mut positions = Vec::new();
        let mut normals = Vec::new();

        for i in 0..=stacks {
            let theta = PI * i as f32 / stacks as f32;
            for j in 0..=slices {
                let phi = 2.0 * PI * j as f32 / slices as f32;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                positions.push(radius * n);
                normals.push(n);
            }
        }

        let row = slices + 1;
        let mut indices = Vec::new();
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }

        Self::new(positions, indices, Some(normals))
    }

    /// Square of half-extent `half_size` in the XZ plane, facing +Y.
    pub fn plane(half_size: f32) -> Self {
        let s = half_size;
        let positions = vec![
            Vec3::new(-s, 0.0, -s),
            Vec3::new(-s, 0.0, s),
            Vec3::new(s, 0.0, s),
            Vec3::new(s, 0.0, -s),
        ];
        Self::new(positions, vec![0, 1, 2, 0, 2, 3], Some(vec![Vec3::Y; 4]))
    }
}
