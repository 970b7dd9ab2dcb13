use crate::Vec3;

/// A surface point: position plus shading normal.
///
/// Normals are unit length by convention of mesh construction.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }

    /// Same vertex moved by `offset`; the normal is unchanged.
    #[inline]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            position: self.position + offset,
            normal: self.normal,
        }
    }
}
