//! raymini core - scene model for the ray tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` with procedural cube, sphere and plane generators
//! - **Lighting**: `Light` (disk lights, point lights)
//! - **Shading**: the `Material` capability, `Brdf` modes and the `Phong`,
//!   `Glass` and `SkyBox` materials
//! - **Scene**: `Object`, `Scene` and the `SpatialIndex` capability objects
//!   are intersected through
//!
//! # Example
//!
//! ```ignore
//! use raymini_core::{Light, Object, Phong, Scene};
//!
//! let mut scene = Scene::new();
//! scene.add_object(Object::new("ball", index, Arc::new(Phong::new(color)), Vec3::ZERO));
//! scene.add_light(Light::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 0.5, 1.0));
//! ```

pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;

use raymini_math::Vec3;

/// Color type alias (linear RGB, nominally 0-1)
pub type Color = Vec3;

// Re-export commonly used types
pub use light::Light;
pub use material::{Brdf, CubeSide, Glass, Material, Phong, SkyBox};
pub use mesh::Mesh;
pub use scene::{Object, Scene, SpatialIndex};
