//! raymini tracer - offline CPU ray tracing.
//!
//! Renders a `raymini_core::Scene` to an image with:
//! - Phong direct lighting with hard or soft (area light) shadows
//! - Ambient occlusion and path-traced diffuse bounces
//! - Anti-aliasing and depth of field
//! - Multi-frame accumulation of moving objects
//! - Row-parallel rendering on rayon with progress and cancellation
//!
//! Meshes are intersected through a `MeshBvh`; `Sphere` is an analytic
//! alternative. Everything else is configured through `RenderConfig`.
//!
//! # Example
//!
//! ```ignore
//! let tracer = RayTracer::new(RenderConfig::default()).with_progress(LogProgress::new());
//! let view = CameraView::look_at(eye, Vec3::ZERO, Vec3::Y, 40.0, 640, 480);
//! let image = tracer.render(&mut scene, &view)?;
//! let [r, g, b] = image.get_pixel(320, 240).0;
//! ```

mod bvh;
mod config;
mod progress;
mod renderer;
mod sampling;
mod shadow;
mod sphere;
mod tracer;
mod triangle;

pub use bvh::{BvhNode, MeshBvh};
pub use config::{
    AmbientOcclusionConfig, AntiAliasingConfig, ConfigError, FocusConfig, PathTracingConfig,
    Quality, RenderConfig,
};
pub use progress::{LogProgress, ProgressSink};
pub use renderer::{color_to_rgb, to_channel, CameraView, ColorBuffer, RayTracer, RenderError};
pub use sampling::{cone_directions, gen_f32, light_impulses, AntiAliasing, FocusKind};
pub use shadow::{Shadow, ShadowMode};
pub use sphere::Sphere;
pub use tracer::{Hit, Tracer, DISTANCE_MIN_INTERSECT};
pub use triangle::Triangle;

/// Re-export the scene color type
pub use raymini_core::Color;
/// Re-export common math types from raymini_math
pub use raymini_math::{Vec2, Vec3};
