//! Ray tracer core: camera rays, parallel frames and accumulation.
//!
//! A render turns a scene and a camera view into an 8-bit image:
//! - Primary rays through every pixel, with sub-pixel anti-aliasing offsets
//!   and optional depth of field
//! - Rows shaded in parallel with rayon, each with its own seeded generator
//! - Scenes with mobile objects rendered over several frames and averaged
//! - Colors clamped to `[0, 255]` per channel

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::{Rgb, RgbImage};
use raymini_core::{Color, Scene};
use raymini_math::{Vec2, Vec3, Vec3Ext};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

use crate::progress::Progress;
use crate::{ProgressSink, Quality, RenderConfig, Tracer};

/// Errors that abort a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("render worker panicked on frame {frame}, row {row}: {message}")]
    WorkerPanicked {
        frame: u32,
        row: u32,
        message: String,
    },

    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("render cancelled")]
    Cancelled,
}

/// Camera pose and raster for one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    /// Unit view direction
    pub direction: Vec3,
    /// Unit up vector, orthogonal to `direction`
    pub up: Vec3,
    /// Unit right vector, orthogonal to `direction` and `up`
    pub right: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Width over height of the image plane
    pub aspect_ratio: f32,
    pub width: u32,
    pub height: u32,
}

impl CameraView {
    /// Camera at `position` looking at `target`, `vup` pointing roughly up.
    pub fn look_at(position: Vec3, target: Vec3, vup: Vec3, fov: f32, width: u32, height: u32) -> Self {
        let direction = (target - position).normalize_or_zero();
        let up = vup.project_on_plane(direction).normalize_or_zero();
        let right = direction.cross(up);

        Self {
            position,
            direction,
            up,
            right,
            fov,
            aspect_ratio: width as f32 / height.max(1) as f32,
            width,
            height,
        }
    }
}

/// Float color raster, row-major, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ColorBuffer {
    /// Create a new buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    fn add(&mut self, other: &ColorBuffer) {
        for (pixel, color) in self.pixels.iter_mut().zip(&other.pixels) {
            *pixel += *color;
        }
    }

    fn scale(&mut self, factor: f32) {
        for pixel in &mut self.pixels {
            *pixel *= factor;
        }
    }

    /// Quantize to 8 bits per channel.
    pub fn to_rgb8(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| Rgb(color_to_rgb(self.get(x, y))))
    }
}

/// Map a linear channel value to `max(0, min(255, round(255 * v)))`.
#[inline]
pub fn to_channel(value: f32) -> u8 {
    // NaN saturates to 0
    (255.0 * value).round().clamp(0.0, 255.0) as u8
}

/// Convert a color to 8-bit RGB.
pub fn color_to_rgb(color: Color) -> [u8; 3] {
    [to_channel(color.x), to_channel(color.y), to_channel(color.z)]
}

/// Primary ray layout shared by every pixel of a render.
struct PrimaryRays {
    position: Vec3,
    direction: Vec3,
    right: Vec3,
    up: Vec3,
    /// Image-plane step of one pixel to the right
    right_step: Vec3,
    /// Image-plane step of one pixel up
    up_step: Vec3,
    half_width: f32,
    half_height: f32,
    samples: Vec<Vec2>,
    focus: Option<Focus>,
}

struct Focus {
    /// Distance of the focal plane along the view direction
    distance: f32,
    eyes: Vec<Vec2>,
}

impl PrimaryRays {
    fn new(view: &CameraView, config: &RenderConfig, rng: &mut dyn RngCore) -> Self {
        let direction = view.direction.normalize_or_zero();
        let tang = (view.fov.to_radians() / 2.0).tan();
        let right_step = view.right * (2.0 * tang * view.aspect_ratio / view.width as f32);
        let up_step = view.up * (2.0 * tang / view.height as f32);

        let preview = config.quality == Quality::Preview;
        let samples = if preview {
            vec![Vec2::ZERO]
        } else {
            let aa = &config.anti_aliasing;
            aa.kind.offsets(aa.rays, rng)
        };

        let focus = match config.focus.point {
            Some(point) if !preview => {
                let distance = (point - view.position).dot(direction);
                let eyes = config.focus.kind.offsets(config.focus.aperture, config.focus.rays, rng);
                if distance <= 0.0 {
                    log::warn!("Focus point is behind the camera, depth of field disabled");
                    None
                } else if eyes.len() <= 1 {
                    None
                } else {
                    Some(Focus { distance, eyes })
                }
            }
            _ => None,
        };

        Self {
            position: view.position,
            direction,
            right: view.right,
            up: view.up,
            right_step,
            up_step,
            half_width: view.width as f32 / 2.0,
            half_height: view.height as f32 / 2.0,
            samples,
            focus,
        }
    }

    fn samples_per_pixel(&self) -> usize {
        self.samples.len() * self.focus.as_ref().map_or(1, |focus| focus.eyes.len())
    }

    /// Average color of every sample of pixel (`col`, `row`).
    fn pixel(&self, tracer: &Tracer<'_>, col: u32, row: u32, rng: &mut dyn RngCore) -> Color {
        let mut color = Color::ZERO;
        for offset in &self.samples {
            let x = col as f32 + 0.5 + offset.x - self.half_width;
            let y = self.half_height - row as f32 - 0.5 - offset.y;
            let step = self.direction + x * self.right_step + y * self.up_step;

            match &self.focus {
                None => {
                    let (dir, _) = step.normalize_with_length();
                    color += tracer.get_color(dir, self.position, rng);
                }
                Some(focus) => {
                    let focal_point = self.position + step * focus.distance;
                    for eye in &focus.eyes {
                        let origin = self.position + eye.x * self.right + eye.y * self.up;
                        let (dir, _) = (focal_point - origin).normalize_with_length();
                        color += tracer.get_color(dir, origin, rng);
                    }
                }
            }
        }
        color / self.samples_per_pixel() as f32
    }
}

/// Seed of the generator of one row of one frame.
fn row_seed(seed: u64, frame: u32, row: u32) -> u64 {
    seed ^ (((frame as u64) << 32) | row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Offline ray tracer.
///
/// Owns its configuration; a render borrows it immutably, so changing it
/// (through `config_mut`) is only possible between renders.
pub struct RayTracer {
    config: RenderConfig,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: Arc<AtomicBool>,
}

impl RayTracer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            progress: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    /// Flag that aborts the running render when set.
    ///
    /// Workers check it before every row; it is cleared when a render starts.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Render `scene` seen from `view` to an 8-bit image.
    ///
    /// Mobile objects are moved between frames and put back afterwards,
    /// whether the render succeeds or not.
    pub fn render(&self, scene: &mut Scene, view: &CameraView) -> Result<RgbImage, RenderError> {
        Ok(self.render_hdr(scene, view)?.to_rgb8())
    }

    /// Like `render`, keeping the averaged float colors.
    pub fn render_hdr(&self, scene: &mut Scene, view: &CameraView) -> Result<ColorBuffer, RenderError> {
        self.cancel.store(false, Ordering::Relaxed);
        let result = self.render_frames(scene, view);
        scene.reset();
        result
    }

    fn render_frames(&self, scene: &mut Scene, view: &CameraView) -> Result<ColorBuffer, RenderError> {
        if view.width == 0 || view.height == 0 {
            log::warn!("Empty raster {}x{}, nothing to render", view.width, view.height);
            return Ok(ColorBuffer::new(view.width, view.height));
        }

        log::debug!("Render configuration: {:?}", self.config);
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let rays = PrimaryRays::new(view, &self.config, &mut rng);
        let frames = if scene.has_mobile() && self.config.quality != Quality::Preview {
            self.config.frames.max(1)
        } else {
            1
        };

        let pool = match self.config.threads {
            Some(threads) => Some(rayon::ThreadPoolBuilder::new().num_threads(threads).build()?),
            None => None,
        };
        let threads = pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |pool| pool.current_num_threads());

        log::info!(
            "Rendering {}x{}, {} sample(s) per pixel, {} frame(s) on {} thread(s)",
            view.width,
            view.height,
            rays.samples_per_pixel(),
            frames,
            threads
        );
        let start = Instant::now();
        let progress = Progress::new(self.progress.clone(), frames as usize * view.height as usize);

        let mut accumulated = ColorBuffer::new(view.width, view.height);
        for frame in 0..frames {
            let frame_start = Instant::now();
            let scene_ref: &Scene = scene;
            let buffer = match &pool {
                Some(pool) => pool.install(|| self.render_frame(scene_ref, view, &rays, frame, &progress)),
                None => self.render_frame(scene_ref, view, &rays, frame, &progress),
            }?;
            accumulated.add(&buffer);
            log::debug!("Frame {}/{} done in {:.2?}", frame + 1, frames, frame_start.elapsed());

            if frame + 1 < frames {
                scene.advance_mobile();
            }
        }

        if frames > 1 {
            accumulated.scale(1.0 / frames as f32);
        }
        log::info!("Rendered in {:.2?}", start.elapsed());
        Ok(accumulated)
    }

    /// Shade every pixel of one frame, rows in parallel.
    fn render_frame(
        &self,
        scene: &Scene,
        view: &CameraView,
        rays: &PrimaryRays,
        frame: u32,
        progress: &Progress,
    ) -> Result<ColorBuffer, RenderError> {
        let tracer = Tracer::new(&self.config, scene);
        let mut buffer = ColorBuffer::new(view.width, view.height);

        buffer
            .pixels
            .par_chunks_mut(view.width as usize)
            .enumerate()
            .try_for_each(|(row, pixels)| {
                if self.cancel.load(Ordering::Relaxed) {
                    return Err(RenderError::Cancelled);
                }

                let row = row as u32;
                let mut rng = StdRng::seed_from_u64(row_seed(self.config.seed, frame, row));
                catch_unwind(AssertUnwindSafe(|| {
                    for (col, pixel) in pixels.iter_mut().enumerate() {
                        *pixel = rays.pixel(&tracer, col as u32, row, &mut rng);
                    }
                }))
                .map_err(|payload| RenderError::WorkerPanicked {
                    frame,
                    row,
                    message: panic_message(payload),
                })?;

                progress.row_done();
                Ok(())
            })?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AntiAliasing, FocusKind, MeshBvh, ShadowMode, Sphere};
    use raymini_core::{Brdf, Light, Material, Mesh, Object, Phong};
    use raymini_math::Vertex;
    use std::sync::Mutex;

    const BACKGROUND: Color = Color::new(0.1, 0.2, 0.3);

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn view(width: u32, height: u32) -> CameraView {
        CameraView {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            fov: 25.0,
            aspect_ratio: width as f32 / height as f32,
            width,
            height,
        }
    }

    fn config() -> RenderConfig {
        RenderConfig {
            background: BACKGROUND,
            ..RenderConfig::default()
        }
    }

    fn sphere_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_object(Object::new(
            "ball",
            Arc::new(MeshBvh::new(&Mesh::sphere(1.0, 16, 32))),
            Arc::new(Phong::new(Color::new(0.9, 0.9, 0.9))),
            Vec3::ZERO,
        ));
        scene.add_light(Light::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 0.5, 1.0));
        scene
    }

    struct Exploding;

    impl Material for Exploding {
        fn gen_color(&self, _: Vec3, _: &Vertex, _: &[Light], _: Brdf, _: f32) -> Color {
            panic!("material exploded")
        }
    }

    #[test]
    fn test_channel_clamp() {
        assert_eq!(to_channel(-1.0), 0);
        assert_eq!(to_channel(0.0), 0);
        assert_eq!(to_channel(0.5), 128);
        assert_eq!(to_channel(1.0), 255);
        assert_eq!(to_channel(2.0), 255);
        assert_eq!(to_channel(f32::NAN), 0);
        assert_eq!(color_to_rgb(Color::new(-1.0, 0.5, 2.0)), [0, 128, 255]);
    }

    #[test]
    fn test_look_at_basis() {
        let view = CameraView::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 40.0, 8, 4);
        assert!((view.direction - Vec3::NEG_Z).length() < 1e-6);
        assert!((view.right - Vec3::X).length() < 1e-6);
        assert!((view.up - Vec3::Y).length() < 1e-6);
        assert_eq!(view.aspect_ratio, 2.0);
    }

    #[test]
    fn test_empty_raster() {
        let tracer = RayTracer::new(config());
        let mut scene = sphere_scene();

        let image = tracer.render(&mut scene, &view(0, 4)).expect("render");
        assert_eq!(image.dimensions(), (0, 4));
        let image = tracer.render(&mut scene, &view(4, 0)).expect("render");
        assert_eq!(image.dimensions(), (4, 0));
    }

    #[test]
    fn test_empty_scene_is_background() {
        let tracer = RayTracer::new(config());
        let image = tracer.render(&mut Scene::new(), &view(3, 2)).expect("render");

        let expected = color_to_rgb(BACKGROUND);
        assert!(image.pixels().all(|p| p.0 == expected));
    }

    #[test]
    fn test_lit_sphere() {
        init_logger();
        let tracer = RayTracer::new(config());
        let mut scene = sphere_scene();

        let image = tracer.render(&mut scene, &view(4, 4)).expect("render");
        assert_eq!(image.dimensions(), (4, 4));

        let background = color_to_rgb(BACKGROUND);
        for (x, y) in [(0, 0), (3, 0), (0, 3), (3, 3)] {
            assert_eq!(image.get_pixel(x, y).0, background, "corner ({}, {})", x, y);
        }

        let luma = |x, y| image.get_pixel(x, y).0.iter().map(|&c| c as u32).sum::<u32>();
        for x in [1, 2] {
            assert_ne!(image.get_pixel(x, 0).0, background);
            assert!(luma(x, 0) > luma(x, 3), "column {}", x);
        }
    }

    #[test]
    fn test_single_ray_anti_aliasing_matches_pixel_center() {
        let mut scene = sphere_scene();
        let reference = RayTracer::new(config())
            .render(&mut scene, &view(8, 8))
            .expect("render");

        for kind in [AntiAliasing::Uniform, AntiAliasing::Polygon, AntiAliasing::Stochastic] {
            let mut config = config();
            config.anti_aliasing.kind = kind;
            config.anti_aliasing.rays = 1;
            let image = RayTracer::new(config).render(&mut scene, &view(8, 8)).expect("render");
            assert_eq!(image, reference, "{:?}", kind);
        }
    }

    #[test]
    fn test_anti_aliasing_smooths_edges() {
        let mut scene = sphere_scene();
        let reference = RayTracer::new(config())
            .render_hdr(&mut scene, &view(16, 16))
            .expect("render");

        let mut config = config();
        config.anti_aliasing.kind = AntiAliasing::Uniform;
        config.anti_aliasing.rays = 16;
        let image = RayTracer::new(config).render_hdr(&mut scene, &view(16, 16)).expect("render");

        assert_ne!(image, reference);
        assert!((image.get(0, 0) - BACKGROUND).length() < 1e-5);
    }

    #[test]
    fn test_pinhole_focus_matches_plain_render() {
        let mut scene = sphere_scene();
        let reference = RayTracer::new(config())
            .render(&mut scene, &view(6, 6))
            .expect("render");

        let mut config = config();
        config.focus.kind = FocusKind::Stochastic;
        config.focus.aperture = 0.0;
        config.focus.rays = 8;
        config.focus.point = Some(Vec3::ZERO);
        let image = RayTracer::new(config).render(&mut scene, &view(6, 6)).expect("render");
        assert_eq!(image, reference);
    }

    #[test]
    fn test_depth_of_field_keeps_focused_center() {
        let mut scene = sphere_scene();
        let mut config = config();
        config.focus.kind = FocusKind::Uniform;
        config.focus.aperture = 0.05;
        config.focus.rays = 6;
        config.focus.point = Some(Vec3::new(0.0, 0.0, 1.0));

        let image = RayTracer::new(config).render_hdr(&mut scene, &view(9, 9)).expect("render");
        // Center pixel sees the sphere from every eye
        assert_ne!(image.get(4, 4), BACKGROUND);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let mut scene = sphere_scene();
        let mut config = config();
        config.ambient_occlusion.rays = 8;
        config.shadow.mode = ShadowMode::Soft;
        config.seed = 7;

        let tracer = RayTracer::new(config);
        let first = tracer.render(&mut scene, &view(8, 8)).expect("render");
        let second = tracer.render(&mut scene, &view(8, 8)).expect("render");
        assert_eq!(first, second);
    }

    #[test]
    fn test_thread_count_does_not_change_image() {
        let mut scene = sphere_scene();
        let mut config = config();
        config.path_tracing.depth = 1;
        config.path_tracing.rays = 4;

        let mut tracer = RayTracer::new(config);
        let global = tracer.render(&mut scene, &view(8, 8)).expect("render");
        tracer.config_mut().threads = Some(2);
        let pooled = tracer.render(&mut scene, &view(8, 8)).expect("render");
        assert_eq!(global, pooled);
    }

    #[test]
    fn test_animation_averages_frames() {
        let step = Vec3::new(0.1, 0.0, 0.0);
        let start = Vec3::new(-0.2, 0.0, 0.0);
        let moving = |trans: Vec3, motion: Vec3| {
            let mut scene = Scene::new();
            scene.add_object(
                Object::new(
                    "ball",
                    Arc::new(Sphere::new(Vec3::ZERO, 1.0)),
                    Arc::new(Phong::new(Color::ONE)),
                    trans,
                )
                .with_motion(motion),
            );
            scene.add_light(Light::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 0.5, 1.0));
            scene
        };

        let mut config = config();
        config.frames = 5;
        let mut scene = moving(start, step);
        let animated = RayTracer::new(config.clone())
            .render_hdr(&mut scene, &view(8, 8))
            .expect("render");
        assert_eq!(scene.objects[0].trans, start);

        let mut expected = ColorBuffer::new(8, 8);
        for k in 0..5 {
            let mut still = moving(start + k as f32 * step, Vec3::ZERO);
            let frame = RayTracer::new(config.clone())
                .render_hdr(&mut still, &view(8, 8))
                .expect("render");
            expected.add(&frame);
        }

        for (a, e) in animated.pixels.iter().zip(&expected.pixels) {
            assert!((*a - *e / 5.0).length() < 1e-5, "{:?} vs {:?}", a, *e / 5.0);
        }
    }

    #[test]
    fn test_static_scene_renders_one_frame() {
        let counted = Arc::new(Mutex::new(0usize));
        let sink = {
            let counted = Arc::clone(&counted);
            move |_: f32| *counted.lock().unwrap() += 1
        };

        let mut config = config();
        config.frames = 4;
        let tracer = RayTracer::new(config).with_progress(sink);
        tracer.render(&mut sphere_scene(), &view(4, 3)).expect("render");
        assert_eq!(*counted.lock().unwrap(), 3);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |fraction: f32| seen.lock().unwrap().push(fraction)
        };

        let tracer = RayTracer::new(config()).with_progress(sink);
        tracer.render(&mut sphere_scene(), &view(5, 7)).expect("render");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 7);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let mut scene = Scene::new();
        scene.add_object(Object::new(
            "bomb",
            Arc::new(Sphere::new(Vec3::ZERO, 1.0)),
            Arc::new(Exploding),
            Vec3::ZERO,
        ));

        let err = RayTracer::new(config()).render(&mut scene, &view(4, 4)).unwrap_err();
        match err {
            RenderError::WorkerPanicked { message, row, .. } => {
                assert_eq!(message, "material exploded");
                assert!(row < 4);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_cancel_stops_render() {
        let slot = Arc::new(Mutex::new(None::<Arc<AtomicBool>>));
        let renderer = {
            let handle = Arc::clone(&slot);
            RayTracer::new(config()).with_progress(move |_: f32| {
                if let Some(cancel) = handle.lock().unwrap().as_ref() {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
        };
        *slot.lock().unwrap() = Some(renderer.cancel_handle());

        let mut config = config();
        config.threads = Some(1);
        let mut renderer = renderer;
        *renderer.config_mut() = config;

        let err = renderer.render(&mut sphere_scene(), &view(4, 8)).unwrap_err();
        assert!(matches!(err, RenderError::Cancelled));
    }

    #[test]
    fn test_mobile_objects_reset_after_failure() {
        let mut scene = Scene::new();
        scene.add_object(
            Object::new(
                "bomb",
                Arc::new(Sphere::new(Vec3::ZERO, 1.0)),
                Arc::new(Exploding),
                Vec3::ZERO,
            )
            .with_motion(Vec3::X),
        );

        let mut config = config();
        config.frames = 3;
        assert!(RayTracer::new(config).render(&mut scene, &view(2, 2)).is_err());
        assert_eq!(scene.objects[0].trans, Vec3::ZERO);
    }
}
