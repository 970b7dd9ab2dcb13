//! Sampling strategies: sub-pixel offsets, aperture offsets, cone directions
//! and area-light impulses.
//!
//! Every sampler takes the generator explicitly so that a render seeded with
//! the same value produces the same image.

use std::f32::consts::{FRAC_PI_2, PI};

use raymini_core::Light;
use raymini_math::{Vec2, Vec3, Vec3Ext};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    // 24 random mantissa bits
    (rng.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

/// Sub-pixel sampling pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiAliasing {
    /// One ray through the pixel center
    #[default]
    None,
    /// Regular grid of sub-pixel centers
    Uniform,
    /// Regular polygon around the pixel center
    Polygon,
    /// Uniform random jitter
    Stochastic,
}

impl AntiAliasing {
    /// Offsets from the pixel center, in pixels, within [-0.5, 0.5]².
    ///
    /// Generated once per render and shared by every pixel. `None` and
    /// `rays <= 1` give exactly the pixel center.
    pub fn offsets(self, rays: u32, rng: &mut dyn RngCore) -> Vec<Vec2> {
        if self == AntiAliasing::None || rays <= 1 {
            return vec![Vec2::ZERO];
        }
        let n = rays as usize;

        match self {
            AntiAliasing::None => vec![Vec2::ZERO],
            AntiAliasing::Uniform => {
                let cols = (n as f32).sqrt().ceil() as usize;
                let rows = n.div_ceil(cols);
                (0..n)
                    .map(|k| {
                        let (c, r) = (k % cols, k / cols);
                        Vec2::new(
                            (c as f32 + 0.5) / cols as f32 - 0.5,
                            (r as f32 + 0.5) / rows as f32 - 0.5,
                        )
                    })
                    .collect()
            }
            AntiAliasing::Polygon => {
                let radius = 1.0 / 3.0;
                (0..n)
                    .map(|k| {
                        let angle = 2.0 * PI * k as f32 / n as f32;
                        radius * Vec2::new(angle.cos(), angle.sin())
                    })
                    .collect()
            }
            AntiAliasing::Stochastic => (0..n)
                .map(|_| Vec2::new(gen_f32(rng) - 0.5, gen_f32(rng) - 0.5))
                .collect(),
        }
    }
}

/// Aperture sampling pattern for depth of field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusKind {
    /// Pinhole camera
    #[default]
    None,
    /// Evenly spaced on the aperture circle
    Uniform,
    /// Uniform random on the aperture disk
    Stochastic,
}

impl FocusKind {
    /// Eye displacements along the camera right/up vectors, in world units.
    ///
    /// Degenerates to the pinhole `[(0, 0)]` when disabled, when the
    /// aperture is not positive or when fewer than two rays are requested.
    pub fn offsets(self, aperture: f32, rays: u32, rng: &mut dyn RngCore) -> Vec<Vec2> {
        if self == FocusKind::None || aperture <= 0.0 || rays <= 1 {
            return vec![Vec2::ZERO];
        }
        let n = rays as usize;

        match self {
            FocusKind::None => vec![Vec2::ZERO],
            FocusKind::Uniform => (0..n)
                .map(|k| {
                    let angle = 2.0 * PI * k as f32 / n as f32;
                    aperture * Vec2::new(angle.cos(), angle.sin())
                })
                .collect(),
            FocusKind::Stochastic => (0..n).map(|_| aperture * random_in_unit_disk(rng)).collect(),
        }
    }
}

/// Sample a random point in the unit disk.
fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec2 {
    loop {
        let p = Vec2::new(gen_f32(rng) * 2.0 - 1.0, gen_f32(rng) * 2.0 - 1.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// `count` unit directions uniformly distributed (in solid angle) inside the
/// cone of half-angle `max_angle` around `normal`.
///
/// The angle is clamped to [0, π/2] so no direction points below the
/// surface. A degenerate normal yields no directions.
pub fn cone_directions(
    normal: Vec3,
    max_angle: f32,
    count: u32,
    rng: &mut dyn RngCore,
) -> Vec<Vec3> {
    let (normal, length) = normal.normalize_with_length();
    if length == 0.0 || count == 0 {
        return Vec::new();
    }

    let cos_max = max_angle.clamp(0.0, FRAC_PI_2).cos();
    let (tangent, bitangent) = normal.any_orthonormal_pair();

    (0..count)
        .map(|_| {
            let cos_theta = 1.0 - gen_f32(rng) * (1.0 - cos_max);
            let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
            let phi = 2.0 * PI * gen_f32(rng);
            (sin_theta * (phi.cos() * tangent + phi.sin() * bitangent) + cos_theta * normal)
                .normalize()
        })
        .collect()
}

/// `count` points on the disk of an area light, for soft shadows.
///
/// A zero radius or a degenerate normal collapses every impulse onto the
/// light position (a point light).
pub fn light_impulses(light: &Light, count: u32, rng: &mut dyn RngCore) -> Vec<Vec3> {
    let (normal, length) = light.normal.normalize_with_length();
    if light.radius <= 0.0 || length == 0.0 {
        return vec![light.position; count as usize];
    }

    let (u, v) = normal.any_orthonormal_pair();
    (0..count)
        .map(|_| {
            let p = random_in_unit_disk(rng);
            light.position + light.radius * (p.x * u + p.y * v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_gen_f32_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = gen_f32(&mut rng);
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_no_anti_aliasing_is_pixel_center() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(AntiAliasing::None.offsets(1, &mut rng), vec![Vec2::ZERO]);
        assert_eq!(AntiAliasing::None.offsets(16, &mut rng), vec![Vec2::ZERO]);
        // A single jittered ray also stays at the center
        assert_eq!(AntiAliasing::Stochastic.offsets(1, &mut rng), vec![Vec2::ZERO]);
        assert_eq!(AntiAliasing::Uniform.offsets(0, &mut rng), vec![Vec2::ZERO]);
    }

    #[test]
    fn test_uniform_grid() {
        let mut rng = StdRng::seed_from_u64(1);
        let offsets = AntiAliasing::Uniform.offsets(4, &mut rng);

        assert_eq!(offsets.len(), 4);
        for expected in [
            Vec2::new(-0.25, -0.25),
            Vec2::new(0.25, -0.25),
            Vec2::new(-0.25, 0.25),
            Vec2::new(0.25, 0.25),
        ] {
            assert!(offsets.iter().any(|o| (*o - expected).length() < 1e-6));
        }
        assert_eq!(AntiAliasing::Uniform.offsets(5, &mut rng).len(), 5);
    }

    #[test]
    fn test_offsets_stay_in_pixel() {
        let mut rng = StdRng::seed_from_u64(3);
        for kind in [AntiAliasing::Uniform, AntiAliasing::Polygon, AntiAliasing::Stochastic] {
            let offsets = kind.offsets(9, &mut rng);
            assert_eq!(offsets.len(), 9);
            for o in offsets {
                assert!(o.x.abs() <= 0.5 && o.y.abs() <= 0.5, "{:?} {:?}", kind, o);
            }
        }
    }

    #[test]
    fn test_focus_degenerates_to_pinhole() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(FocusKind::Stochastic.offsets(0.0, 8, &mut rng), vec![Vec2::ZERO]);
        assert_eq!(FocusKind::Stochastic.offsets(0.5, 0, &mut rng), vec![Vec2::ZERO]);
        assert_eq!(FocusKind::None.offsets(0.5, 8, &mut rng), vec![Vec2::ZERO]);
    }

    #[test]
    fn test_focus_offsets_within_aperture() {
        let mut rng = StdRng::seed_from_u64(5);
        let uniform = FocusKind::Uniform.offsets(0.2, 6, &mut rng);
        assert_eq!(uniform.len(), 6);
        for o in &uniform {
            assert!((o.length() - 0.2).abs() < 1e-5);
        }

        let stochastic = FocusKind::Stochastic.offsets(0.2, 32, &mut rng);
        assert_eq!(stochastic.len(), 32);
        assert!(stochastic.iter().all(|o| o.length() < 0.2));
    }

    #[test]
    fn test_cone_directions_above_surface() {
        let mut rng = StdRng::seed_from_u64(11);
        let normal = Vec3::new(0.3, 1.0, -0.2).normalize();

        let hemisphere = cone_directions(normal, FRAC_PI_2, 200, &mut rng);
        assert_eq!(hemisphere.len(), 200);
        for d in &hemisphere {
            assert!((d.length() - 1.0).abs() < 1e-4);
            assert!(d.dot(normal) >= -1e-6);
        }

        // Wider angles are clamped to the hemisphere
        let clamped = cone_directions(normal, PI, 200, &mut rng);
        assert!(clamped.iter().all(|d| d.dot(normal) >= -1e-6));
    }

    #[test]
    fn test_narrow_cone() {
        let mut rng = StdRng::seed_from_u64(13);
        let max_angle = 0.1f32;
        for d in cone_directions(Vec3::Z, max_angle, 100, &mut rng) {
            assert!(d.dot(Vec3::Z) >= max_angle.cos() - 1e-5);
        }
        // Zero angle collapses onto the normal
        for d in cone_directions(Vec3::X, 0.0, 10, &mut rng) {
            assert!((d - Vec3::X).length() < 1e-5);
        }
    }

    #[test]
    fn test_cone_degenerate_normal() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(cone_directions(Vec3::ZERO, 1.0, 10, &mut rng).is_empty());
        assert!(cone_directions(Vec3::Y, 1.0, 0, &mut rng).is_empty());
    }

    #[test]
    fn test_light_impulses_on_disk() {
        let mut rng = StdRng::seed_from_u64(17);
        let light = Light::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 0.5, 1.0);

        let impulses = light_impulses(&light, 64, &mut rng);
        assert_eq!(impulses.len(), 64);
        for p in impulses {
            assert!((p.y - 5.0).abs() < 1e-5);
            assert!((p - light.position).length() <= 0.5 + 1e-5);
        }
    }

    #[test]
    fn test_point_light_impulses() {
        let mut rng = StdRng::seed_from_u64(17);
        let point = Light::new(Vec3::ONE, Vec3::Y, 0.0, 1.0);
        assert_eq!(light_impulses(&point, 3, &mut rng), vec![Vec3::ONE; 3]);

        let no_normal = Light::new(Vec3::ONE, Vec3::ZERO, 1.0, 1.0);
        assert_eq!(light_impulses(&no_normal, 2, &mut rng), vec![Vec3::ONE; 2]);
    }
}
