//! Shadow evaluator: light visibility from a surface point.

use raymini_core::Light;
use raymini_math::{Vec3, Vec3Ext};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::sampling::light_impulses;
use crate::Tracer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowMode {
    /// Lights are always fully visible
    None,
    /// One visibility ray per light
    #[default]
    Hard,
    /// Fraction of unoccluded impulses on the light disk
    Soft,
}

/// Visibility policy applied to every light before shading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shadow {
    pub mode: ShadowMode,
    /// Samples on the light disk for soft shadows
    #[serde(deserialize_with = "crate::config::count")]
    pub impulses: u32,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            mode: ShadowMode::Hard,
            impulses: 16,
        }
    }
}

impl Shadow {
    /// Visibility of `light` from `pos` in [0, 1].
    ///
    /// Soft shadows fall back to hard ones below optimal quality.
    pub fn visibility(
        &self,
        tracer: &Tracer<'_>,
        pos: Vec3,
        light: &Light,
        rng: &mut dyn RngCore,
    ) -> f32 {
        match self.mode {
            ShadowMode::None => 1.0,
            ShadowMode::Soft if tracer.config().allows_soft_shadows() => {
                self.soft(tracer, pos, light, rng)
            }
            ShadowMode::Hard | ShadowMode::Soft => {
                if self.hard(tracer, pos, light.position) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Whether `target` is visible from `pos`.
    ///
    /// The nearest occluder strictly before the target decides; surfaces
    /// transparent for shadows let the light through.
    pub fn hard(&self, tracer: &Tracer<'_>, pos: Vec3, target: Vec3) -> bool {
        let (dir, dist) = (target - pos).normalize_with_length();
        if dist == 0.0 {
            return true;
        }

        match tracer.intersect_within(dir, pos, dist, false) {
            None => true,
            Some(hit) => hit.object.material().is_transparent_for_shadow(),
        }
    }

    /// Fraction of the light disk visible from `pos`.
    ///
    /// With at most one impulse this is exactly the hard test.
    pub fn soft(
        &self,
        tracer: &Tracer<'_>,
        pos: Vec3,
        light: &Light,
        rng: &mut dyn RngCore,
    ) -> f32 {
        if self.impulses <= 1 {
            return if self.hard(tracer, pos, light.position) {
                1.0
            } else {
                0.0
            };
        }

        let impulses = light_impulses(light, self.impulses, rng);
        let visible = impulses
            .iter()
            .filter(|&&impulse| self.hard(tracer, pos, impulse))
            .count();
        visible as f32 / impulses.len() as f32
    }
}
