//! Render configuration.
//!
//! Every knob of a render pass lives here. The configuration is owned by the
//! `RayTracer` and borrowed immutably for the duration of a render, so it
//! cannot change mid-pass. It can be loaded from JSON; every section is
//! optional and falls back to its default.

use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::{AntiAliasing, Color, FocusKind, Shadow};
use raymini_math::Vec3;

/// Errors that can occur while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Global quality level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// One primary ray per pixel, direct lighting with hard shadows only
    Preview,
    /// Everything configured except soft shadows
    Basic,
    /// Everything configured
    #[default]
    Optimal,
}

/// Path-traced indirect lighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTracingConfig {
    /// Maximum bounce depth, 0 disables path tracing
    #[serde(deserialize_with = "count")]
    pub depth: u32,
    /// Bounce rays per evaluation
    #[serde(deserialize_with = "count")]
    pub rays: u32,
    /// Cone half-angle around the normal, radians
    pub max_angle: f32,
    /// Global scale of bounce lights
    pub intensity: f32,
    /// Debug view: show only the indirect contribution
    pub only: bool,
}

impl Default for PathTracingConfig {
    fn default() -> Self {
        Self {
            depth: 0,
            rays: 50,
            max_angle: FRAC_PI_2,
            intensity: 1.0,
            only: false,
        }
    }
}

/// Ambient occlusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientOcclusionConfig {
    /// Occlusion rays per point, 0 returns the plain `intensity`
    #[serde(deserialize_with = "count")]
    pub rays: u32,
    /// Cone half-angle around the normal, radians
    pub max_angle: f32,
    /// Geometry closer than this occludes
    pub radius: f32,
    /// Ambient intensity of a fully unoccluded point
    pub intensity: f32,
    /// Debug view: show only the ambient term
    pub only: bool,
}

impl Default for AmbientOcclusionConfig {
    fn default() -> Self {
        Self {
            rays: 0,
            max_angle: FRAC_PI_2,
            radius: 2.0,
            intensity: 0.2,
            only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiAliasingConfig {
    pub kind: AntiAliasing,
    #[serde(deserialize_with = "count")]
    pub rays: u32,
}

/// Depth of field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub kind: FocusKind,
    /// Aperture radius in world units
    pub aperture: f32,
    #[serde(deserialize_with = "count")]
    pub rays: u32,
    /// Point that is in perfect focus; depth of field is off without one
    pub point: Option<Vec3>,
}

/// Render configuration.
///
/// `quality` gates some sections at render time: `Quality::Preview` ignores
/// `path_tracing.depth`, `ambient_occlusion.rays`, anti-aliasing, depth of
/// field and `frames`, and uses hard shadows; `Quality::Basic` only turns
/// soft shadows into hard ones. `effective_depth` and `effective_ao_rays`
/// return the counts a render actually uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub quality: Quality,
    /// Color of rays that hit nothing (when the scene has no skybox)
    pub background: Color,
    pub path_tracing: PathTracingConfig,
    pub ambient_occlusion: AmbientOcclusionConfig,
    pub anti_aliasing: AntiAliasingConfig,
    pub shadow: Shadow,
    pub focus: FocusConfig,
    /// Frames accumulated for scenes with mobile objects
    #[serde(deserialize_with = "count")]
    pub frames: u32,
    /// Worker threads, rayon's global pool when unset
    pub threads: Option<usize>,
    /// Base seed of the per-row random generators
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            quality: Quality::Optimal,
            background: Color::ZERO,
            path_tracing: PathTracingConfig::default(),
            ambient_occlusion: AmbientOcclusionConfig::default(),
            anti_aliasing: AntiAliasingConfig {
                kind: AntiAliasing::None,
                rays: 1,
            },
            shadow: Shadow::default(),
            focus: FocusConfig::default(),
            frames: 1,
            threads: None,
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::debug!("Loaded render configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Path tracing depth actually used at this quality.
    pub fn effective_depth(&self) -> u32 {
        match self.quality {
            Quality::Preview => 0,
            _ => self.path_tracing.depth,
        }
    }

    /// Ambient occlusion rays actually used at this quality.
    pub fn effective_ao_rays(&self) -> u32 {
        match self.quality {
            Quality::Preview => 0,
            _ => self.ambient_occlusion.rays,
        }
    }

    /// Whether soft shadows may be computed at this quality.
    pub fn allows_soft_shadows(&self) -> bool {
        self.quality == Quality::Optimal
    }
}

/// Ray counts are accepted as signed numbers; negatives disable the feature.
pub(crate) fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = i64::deserialize(deserializer)?;
    if value < 0 {
        log::warn!("Negative ray count {} treated as 0", value);
    }
    Ok(value.clamp(0, u32::MAX as i64) as u32)
}
