//! Light sources.

use raymini_math::Vec3;

use crate::Color;

/// A disk light.
///
/// With hard shadows only `position` matters; soft shadows sample the disk
/// described by `normal` and `radius`. Path tracing also builds point lights
/// (radius 0) at bounce positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub position: Vec3,
    /// Orientation of the disk
    pub normal: Vec3,
    /// Disk radius, 0 for a point light
    pub radius: f32,
    pub color: Color,
    pub intensity: f32,
    pub enabled: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::NEG_Y,
            radius: 0.0,
            color: Color::ONE,
            intensity: 1.0,
            enabled: true,
        }
    }
}

impl Light {
    /// White disk light.
    pub fn new(position: Vec3, normal: Vec3, radius: f32, intensity: f32) -> Self {
        Self {
            position,
            normal,
            radius: radius.max(0.0),
            intensity,
            ..Default::default()
        }
    }

    /// Colored point light.
    pub fn point(position: Vec3, color: Color, intensity: f32) -> Self {
        Self {
            position,
            color,
            intensity,
            ..Default::default()
        }
    }

    /// Same light with its intensity scaled by `visibility`.
    pub fn attenuated(&self, visibility: f32) -> Self {
        Self {
            intensity: self.intensity * visibility,
            ..self.clone()
        }
    }

    /// Radiance reaching a surface before the cosine term.
    #[inline]
    pub fn radiance(&self) -> Color {
        self.color * self.intensity
    }
}
