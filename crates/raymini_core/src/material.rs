//! Material capability and the built-in surface kinds.

use raymini_math::{Vec3, Vec3Ext, Vertex};

use crate::{Color, Light};

/// Which reflectance terms a shading call evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brdf {
    /// Ambient term only
    Ambient,
    /// Lambert term only (used for path-traced bounces)
    Diffuse,
    /// Ambient + diffuse + specular
    All,
}

impl Brdf {
    #[inline]
    pub fn has_ambient(self) -> bool {
        matches!(self, Brdf::Ambient | Brdf::All)
    }

    #[inline]
    pub fn has_diffuse(self) -> bool {
        matches!(self, Brdf::Diffuse | Brdf::All)
    }

    #[inline]
    pub fn has_specular(self) -> bool {
        self == Brdf::All
    }
}

/// Trait for materials that turn incoming light into a surface color.
///
/// Implementations must be deterministic for identical inputs and accept an
/// empty light list.
pub trait Material: Send + Sync {
    /// Color seen from `camera_pos` at `hit`.
    ///
    /// `lights` already carry shadow attenuation. `ambient` is the ambient
    /// light intensity at the point (ambient occlusion); it is only
    /// meaningful when `brdf` has an ambient term.
    fn gen_color(
        &self,
        camera_pos: Vec3,
        hit: &Vertex,
        lights: &[Light],
        brdf: Brdf,
        ambient: f32,
    ) -> Color;

    /// Whether shadow rays pass through surfaces of this material.
    fn is_transparent_for_shadow(&self) -> bool {
        false
    }
}

/// Phong surface: ambient, Lambert diffuse and Phong specular lobes.
#[derive(Debug, Clone, PartialEq)]
pub struct Phong {
    pub color: Color,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl Phong {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            diffuse: 1.0,
            specular: 0.5,
            shininess: 32.0,
        }
    }

    /// Matte surface without a specular lobe.
    pub fn matte(color: Color) -> Self {
        Self {
            specular: 0.0,
            ..Self::new(color)
        }
    }
}

impl Material for Phong {
    fn gen_color(
        &self,
        camera_pos: Vec3,
        hit: &Vertex,
        lights: &[Light],
        brdf: Brdf,
        ambient: f32,
    ) -> Color {
        let mut color = Color::ZERO;
        if brdf.has_ambient() {
            color += self.color * ambient;
        }
        if !brdf.has_diffuse() {
            return color;
        }

        let normal = hit.normal;
        let view = (camera_pos - hit.position).normalize_or_zero();

        for light in lights {
            let (to_light, distance) = (light.position - hit.position).normalize_with_length();
            if distance == 0.0 || light.intensity == 0.0 {
                continue;
            }
            let n_dot_l = normal.dot(to_light);
            if n_dot_l <= 0.0 {
                continue;
            }
            let radiance = light.radiance();
            color += self.color * radiance * (self.diffuse * n_dot_l);

            if brdf.has_specular() && self.specular > 0.0 {
                let reflected = reflect(-to_light, normal);
                let r_dot_v = reflected.dot(view).max(0.0);
                color += radiance * (self.specular * r_dot_v.powf(self.shininess));
            }
        }

        color
    }
}

/// Transparent surface.
///
/// Refraction is not simulated: glass shades as a faint, very shiny surface
/// and never blocks shadow rays.
#[derive(Debug, Clone, PartialEq)]
pub struct Glass {
    surface: Phong,
}

impl Glass {
    pub fn new(tint: Color) -> Self {
        Self {
            surface: Phong {
                color: tint,
                diffuse: 0.1,
                specular: 1.0,
                shininess: 128.0,
            },
        }
    }
}

impl Material for Glass {
    fn gen_color(
        &self,
        camera_pos: Vec3,
        hit: &Vertex,
        lights: &[Light],
        brdf: Brdf,
        ambient: f32,
    ) -> Color {
        self.surface
            .gen_color(camera_pos, hit, lights, brdf, ambient * 0.1)
    }

    fn is_transparent_for_shadow(&self) -> bool {
        true
    }
}

/// Faces of the skybox cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeSide {
    Top,
    Bottom,
    PosX,
    NegX,
    PosZ,
    NegZ,
}

impl CubeSide {
    /// Face hit by a ray leaving the cube center along `direction`.
    pub fn from_direction(direction: Vec3) -> Self {
        let a = direction.abs();
        if a.y >= a.x && a.y >= a.z {
            if direction.y >= 0.0 {
                CubeSide::Top
            } else {
                CubeSide::Bottom
            }
        } else if a.x >= a.z {
            if direction.x >= 0.0 {
                CubeSide::PosX
            } else {
                CubeSide::NegX
            }
        } else if direction.z >= 0.0 {
            CubeSide::PosZ
        } else {
            CubeSide::NegZ
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Background environment: one flat color per cube face.
///
/// Queried with the ray direction when nothing is hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyBox {
    faces: [Color; 6],
}

impl SkyBox {
    /// Faces in `CubeSide` order: top, bottom, +X, -X, +Z, -Z.
    pub fn new(faces: [Color; 6]) -> Self {
        Self { faces }
    }

    /// Sky on top, ground below, horizon on the sides.
    pub fn horizon(top: Color, horizon: Color, bottom: Color) -> Self {
        Self {
            faces: [top, bottom, horizon, horizon, horizon, horizon],
        }
    }

    pub fn face(&self, side: CubeSide) -> Color {
        self.faces[side.index()]
    }

    /// Color seen along `direction`.
    pub fn sample(&self, direction: Vec3) -> Color {
        self.face(CubeSide::from_direction(direction))
    }
}

/// Reflect a vector about a normal.
#[inline]
fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}
