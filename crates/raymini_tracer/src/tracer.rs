//! Per-pass tracing context.
//!
//! A `Tracer` borrows the configuration and the scene for one render pass
//! and answers every ray query of that pass: nearest hit, shaded color,
//! path-traced bounce lights and ambient occlusion. It holds no mutable
//! state, so workers share it freely.

use raymini_core::{Brdf, Color, Light, Object, Scene};
use raymini_math::{Ray, Vec3, Vertex};
use rand::RngCore;

use crate::sampling::cone_directions;
use crate::RenderConfig;

/// Hits closer than this to the ray origin are self-intersections.
///
/// Large enough to absorb f32 rounding of hit points on unit-scale meshes.
pub const DISTANCE_MIN_INTERSECT: f32 = 1e-4;

/// Nearest intersection of a world-space ray.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    /// Distance from the query origin
    pub distance: f32,
    /// Hit point and normal in world space
    pub vertex: Vertex,
    pub object: &'a Object,
}

/// Read-only view of the scene and configuration for one pass.
#[derive(Debug, Clone, Copy)]
pub struct Tracer<'a> {
    config: &'a RenderConfig,
    scene: &'a Scene,
}

impl<'a> Tracer<'a> {
    pub fn new(config: &'a RenderConfig, scene: &'a Scene) -> Self {
        Self { config, scene }
    }

    pub fn config(&self) -> &'a RenderConfig {
        self.config
    }

    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    /// Nearest hit of the ray `origin + t * direction` over enabled objects.
    ///
    /// With `stop_at_first` the first object hit ends the search; the
    /// returned hit is then valid but not necessarily the nearest.
    pub fn intersect(&self, direction: Vec3, origin: Vec3, stop_at_first: bool) -> Option<Hit<'a>> {
        self.intersect_within(direction, origin, f32::INFINITY, stop_at_first)
    }

    /// Like `intersect`, ignoring hits at or beyond `max_distance`.
    pub fn intersect_within(
        &self,
        direction: Vec3,
        origin: Vec3,
        max_distance: f32,
        stop_at_first: bool,
    ) -> Option<Hit<'a>> {
        let start = origin + DISTANCE_MIN_INTERSECT * direction;
        let mut closest = max_distance;
        let mut nearest: Option<(Ray, &'a Object)> = None;

        for object in self.scene.enabled_objects() {
            // Query in the object's local frame
            let mut ray = Ray::new(start - object.trans, direction);
            if !object.index().intersect(&mut ray) {
                continue;
            }

            let distance = ray.distance();
            if distance > DISTANCE_MIN_INTERSECT && distance < closest {
                closest = distance;
                nearest = Some((ray, object));
                if stop_at_first {
                    break;
                }
            }
        }

        let (mut ray, object) = nearest?;
        ray.translate(object.trans);
        let hit = ray.intersection().copied()?;
        Some(Hit {
            distance: hit.distance,
            vertex: hit.vertex,
            object,
        })
    }

    /// Color seen along a primary ray.
    pub fn get_color(&self, direction: Vec3, origin: Vec3, rng: &mut dyn RngCore) -> Color {
        self.color_at(direction, origin, 0, self.primary_brdf(), rng).0
    }

    /// Color seen along a ray without any indirect lighting.
    pub fn direct_color(&self, direction: Vec3, origin: Vec3, rng: &mut dyn RngCore) -> Color {
        let depth = self.config.effective_depth();
        self.color_at(direction, origin, depth, self.primary_brdf(), rng).0
    }

    fn primary_brdf(&self) -> Brdf {
        if self.config.ambient_occlusion.only {
            Brdf::Ambient
        } else {
            Brdf::All
        }
    }

    /// Shade the nearest hit along a ray, `depth` bounces deep.
    ///
    /// Also returns the hit so a bounce can become a light.
    fn color_at(
        &self,
        direction: Vec3,
        origin: Vec3,
        depth: u32,
        brdf: Brdf,
        rng: &mut dyn RngCore,
    ) -> (Color, Option<Hit<'a>>) {
        let Some(hit) = self.intersect(direction, origin, false) else {
            return (self.background(direction), None);
        };

        let material = hit.object.material();
        let lights = self.lights(&hit.vertex, rng);
        let ambient = if brdf.has_ambient() {
            self.ambient_occlusion(&hit.vertex, rng)
        } else {
            0.0
        };
        let mut color = material.gen_color(origin, &hit.vertex, &lights, brdf, ambient);

        if depth < self.config.effective_depth() {
            let bounce_lights = self.path_traced_lights(&hit.vertex, depth, rng);
            let indirect = material.gen_color(origin, &hit.vertex, &bounce_lights, Brdf::Diffuse, 0.0);
            if self.config.path_tracing.only && depth == 0 {
                color = indirect;
            } else {
                color += indirect;
            }
        }

        (color, Some(hit))
    }

    /// Color of a ray that leaves the scene.
    pub fn background(&self, direction: Vec3) -> Color {
        match &self.scene.skybox {
            Some(skybox) => skybox.sample(direction),
            None => self.config.background,
        }
    }

    /// Enabled lights attenuated by their visibility from `vertex`.
    pub fn lights(&self, vertex: &Vertex, rng: &mut dyn RngCore) -> Vec<Light> {
        let shadow = &self.config.shadow;
        self.scene
            .enabled_lights()
            .map(|light| light.attenuated(shadow.visibility(self, vertex.position, light, rng)))
            .collect()
    }

    /// One point light per bounce ray that hits something, colored by what
    /// that ray sees one level deeper.
    ///
    /// Intensity falls off with the cube of `1 + distance` and is split
    /// evenly over the bounce rays.
    pub fn path_traced_lights(&self, vertex: &Vertex, depth: u32, rng: &mut dyn RngCore) -> Vec<Light> {
        let pt = &self.config.path_tracing;
        let directions = cone_directions(vertex.normal, pt.max_angle, pt.rays, rng);
        let share = pt.intensity / directions.len().max(1) as f32;

        let mut lights = Vec::with_capacity(directions.len());
        for direction in directions {
            let (color, hit) = self.color_at(direction, vertex.position, depth + 1, Brdf::Diffuse, rng);
            if let Some(hit) = hit {
                let falloff = (1.0 + hit.distance).powi(3);
                lights.push(Light::point(hit.vertex.position, color, share / falloff));
            }
        }
        lights
    }

    /// Ambient intensity at `vertex`, reduced by nearby occluders.
    ///
    /// Without occlusion rays this is the configured intensity unchanged.
    pub fn ambient_occlusion(&self, vertex: &Vertex, rng: &mut dyn RngCore) -> f32 {
        let ao = &self.config.ambient_occlusion;
        let rays = self.config.effective_ao_rays();
        if rays == 0 {
            return ao.intensity;
        }

        let directions = cone_directions(vertex.normal, ao.max_angle, rays, rng);
        if directions.is_empty() {
            return ao.intensity;
        }

        let occluded = directions
            .iter()
            .filter(|&&dir| {
                self.intersect_within(dir, vertex.position, ao.radius, true)
                    .is_some()
            })
            .count();
        ao.intensity * (1.0 - occluded as f32 / directions.len() as f32)
    }
}
