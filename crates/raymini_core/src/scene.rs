//! Scene model: objects, lights and the optional skybox.
//!
//! A scene is owned by the caller. Renders borrow it immutably for the
//! duration of a frame; mobile objects are moved only between frames.

use std::sync::Arc;

use raymini_math::{Ray, Vec3};

use crate::{Light, Material, SkyBox};

/// Ray intersection against one static mesh in its local frame.
///
/// Implementations record the closest hit on the ray (`Ray::record`) and
/// return whether one was found. They must accept any origin/direction.
pub trait SpatialIndex: Send + Sync {
    fn intersect(&self, ray: &mut Ray) -> bool;
}

/// A placed mesh: spatial index, material and translation.
#[derive(Clone)]
pub struct Object {
    pub name: String,
    index: Arc<dyn SpatialIndex>,
    material: Arc<dyn Material>,
    /// Current translation of the local frame
    pub trans: Vec3,
    /// Translation restored by `Scene::reset`
    initial_trans: Vec3,
    /// Displacement applied between animation frames
    pub motion: Vec3,
    pub enabled: bool,
}

impl Object {
    pub fn new(
        name: impl Into<String>,
        index: Arc<dyn SpatialIndex>,
        material: Arc<dyn Material>,
        trans: Vec3,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            material,
            trans,
            initial_trans: trans,
            motion: Vec3::ZERO,
            enabled: true,
        }
    }

    /// Make the object move by `motion` between frames.
    pub fn with_motion(mut self, motion: Vec3) -> Self {
        self.motion = motion;
        self
    }

    pub fn index(&self) -> &dyn SpatialIndex {
        self.index.as_ref()
    }

    pub fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }

    pub fn is_mobile(&self) -> bool {
        self.motion != Vec3::ZERO
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("trans", &self.trans)
            .field("motion", &self.motion)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// A complete scene.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub objects: Vec<Object>,
    pub lights: Vec<Light>,
    /// Background environment, used instead of the flat background color
    pub skybox: Option<Arc<SkyBox>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its index.
    pub fn add_object(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn with_skybox(mut self, skybox: SkyBox) -> Self {
        self.skybox = Some(Arc::new(skybox));
        self
    }

    pub fn enabled_objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter().filter(|o| o.enabled)
    }

    pub fn enabled_lights(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter().filter(|l| l.enabled)
    }

    /// Whether any object moves between frames.
    pub fn has_mobile(&self) -> bool {
        self.objects.iter().any(Object::is_mobile)
    }

    /// Advance every mobile object by one step.
    pub fn advance_mobile(&mut self) {
        for object in self.objects.iter_mut().filter(|o| o.is_mobile()) {
            object.trans += object.motion;
        }
    }

    /// Restore every object to its initial translation.
    pub fn reset(&mut self) {
        for object in &mut self.objects {
            object.trans = object.initial_trans;
        }
    }
}
