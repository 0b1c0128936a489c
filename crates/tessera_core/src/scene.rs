//! Scene model consumed by the renderer.
//!
//! A scene owns a camera, named objects (shared mesh + shared material + transform),
//! named lights, a skybox and the material registry. Renders borrow it read-only.

use std::f64::consts::PI;
use std::sync::Arc;

use tessera_math::{Aabb, Color, DMat4Ext, DVec3, TextureUv};

use crate::camera::Camera;
use crate::light::Light;
use crate::material::{Material, MaterialManager, MaterialResult};
use crate::mesh::Mesh;
use crate::observer::Observer;
use crate::texture::Texture;
use crate::transform::Transform;

/// Flat sky colour used when no skybox texture is set.
pub const DEFAULT_SKYBOX_COLOR: Color = Color::new(0.65, 0.65, 0.9);

/// Equirectangular lookup coordinates for a unit direction.
pub fn direction_to_uv(direction: DVec3) -> TextureUv {
    TextureUv::new(
        0.5 + direction.z.atan2(direction.x) / (2.0 * PI),
        0.5 - direction.y.clamp(-1.0, 1.0).asin() / PI,
    )
}

/// Environment seen by rays that leave the scene.
#[derive(Debug, Clone)]
pub struct Skybox {
    texture: Arc<Texture>,
}

impl Skybox {
    pub fn new(texture: Arc<Texture>) -> Self {
        Self { texture }
    }

    /// A constant-colour sky.
    pub fn flat(color: Color) -> Self {
        Self::new(Arc::new(Texture::solid_color(color)))
    }

    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    /// Radiance arriving from `direction`.
    pub fn color(&self, direction: DVec3) -> Color {
        self.texture.value_3d(direction_to_uv(direction))
    }
}

impl Default for Skybox {
    fn default() -> Self {
        Self::flat(DEFAULT_SKYBOX_COLOR)
    }
}

/// A renderable object: geometry, material and placement.
#[derive(Debug)]
pub struct Object3D {
    name: String,
    mesh: Arc<Mesh>,
    material: Arc<Material>,
    transform: Transform,
    world_bounds: Aabb,
    transform_changed: Observer<Aabb>,
}

impl Clone for Object3D {
    /// Observers stay with the original.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            mesh: Arc::clone(&self.mesh),
            material: Arc::clone(&self.material),
            transform: self.transform.clone(),
            world_bounds: self.world_bounds,
            transform_changed: Observer::new(),
        }
    }
}

impl Object3D {
    pub fn new(name: impl Into<String>, mesh: impl Into<Arc<Mesh>>, material: Arc<Material>) -> Self {
        let mesh = mesh.into();
        let transform = Transform::default();
        let world_bounds = transform.matrix().transform_aabb(&mesh.bounds());
        Self {
            name: name.into(),
            mesh,
            material,
            transform,
            world_bounds,
            transform_changed: Observer::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.set_transform(transform);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World-space bounds of the transformed mesh.
    pub fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = material;
    }

    /// Replace the mesh. The new mesh's BVH, if any, is used as is.
    pub fn set_mesh(&mut self, mesh: Arc<Mesh>) {
        self.mesh = mesh;
        self.refresh_bounds();
    }

    /// Take the placement of `transform`. Subscribers of the current transform are kept.
    pub fn set_transform(&mut self, transform: Transform) {
        self.update_transform(|t| t.set_from(&transform));
    }

    /// Edit the transform in place. Observers of the transform and of
    /// [`Object3D::on_transform_changed`] run once, after the world bounds are refreshed.
    pub fn update_transform<F: FnOnce(&mut Transform)>(&mut self, edit: F) {
        let changed = self.transform.edit_quietly(edit);
        self.refresh_bounds();
        if changed {
            self.transform.notify_changed();
            self.transform_changed.notify(&self.world_bounds);
        }
    }

    /// Fired with the new world bounds whenever the transform changes.
    pub fn on_transform_changed(&mut self) -> &mut Observer<Aabb> {
        &mut self.transform_changed
    }

    fn refresh_bounds(&mut self) {
        self.world_bounds = self.transform.matrix().transform_aabb(&self.mesh.bounds());
    }
}

/// Everything a render needs.
#[derive(Debug, Default)]
pub struct Scene {
    camera: Camera,
    objects: Vec<Object3D>,
    lights: Vec<Light>,
    skybox: Skybox,
    materials: MaterialManager,
    lights_changed: Observer<String>,
    object_material_changed: Observer<String>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn skybox(&self) -> &Skybox {
        &self.skybox
    }

    pub fn set_skybox(&mut self, skybox: Skybox) {
        self.skybox = skybox;
    }

    pub fn objects(&self) -> &[Object3D] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&Object3D> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut Object3D> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    /// Add an object, renaming it `name_1`, `name_2`, ... if the name is taken.
    /// Returns the name it was stored under.
    pub fn add_object(&mut self, mut object: Object3D) -> String {
        object.name = unique_name(&object.name, |n| self.object(n).is_some());
        let name = object.name.clone();
        self.objects.push(object);
        name
    }

    pub fn remove_object(&mut self, name: &str) -> Option<Object3D> {
        let index = self.objects.iter().position(|o| o.name == name)?;
        Some(self.objects.remove(index))
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn light(&self, name: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.name == name)
    }

    /// Add a light, renaming it on collision. Returns the stored name.
    pub fn add_light(&mut self, mut light: Light) -> String {
        light.name = unique_name(&light.name, |n| self.light(n).is_some());
        let name = light.name.clone();
        self.lights.push(light);
        self.lights_changed.notify(&name);
        name
    }

    /// Edit a light in place and notify observers. Returns false if it does not exist.
    pub fn update_light<F: FnOnce(&mut Light)>(&mut self, name: &str, edit: F) -> bool {
        let Some(light) = self.lights.iter_mut().find(|l| l.name == name) else {
            return false;
        };
        edit(light);
        let name = light.name.clone();
        self.lights_changed.notify(&name);
        true
    }

    pub fn remove_light(&mut self, name: &str) -> Option<Light> {
        let index = self.lights.iter().position(|l| l.name == name)?;
        let light = self.lights.remove(index);
        self.lights_changed.notify(&light.name);
        Some(light)
    }

    pub fn on_lights_changed(&mut self) -> &mut Observer<String> {
        &mut self.lights_changed
    }

    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialManager {
        &mut self.materials
    }

    /// Fired with the object name when an object is rebound to an edited material.
    pub fn on_object_material_changed(&mut self) -> &mut Observer<String> {
        &mut self.object_material_changed
    }

    /// Edit a registered material and rebind every object that was using it.
    /// The manager's change observer fires first, then one object notification per
    /// rebound object. Returns the number of objects rebound.
    pub fn edit_material<F>(&mut self, name: &str, edit: F) -> MaterialResult<usize>
    where
        F: FnOnce(&mut Material),
    {
        let (old, new) = self.materials.update(name, edit)?;
        let mut rebound = 0;
        for object in self.objects.iter_mut().filter(|o| Arc::ptr_eq(&o.material, &old)) {
            object.material = Arc::clone(&new);
            self.object_material_changed.notify(&object.name);
            rebound += 1;
        }
        Ok(rebound)
    }

    /// Build BVHs for every mesh that lacks one. Objects sharing a mesh keep sharing
    /// the rebuilt copy.
    pub fn build_acceleration_structures(&mut self) {
        let mut built: Vec<(*const Mesh, Arc<Mesh>)> = Vec::new();
        for object in &mut self.objects {
            if object.mesh.has_bvh() {
                continue;
            }
            let key = Arc::as_ptr(&object.mesh);
            let mesh = match built.iter().find(|(ptr, _)| *ptr == key) {
                Some((_, mesh)) => Arc::clone(mesh),
                None => {
                    let mut mesh = Mesh::clone(&object.mesh);
                    mesh.build_bvh();
                    let mesh = Arc::new(mesh);
                    built.push((key, Arc::clone(&mesh)));
                    mesh
                }
            };
            object.mesh = mesh;
        }
        log::debug!("Built {} BVH(s) for {} object(s)", built.len(), self.objects.len());
    }

    /// Union of every object's world bounds.
    pub fn world_bounds(&self) -> Aabb {
        self.objects
            .iter()
            .fold(Aabb::EMPTY, |acc, o| Aabb::union(&acc, &o.world_bounds))
    }

    pub fn total_triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.mesh.triangle_count()).sum()
    }
}

fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|i| format!("{base}_{i}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
