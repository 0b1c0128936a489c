//! PBR materials and the named material registry.
//!
//! A material is a bundle of textures and scalar parameters sampled by UV at a
//! hit point. Materials are shared between objects through `Arc`; edits go through
//! [`MaterialManager::update`], which swaps in a modified copy.

use std::collections::BTreeMap;
use std::sync::Arc;

use tessera_math::{Color, DMat3, DVec3, TextureUv};
use thiserror::Error;

use crate::observer::Observer;
use crate::texture::Texture;

/// Name of the material every manager starts with.
pub const DEFAULT_MATERIAL_NAME: &str = "Default";

/// Errors from [`MaterialManager`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaterialError {
    #[error("Material not found: {0}")]
    NotFound(String),

    #[error("Material name already in use: {0}")]
    NameTaken(String),

    #[error("The default material cannot be removed or renamed")]
    DefaultMaterial,
}

pub type MaterialResult<T> = Result<T, MaterialError>;

/// A PBR material. Each channel is either a constant or a texture.
#[derive(Clone, Debug)]
pub struct Material {
    name: String,
    diffuse: Arc<Texture>,
    normal_map: Option<Arc<Texture>>,
    roughness: f64,
    roughness_texture: Option<Arc<Texture>>,
    metallic: f64,
    metallic_texture: Option<Arc<Texture>>,
    emissive: Arc<Texture>,
    emissive_intensity: f64,
    transmission: f64,
    transmission_texture: Option<Arc<Texture>>,
    ior: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: DEFAULT_MATERIAL_NAME.to_string(),
            diffuse: Arc::new(Texture::solid_color(Color::splat(0.8))),
            normal_map: None,
            roughness: 0.5,
            roughness_texture: None,
            metallic: 0.0,
            metallic_texture: None,
            emissive: Arc::new(Texture::solid_color(Color::ZERO)),
            emissive_intensity: 0.0,
            transmission: 0.0,
            transmission_texture: None,
            ior: 1.5,
        }
    }
}

impl Material {
    /// Diffuse material with a constant base colour.
    pub fn new(name: impl Into<String>, diffuse: Color) -> Self {
        Self {
            name: name.into(),
            diffuse: Arc::new(Texture::solid_color(diffuse)),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_diffuse_texture(mut self, texture: Arc<Texture>) -> Self {
        self.diffuse = texture;
        self
    }

    pub fn with_normal_map(mut self, texture: Arc<Texture>) -> Self {
        self.normal_map = Some(texture);
        self
    }

    pub fn with_roughness(mut self, roughness: f64) -> Self {
        self.set_roughness(roughness);
        self
    }

    pub fn with_roughness_texture(mut self, texture: Arc<Texture>) -> Self {
        self.roughness_texture = Some(texture);
        self
    }

    pub fn with_metallic(mut self, metallic: f64) -> Self {
        self.set_metallic(metallic);
        self
    }

    pub fn with_metallic_texture(mut self, texture: Arc<Texture>) -> Self {
        self.metallic_texture = Some(texture);
        self
    }

    pub fn with_emission(mut self, color: Color, intensity: f64) -> Self {
        self.emissive = Arc::new(Texture::solid_color(color));
        self.set_emissive_intensity(intensity);
        self
    }

    pub fn with_emissive_texture(mut self, texture: Arc<Texture>, intensity: f64) -> Self {
        self.emissive = texture;
        self.set_emissive_intensity(intensity);
        self
    }

    pub fn with_transmission(mut self, transmission: f64) -> Self {
        self.set_transmission(transmission);
        self
    }

    pub fn with_transmission_texture(mut self, texture: Arc<Texture>) -> Self {
        self.transmission_texture = Some(texture);
        self
    }

    pub fn with_ior(mut self, ior: f64) -> Self {
        self.set_ior(ior);
        self
    }

    pub fn set_diffuse_color(&mut self, color: Color) {
        self.diffuse = Arc::new(Texture::solid_color(color));
    }

    pub fn set_roughness(&mut self, roughness: f64) {
        self.roughness = roughness.clamp(0.0, 1.0);
    }

    pub fn set_metallic(&mut self, metallic: f64) {
        self.metallic = metallic.clamp(0.0, 1.0);
    }

    pub fn set_transmission(&mut self, transmission: f64) {
        self.transmission = transmission.clamp(0.0, 1.0);
    }

    pub fn set_emissive_intensity(&mut self, intensity: f64) {
        self.emissive_intensity = intensity.clamp(0.0, 10_000.0);
    }

    pub fn set_ior(&mut self, ior: f64) {
        self.ior = ior.clamp(1.0, 3.0);
    }

    /// Turn texture lookups off for the scalar channels again.
    pub fn clear_scalar_textures(&mut self) {
        self.roughness_texture = None;
        self.metallic_texture = None;
        self.transmission_texture = None;
    }

    pub fn diffuse(&self, uv: TextureUv) -> Color {
        self.diffuse.value_3d(uv)
    }

    pub fn roughness(&self, uv: TextureUv) -> f64 {
        Self::scalar(self.roughness, &self.roughness_texture, uv)
    }

    pub fn metallic(&self, uv: TextureUv) -> f64 {
        Self::scalar(self.metallic, &self.metallic_texture, uv)
    }

    pub fn transmission(&self, uv: TextureUv) -> f64 {
        Self::scalar(self.transmission, &self.transmission_texture, uv)
    }

    /// Emitted radiance: emissive texture scaled by intensity.
    pub fn emission(&self, uv: TextureUv) -> Color {
        if self.emissive_intensity <= 0.0 {
            return Color::ZERO;
        }
        self.emissive.value_3d(uv) * self.emissive_intensity
    }

    pub fn ior(&self) -> f64 {
        self.ior
    }

    pub fn has_normal_map(&self) -> bool {
        self.normal_map.is_some()
    }

    /// Perturb `normal` with the tangent-space normal map, if any.
    ///
    /// The map stores `(n + 1) / 2`, so a flat `(0.5, 0.5, 1)` texel leaves the normal
    /// unchanged.
    pub fn apply_normal_map(
        &self,
        normal: DVec3,
        tangent: DVec3,
        bitangent: DVec3,
        uv: TextureUv,
    ) -> DVec3 {
        let Some(map) = &self.normal_map else {
            return normal;
        };
        let tangent_space = map.value_3d(uv) * 2.0 - DVec3::ONE;
        let tbn = DMat3::from_cols(tangent, bitangent, normal);
        (tbn * tangent_space).try_normalize().unwrap_or(normal)
    }

    fn scalar(value: f64, texture: &Option<Arc<Texture>>, uv: TextureUv) -> f64 {
        match texture {
            Some(texture) => texture.value_1d(uv),
            None => value,
        }
    }
}

/// Named registry of shared materials.
///
/// The default material is always present and cannot be removed or renamed.
#[derive(Debug)]
pub struct MaterialManager {
    default_material: Arc<Material>,
    materials: BTreeMap<String, Arc<Material>>,
    added: Observer<String>,
    removed: Observer<String>,
    renamed: Observer<(String, String)>,
    changed: Observer<String>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            default_material: Arc::new(Material::default()),
            materials: BTreeMap::new(),
            added: Observer::new(),
            removed: Observer::new(),
            renamed: Observer::new(),
            changed: Observer::new(),
        }
    }

    pub fn default_material(&self) -> Arc<Material> {
        Arc::clone(&self.default_material)
    }

    /// Register a material. Its name is made unique first; the stored copy is returned.
    pub fn add(&mut self, mut material: Material) -> Arc<Material> {
        material.name = self.available_name(&material.name);
        let name = material.name.clone();
        let material = Arc::new(material);
        self.materials.insert(name.clone(), Arc::clone(&material));
        log::debug!("Added material '{name}'");
        self.added.notify(&name);
        material
    }

    pub fn get(&self, name: &str) -> Option<Arc<Material>> {
        if name == DEFAULT_MATERIAL_NAME {
            return Some(self.default_material());
        }
        self.materials.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        name == DEFAULT_MATERIAL_NAME || self.materials.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> MaterialResult<Arc<Material>> {
        if name == DEFAULT_MATERIAL_NAME {
            return Err(MaterialError::DefaultMaterial);
        }
        let material = self
            .materials
            .remove(name)
            .ok_or_else(|| MaterialError::NotFound(name.to_string()))?;
        self.removed.notify(&name.to_string());
        Ok(material)
    }

    /// Rename a material. Objects holding the old `Arc` are unaffected.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> MaterialResult<Arc<Material>> {
        if old_name == DEFAULT_MATERIAL_NAME {
            return Err(MaterialError::DefaultMaterial);
        }
        if old_name == new_name {
            return self
                .get(old_name)
                .ok_or_else(|| MaterialError::NotFound(old_name.to_string()));
        }
        if self.contains(new_name) {
            return Err(MaterialError::NameTaken(new_name.to_string()));
        }
        let existing = self
            .materials
            .remove(old_name)
            .ok_or_else(|| MaterialError::NotFound(old_name.to_string()))?;

        let mut material = Material::clone(&existing);
        material.name = new_name.to_string();
        let material = Arc::new(material);
        self.materials.insert(new_name.to_string(), Arc::clone(&material));
        self.renamed
            .notify(&(old_name.to_string(), new_name.to_string()));
        Ok(material)
    }

    /// Edit a material by swapping in a modified copy. Returns `(old, new)` so callers
    /// can rebind whatever still holds the old `Arc`.
    pub fn update<F>(&mut self, name: &str, edit: F) -> MaterialResult<(Arc<Material>, Arc<Material>)>
    where
        F: FnOnce(&mut Material),
    {
        let old = self
            .get(name)
            .ok_or_else(|| MaterialError::NotFound(name.to_string()))?;
        let mut material = Material::clone(&old);
        edit(&mut material);
        material.name = name.to_string();
        let new = Arc::new(material);

        if name == DEFAULT_MATERIAL_NAME {
            self.default_material = Arc::clone(&new);
        } else {
            self.materials.insert(name.to_string(), Arc::clone(&new));
        }
        self.changed.notify(&name.to_string());
        Ok((old, new))
    }

    /// `base` if free, otherwise `base_1`, `base_2`, ... whichever is first free.
    pub fn available_name(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}_{i}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// All names, default first.
    pub fn names(&self) -> Vec<String> {
        std::iter::once(DEFAULT_MATERIAL_NAME.to_string())
            .chain(self.materials.keys().cloned())
            .collect()
    }

    /// Number of materials including the default.
    pub fn len(&self) -> usize {
        self.materials.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn on_added(&mut self) -> &mut Observer<String> {
        &mut self.added
    }

    pub fn on_removed(&mut self) -> &mut Observer<String> {
        &mut self.removed
    }

    pub fn on_renamed(&mut self) -> &mut Observer<(String, String)> {
        &mut self.renamed
    }

    /// Fired with the material name after [`MaterialManager::update`] swaps in the edit.
    pub fn on_changed(&mut self) -> &mut Observer<String> {
        &mut self.changed
    }
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::ColorSpace;
    use std::sync::Mutex;

    #[test]
    fn test_scalar_channels_prefer_texture() {
        let uv = TextureUv::new(0.5, 0.5);
        let material = Material::new("m", Color::ONE).with_roughness(0.3);
        assert_eq!(material.roughness(uv), 0.3);

        let material = material.with_roughness_texture(Arc::new(Texture::solid_value(0.9)));
        assert_eq!(material.roughness(uv), 0.9);
    }

    #[test]
    fn test_setters_clamp() {
        let material = Material::default()
            .with_roughness(2.0)
            .with_metallic(-1.0)
            .with_transmission(7.0)
            .with_ior(0.5);
        let uv = TextureUv::ZERO;
        assert_eq!(material.roughness(uv), 1.0);
        assert_eq!(material.metallic(uv), 0.0);
        assert_eq!(material.transmission(uv), 1.0);
        assert_eq!(material.ior(), 1.0);
    }

    #[test]
    fn test_emission_scales_with_intensity() {
        let uv = TextureUv::ZERO;
        assert_eq!(Material::default().emission(uv), Color::ZERO);
        let lamp = Material::default().with_emission(Color::new(1.0, 0.5, 0.0), 4.0);
        assert_eq!(lamp.emission(uv), Color::new(4.0, 2.0, 0.0));
    }

    #[test]
    fn test_flat_normal_map_keeps_normal() {
        let flat = Texture::from_pixels(1, 1, 3, vec![0.5, 0.5, 1.0], ColorSpace::Linear).unwrap();
        let material = Material::default().with_normal_map(Arc::new(flat));
        let n = material.apply_normal_map(DVec3::Y, DVec3::X, DVec3::NEG_Z, TextureUv::ZERO);
        assert!((n - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_normal_map_tilts_toward_tangent() {
        let tilted = Texture::from_pixels(1, 1, 3, vec![1.0, 0.5, 0.5], ColorSpace::Linear).unwrap();
        let material = Material::default().with_normal_map(Arc::new(tilted));
        let n = material.apply_normal_map(DVec3::Z, DVec3::X, DVec3::Y, TextureUv::ZERO);
        assert!((n - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_manager_unique_names() {
        let mut manager = MaterialManager::new();
        let a = manager.add(Material::new("Red", Color::X));
        let b = manager.add(Material::new("Red", Color::X));
        let c = manager.add(Material::new("Red", Color::X));
        let d = manager.add(Material::new(DEFAULT_MATERIAL_NAME, Color::X));

        assert_eq!(a.name(), "Red");
        assert_eq!(b.name(), "Red_1");
        assert_eq!(c.name(), "Red_2");
        assert_eq!(d.name(), "Default_1");
        assert_eq!(manager.len(), 5);
        assert_eq!(manager.names()[0], DEFAULT_MATERIAL_NAME);
    }

    #[test]
    fn test_manager_rename_and_remove() {
        let mut manager = MaterialManager::new();
        manager.add(Material::new("Red", Color::X));
        manager.add(Material::new("Blue", Color::Z));

        assert_eq!(
            manager.rename("Red", "Blue").unwrap_err(),
            MaterialError::NameTaken("Blue".to_string())
        );
        let renamed = manager.rename("Red", "Crimson").unwrap();
        assert_eq!(renamed.name(), "Crimson");
        assert!(manager.get("Red").is_none());

        assert!(manager.remove("Crimson").is_ok());
        assert_eq!(
            manager.remove("Crimson").unwrap_err(),
            MaterialError::NotFound("Crimson".to_string())
        );
        assert_eq!(manager.remove(DEFAULT_MATERIAL_NAME).unwrap_err(), MaterialError::DefaultMaterial);
    }

    #[test]
    fn test_manager_observers() {
        let mut manager = MaterialManager::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let added = Arc::clone(&log);
        manager.on_added().add(move |name: &String| added.lock().unwrap().push(format!("+{name}")));
        let removed = Arc::clone(&log);
        manager.on_removed().add(move |name: &String| removed.lock().unwrap().push(format!("-{name}")));
        let renamed = Arc::clone(&log);
        manager
            .on_renamed()
            .add(move |(a, b): &(String, String)| renamed.lock().unwrap().push(format!("{a}>{b}")));

        let changed = Arc::clone(&log);
        manager.on_changed().add(move |name: &String| changed.lock().unwrap().push(format!("*{name}")));

        manager.add(Material::new("A", Color::ONE));
        manager.update("A", |m| m.set_roughness(0.9)).unwrap();
        manager.rename("A", "B").unwrap();
        manager.remove("B").unwrap();
        assert!(manager.update("B", |m| m.set_roughness(0.1)).is_err());

        assert_eq!(*log.lock().unwrap(), vec!["+A", "*A", "A>B", "-B"]);
    }

    #[test]
    fn test_manager_update_swaps_copy() {
        let mut manager = MaterialManager::new();
        let original = manager.add(Material::new("Gold", Color::new(1.0, 0.8, 0.3)));

        let (old, new) = manager.update("Gold", |m| m.set_metallic(1.0)).unwrap();
        assert!(Arc::ptr_eq(&old, &original));
        assert_eq!(original.metallic(TextureUv::ZERO), 0.0);
        assert_eq!(new.metallic(TextureUv::ZERO), 1.0);
        assert!(Arc::ptr_eq(&manager.get("Gold").unwrap(), &new));

        let (_, default) = manager.update(DEFAULT_MATERIAL_NAME, |m| m.set_roughness(0.1)).unwrap();
        assert!(Arc::ptr_eq(&manager.default_material(), &default));
    }
}
