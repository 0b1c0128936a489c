//! Tessera Core - scene model for the Tessera path tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` with an arena `Bvh`, plus procedural sphere/plane/cube builders
//! - **Appearance**: `Texture` sampling, PBR `Material`s and the `MaterialManager`
//! - **Scene**: `Camera`, `Light`, `Transform`, `Object3D`, `Skybox` and `Scene`
//! - **Notifications**: a small `Observer` registry used for change callbacks
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tessera_core::{Light, Mesh, Object3D, Scene};
//! use tessera_math::DVec3;
//!
//! let mut scene = Scene::new();
//! let material = scene.materials().default_material();
//! scene.add_object(Object3D::new("ball", Mesh::sphere(1.0, 32, 16), material));
//! scene.add_light(Light::directional("sun", DVec3::new(-1.0, -1.0, -1.0)));
//! scene.build_acceleration_structures();
//! ```

pub mod bvh;
pub mod camera;
pub mod light;
pub mod material;
pub mod mesh;
pub mod observer;
mod primitives;
pub mod scene;
pub mod texture;
pub mod transform;

// Re-export commonly used types
pub use bvh::{Bvh, BvhNode, BvhNodeKind, BVH_CONSTRUCTION_EPSILON, LEAF_MAX_SIZE};
pub use camera::Camera;
pub use light::{Light, LightKind};
pub use material::{Material, MaterialError, MaterialManager, MaterialResult, DEFAULT_MATERIAL_NAME};
pub use mesh::{Face, Mesh, Vertex};
pub use observer::{CallbackId, Observer};
pub use scene::{Object3D, Scene, Skybox, DEFAULT_SKYBOX_COLOR};
pub use texture::{ColorSpace, FilteringMode, Texture, TextureError, TextureResult, WrappingMode};
pub use transform::Transform;
