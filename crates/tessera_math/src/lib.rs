//! Tessera math: double precision geometry shared by the scene model and the path tracer.
//!
//! Re-exports glam so downstream crates use the same `DVec3`/`DMat4` types.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
pub mod color;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use color::{Color, ColorRgba};
pub use interval::Interval;
pub use ray::{Ray, RAY_EPSILON};
pub use transform::DMat4Ext;

/// 2D texture coordinate.
pub type TextureUv = DVec2;

/// Millimetres to metres.
pub const MM_TO_M: f64 = 0.001;
