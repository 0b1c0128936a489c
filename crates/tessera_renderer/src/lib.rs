//! Tessera renderer: offline CPU path tracing of a [`tessera_core::Scene`].
//!
//! A frame is split into chunks, one pass per sub-pixel sample. Workers trace the
//! chunks into private thread buffers that are summed into the [`Framebuffer`] once
//! every chunk is done.
//!
//! ```no_run
//! use tessera_core::Scene;
//! use tessera_renderer::{RenderSettings, Renderer, RenderStatus};
//!
//! let scene = Scene::new();
//! let mut renderer = Renderer::new(RenderSettings::default().with_samples_per_pixel(16));
//! if renderer.render_frame(&scene)? == RenderStatus::Completed {
//!     renderer.framebuffer_mut().convert_to_srgb_color_space();
//! }
//! # Ok::<(), tessera_renderer::RenderError>(())
//! ```

pub mod brdf;
pub mod camera;
pub mod chunk;
pub mod framebuffer;
pub mod intersect;
pub mod path_tracer;
pub mod render_time;
mod renderer;
pub mod sampling;
pub mod settings;
pub mod strategy;

pub use brdf::{Brdf, BrdfSample};
pub use camera::{CameraRayEmitter, RayEmitterParameters};
pub use chunk::{generate_chunks, Chunk, DEFAULT_CHUNK_SIZE};
pub use framebuffer::{Framebuffer, FramebufferProperties, PixelCoord, PixelSink, ThreadBuffer, WorkerContext};
pub use intersect::{intersect_scene, is_occluded, object_name_from_hit, HitRecord};
pub use path_tracer::PathTracer;
pub use render_time::{RenderStats, RenderTime};
pub use renderer::{RenderError, RenderResult, RenderStatus, Renderer};
pub use settings::{RenderMode, RenderSettings, RenderSettingsConfig, SettingsError, SettingsResult};
pub use strategy::{FrameContext, MultiThreadedCpu, RenderControl, RenderStrategy, SingleThreaded, StopHandle};
