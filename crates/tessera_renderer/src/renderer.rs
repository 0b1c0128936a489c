//! Renderer facade: settings, framebuffer and strategy selection for one frame.

use thiserror::Error;
use tessera_core::{Observer, Scene};

use crate::framebuffer::{Framebuffer, FramebufferProperties};
use crate::render_time::RenderStats;
use crate::settings::{RenderMode, RenderSettings};
use crate::strategy::{FrameContext, MultiThreadedCpu, RenderControl, RenderStrategy, SingleThreaded, StopHandle};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Render mode {0:?} is not supported by this build")]
    UnsupportedMode(RenderMode),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// How a frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Completed,
    Cancelled,
}

/// Owns the output image and renders scenes into it.
#[derive(Debug)]
pub struct Renderer {
    settings: RenderSettings,
    framebuffer: Framebuffer,
    control: RenderControl,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Self {
        let framebuffer = Framebuffer::new(framebuffer_properties(&settings));
        Self {
            settings,
            framebuffer,
            control: RenderControl::new(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Replace the settings. The framebuffer is resized on the next frame.
    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Handle that can stop a render from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.control.stop_handle()
    }

    pub fn request_stop(&self) {
        self.control.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.control.is_stop_requested()
    }

    pub fn on_progress(&mut self) -> &mut Observer<f64> {
        self.control.on_progress()
    }

    pub fn on_stats(&mut self) -> &mut Observer<RenderStats> {
        self.control.on_stats()
    }

    pub fn stats(&self) -> RenderStats {
        self.control.stats()
    }

    /// Render one frame of `scene` with the current settings.
    ///
    /// A stop requested before or during the frame yields [`RenderStatus::Cancelled`]
    /// and leaves the previous image in the framebuffer. The stop request is consumed
    /// either way, so the next call renders normally.
    pub fn render_frame(&mut self, scene: &Scene) -> RenderResult<RenderStatus> {
        let strategy: Box<dyn RenderStrategy> = match self.settings.render_mode() {
            RenderMode::SingleThreaded => Box::new(SingleThreaded),
            RenderMode::MultiThreadedCpu => Box::new(MultiThreadedCpu::from_settings(&self.settings)),
            mode @ RenderMode::GpuCuda => {
                log::error!("Render mode {:?} is not available", mode);
                return Err(RenderError::UnsupportedMode(mode));
            }
        };

        self.framebuffer.set_properties(framebuffer_properties(&self.settings));
        let frame = FrameContext::new(scene, &self.settings, &self.control);
        let completed = strategy.render(&frame, &mut self.framebuffer);
        self.control.clear_stop();

        Ok(if completed {
            RenderStatus::Completed
        } else {
            RenderStatus::Cancelled
        })
    }
}

fn framebuffer_properties(settings: &RenderSettings) -> FramebufferProperties {
    FramebufferProperties {
        width: settings.width(),
        height: settings.height(),
        channels: settings.channels(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tessera_core::{Light, Material, Mesh, Object3D, DEFAULT_SKYBOX_COLOR};
    use tessera_math::{Color, DVec3};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Unit sphere at -Z lit from +X, seen through a pinhole.
    fn hemisphere_scene() -> Scene {
        let mut scene = Scene::new();
        let white = scene
            .materials_mut()
            .add(Material::new("White", Color::ONE).with_roughness(1.0));
        let ball = Object3D::new("ball", Mesh::sphere(1.0, 48, 24), white).with_transform(
            tessera_core::Transform::from_position(DVec3::new(0.0, 0.0, -5.0)),
        );
        scene.add_object(ball);
        scene.add_light(Light::directional("sun", DVec3::NEG_X).with_intensity(3.0));
        scene.build_acceleration_structures();
        scene.camera_mut().set_depth_of_field(false);
        scene
    }

    fn pixel(fb: &Framebuffer, x: u32, y: u32) -> Color {
        let props = fb.properties();
        let i = ((y * props.width + x) * props.channels) as usize;
        let b = fb.buffer();
        Color::new(b[i], b[i + 1], b[i + 2])
    }

    fn settings() -> RenderSettings {
        RenderSettings::default()
            .with_resolution(64, 48)
            .with_samples_per_pixel(1)
            .with_max_bounces(0)
            .with_chunk_size(16)
    }

    #[test]
    fn test_lit_side_is_brighter_and_background_is_sky() {
        init_logger();
        let scene = hemisphere_scene();
        let mut renderer = Renderer::new(settings().with_render_mode(RenderMode::SingleThreaded));
        assert_eq!(renderer.render_frame(&scene), Ok(RenderStatus::Completed));
        let fb = renderer.framebuffer();

        // The sphere spans roughly the middle third of the image horizontally.
        let mut lit = 0.0;
        let mut unlit = 0.0;
        for y in 20..28 {
            for dx in 3..7 {
                lit += pixel(fb, 32 + dx, y).x;
                unlit += pixel(fb, 31 - dx, y).x;
            }
        }
        assert!(lit > unlit + 1.0, "lit {lit} vs unlit {unlit}");
        assert_eq!(unlit, 0.0);

        for (x, y) in [(0, 0), (63, 0), (0, 47), (63, 47)] {
            assert_eq!(pixel(fb, x, y), DEFAULT_SKYBOX_COLOR);
        }
    }

    #[test]
    fn test_single_and_multi_threaded_agree() {
        init_logger();
        let scene = hemisphere_scene();
        let mut single = Renderer::new(settings().with_render_mode(RenderMode::SingleThreaded));
        let mut multi = Renderer::new(settings().with_render_mode(RenderMode::MultiThreadedCpu));
        single.render_frame(&scene).unwrap();
        multi.render_frame(&scene).unwrap();

        for (a, b) in single.framebuffer().buffer().iter().zip(multi.framebuffer().buffer()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_stop_before_start_cancels_and_resets() {
        init_logger();
        let scene = hemisphere_scene();
        let mut renderer = Renderer::new(settings());
        let handle = renderer.stop_handle();
        handle.request_stop();
        assert!(renderer.is_stop_requested());

        assert_eq!(renderer.render_frame(&scene), Ok(RenderStatus::Cancelled));
        assert!(renderer.framebuffer().buffer().iter().all(|&v| v == 0.0));

        // The request was consumed.
        assert!(!renderer.is_stop_requested());
        assert_eq!(renderer.render_frame(&scene), Ok(RenderStatus::Completed));
        assert!(renderer.framebuffer().maximum_value() > 0.0);
    }

    #[test]
    fn test_stop_from_progress_callback() {
        init_logger();
        let scene = hemisphere_scene();
        let mut renderer = Renderer::new(
            settings()
                .with_samples_per_pixel(16)
                .with_render_mode(RenderMode::SingleThreaded),
        );
        let handle = renderer.stop_handle();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        renderer.on_progress().add(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            handle.request_stop();
        });

        assert_eq!(renderer.render_frame(&scene), Ok(RenderStatus::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(renderer.framebuffer().buffer().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_gpu_mode_is_unsupported() {
        let scene = Scene::new();
        let mut renderer = Renderer::new(settings().with_render_mode(RenderMode::GpuCuda));
        assert_eq!(
            renderer.render_frame(&scene),
            Err(RenderError::UnsupportedMode(RenderMode::GpuCuda))
        );
    }

    #[test]
    fn test_framebuffer_follows_settings() {
        let scene = Scene::new();
        let mut renderer = Renderer::new(settings());
        renderer.set_settings(settings().with_resolution(10, 5).with_channels(4));
        renderer.render_frame(&scene).unwrap();

        let props = renderer.framebuffer().properties();
        assert_eq!((props.width, props.height, props.channels), (10, 5, 4));
        // empty scene: every pixel is sky with full alpha
        let b = renderer.framebuffer().buffer();
        assert_eq!(&b[..4], &[0.65, 0.65, 0.9, 1.0]);
        assert_eq!(renderer.stats().total_chunks, 1);
    }
}
