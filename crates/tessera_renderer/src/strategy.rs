//! Render strategies: how the chunks of a frame are distributed over threads.
//!
//! Both strategies render through the same [`FrameContext::render_chunk`]. Each pixel
//! sample draws from its own RNG seeded by `(x, y, sample)`, so the image does not
//! depend on the number of threads or on the order chunks are claimed in.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tessera_core::{Observer, Scene};

use crate::camera::CameraRayEmitter;
use crate::chunk::{generate_chunks, samples_per_row, Chunk};
use crate::framebuffer::{Framebuffer, PixelCoord, PixelSink, WorkerContext};
use crate::path_tracer::PathTracer;
use crate::render_time::{RenderStats, RenderTime};
use crate::sampling::gen_f64;
use crate::settings::RenderSettings;

/// Workers refresh the timer and publish stats every this many claimed chunks.
pub const CHUNK_COUNT_UPDATE_INTERVAL: usize = 10;

/// Cloneable handle that asks a running render to stop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Cancellation, timing and progress reporting for a renderer.
#[derive(Debug, Default)]
pub struct RenderControl {
    stop: StopHandle,
    progress: Observer<f64>,
    stats: Observer<RenderStats>,
    time: RenderTime,
}

impl RenderControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }

    pub fn clear_stop(&self) {
        self.stop.flag.store(false, Ordering::Release);
    }

    /// Fraction of the frame done, in `[0, 1]`.
    pub fn on_progress(&mut self) -> &mut Observer<f64> {
        &mut self.progress
    }

    pub fn on_stats(&mut self) -> &mut Observer<RenderStats> {
        &mut self.stats
    }

    pub fn time(&self) -> &RenderTime {
        &self.time
    }

    pub fn stats(&self) -> RenderStats {
        self.time.stats()
    }

    fn report_chunks(&self, current_chunk: usize) {
        self.time.update(current_chunk);
        self.stats.notify(&self.time.stats());
    }

    fn report_progress(&self, fraction: f64) {
        self.progress.notify(&fraction);
    }
}

/// Everything a worker needs to render chunks of one frame.
pub struct FrameContext<'a> {
    emitter: CameraRayEmitter,
    tracer: PathTracer<'a>,
    control: &'a RenderControl,
    width: u32,
    height: u32,
    samples_per_pixel: u32,
    samples_per_row: u32,
}

impl<'a> FrameContext<'a> {
    pub fn new(scene: &'a Scene, settings: &RenderSettings, control: &'a RenderControl) -> Self {
        Self {
            emitter: CameraRayEmitter::from_camera(scene.camera(), settings.aspect_ratio()),
            tracer: PathTracer::new(scene, settings.max_bounces()),
            control,
            width: settings.width(),
            height: settings.height(),
            samples_per_pixel: settings.samples_per_pixel(),
            samples_per_row: samples_per_row(settings.samples_per_pixel()),
        }
    }

    pub fn control(&self) -> &RenderControl {
        self.control
    }

    fn sample_weight(&self) -> f64 {
        1.0 / self.samples_per_pixel as f64
    }

    /// Trace one sample per pixel of `chunk` into `sink`.
    pub fn render_chunk<S: PixelSink>(&self, sink: &mut S, ctx: &WorkerContext, chunk: &Chunk) {
        let cell_size = 1.0 / self.samples_per_row as f64;
        let sample = chunk.sample_index(self.samples_per_row);
        let (grid_x, grid_y) = chunk.subpixel_grid_pos;
        let weight = self.sample_weight();

        for y in chunk.start.1..chunk.end.1 {
            for x in chunk.start.0..chunk.end.0 {
                let mut rng = StdRng::seed_from_u64(pixel_sample_seed(x, y, sample));
                let u = (x as f64 + (grid_x as f64 + gen_f64(&mut rng)) * cell_size) / self.width as f64;
                let v = (y as f64 + (grid_y as f64 + gen_f64(&mut rng)) * cell_size) / self.height as f64;

                let ray = self.emitter.ray(u, v, &mut rng);
                let color = self.tracer.trace(ray, &mut rng);
                sink.set_pixel_color(ctx, PixelCoord::new(x as i64, y as i64), color.extend(1.0), weight);
            }
        }
    }
}

/// Stateless hash of a pixel sample, used as its RNG seed.
fn pixel_sample_seed(x: u32, y: u32, sample: u32) -> u64 {
    let mut z = ((x as u64) << 40) ^ ((y as u64) << 16) ^ (sample as u64);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A way of rendering a whole frame into the framebuffer.
pub trait RenderStrategy {
    /// Render every sample of the frame. Returns `false` when the render was stopped,
    /// in which case the main buffer is left untouched.
    fn render(&self, frame: &FrameContext, framebuffer: &mut Framebuffer) -> bool;
}

/// Every sample pass rendered in turn on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleThreaded;

impl RenderStrategy for SingleThreaded {
    fn render(&self, frame: &FrameContext, framebuffer: &mut Framebuffer) -> bool {
        let control = frame.control();
        let spp = frame.samples_per_pixel;
        let ctx = WorkerContext { thread_id: 0 };

        framebuffer.init_thread_buffers(1);
        control.time().start(spp as usize);
        log::info!("Rendering {}x{} at {} spp on 1 thread", frame.width, frame.height, spp);

        for s in 0..spp {
            if control.is_stop_requested() {
                log::warn!("Render cancelled by user.");
                framebuffer.clear_thread_buffers();
                control.time().stop();
                return false;
            }
            let chunk = Chunk {
                start: (0, 0),
                end: (frame.width, frame.height),
                subpixel_grid_pos: (s % frame.samples_per_row, s / frame.samples_per_row),
            };
            frame.render_chunk(framebuffer, &ctx, &chunk);
            control.report_chunks(s as usize + 1);
            control.report_progress((s + 1) as f64 / spp as f64);
        }

        framebuffer.reduce_thread_buffers();
        framebuffer.clear_thread_buffers();
        control.time().stop();
        log::info!("Render finished in {:.2?}", control.time().elapsed());
        true
    }
}

/// Chunks handed out to scoped worker threads through an atomic counter.
#[derive(Debug, Clone, Copy)]
pub struct MultiThreadedCpu {
    pub thread_count: usize,
    pub chunk_size: u32,
}

impl MultiThreadedCpu {
    pub fn new(thread_count: usize, chunk_size: u32) -> Self {
        Self {
            thread_count: thread_count.max(1),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self::new(settings.thread_count(), settings.chunk_size())
    }
}

impl RenderStrategy for MultiThreadedCpu {
    fn render(&self, frame: &FrameContext, framebuffer: &mut Framebuffer) -> bool {
        let control = frame.control();
        let spp = frame.samples_per_pixel;
        let chunks = generate_chunks(frame.width, frame.height, self.chunk_size, spp);
        let total = chunks.len();
        let chunks_per_pass = (total / spp.max(1) as usize).max(1);
        let next_chunk = AtomicUsize::new(0);

        framebuffer.init_thread_buffers(self.thread_count);
        control.time().start(total);
        log::info!(
            "Rendering {}x{} at {} spp: {} chunks on {} threads",
            frame.width,
            frame.height,
            spp,
            total,
            self.thread_count
        );

        std::thread::scope(|scope| {
            for (thread_id, buffer) in framebuffer.thread_buffers_mut().iter_mut().enumerate() {
                let chunks = &chunks;
                let next_chunk = &next_chunk;
                scope.spawn(move || {
                    let ctx = WorkerContext { thread_id };
                    loop {
                        if control.is_stop_requested() {
                            return;
                        }
                        let index = next_chunk.fetch_add(1, Ordering::Relaxed);
                        if index % CHUNK_COUNT_UPDATE_INTERVAL == 0 {
                            control.report_chunks(index.min(total));
                        }
                        let Some(chunk) = chunks.get(index) else {
                            break;
                        };
                        frame.render_chunk(buffer, &ctx, chunk);
                        if index % chunks_per_pass == 0 {
                            control.report_progress(index as f64 / total as f64);
                        }
                    }
                });
            }
        });

        if control.is_stop_requested() {
            log::warn!("Render cancelled by user.");
            framebuffer.clear_thread_buffers();
            control.time().stop();
            return false;
        }

        framebuffer.reduce_thread_buffers();
        framebuffer.clear_thread_buffers();
        control.report_chunks(total);
        control.report_progress(1.0);
        control.time().stop();
        log::info!("Render finished in {:.2?}", control.time().elapsed());
        true
    }
}
