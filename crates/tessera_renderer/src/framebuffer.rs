//! Accumulation buffers.
//!
//! While a frame renders, each worker writes weighted samples into its own
//! [`ThreadBuffer`]. Once the workers have joined, the thread buffers are summed into
//! the main buffer in parallel.

use rayon::prelude::*;
use tessera_math::color::{convert_to_srgb_space, to_grayscale};
use tessera_math::ColorRgba;

/// Identifies the worker that owns a thread buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerContext {
    pub thread_id: usize,
}

/// Integer pixel position. Signed so callers can pass positions computed off-image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelCoord {
    pub x: i64,
    pub y: i64,
}

impl PixelCoord {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferProperties {
    pub width: u32,
    pub height: u32,
    /// 1 (grayscale), 3 (RGB) or 4 (RGBA).
    pub channels: u32,
}

impl Default for FramebufferProperties {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            channels: 3,
        }
    }
}

impl FramebufferProperties {
    pub fn value_count(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    fn index_of(&self, coord: PixelCoord) -> Option<usize> {
        let in_range = (0..self.width as i64).contains(&coord.x) && (0..self.height as i64).contains(&coord.y);
        if !in_range {
            log::error!(
                "Pixel coordinates ({}, {}) out of range for {}x{} framebuffer",
                coord.x,
                coord.y,
                self.width,
                self.height
            );
            return None;
        }
        Some((coord.y as usize * self.width as usize + coord.x as usize) * self.channels as usize)
    }
}

/// Anything a strategy can splat weighted samples into.
pub trait PixelSink {
    /// Add `color * weight` at `coord`.
    fn set_pixel_color(&mut self, ctx: &WorkerContext, coord: PixelCoord, color: ColorRgba, weight: f64);
}

/// Private accumulation buffer of one worker.
#[derive(Debug, Clone)]
pub struct ThreadBuffer {
    properties: FramebufferProperties,
    data: Vec<f64>,
}

impl ThreadBuffer {
    fn new(properties: FramebufferProperties) -> Self {
        Self {
            properties,
            data: vec![0.0; properties.value_count()],
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

impl PixelSink for ThreadBuffer {
    fn set_pixel_color(&mut self, _ctx: &WorkerContext, coord: PixelCoord, color: ColorRgba, weight: f64) {
        accumulate(&mut self.data, &self.properties, coord, color, weight);
    }
}

fn accumulate(data: &mut [f64], properties: &FramebufferProperties, coord: PixelCoord, color: ColorRgba, weight: f64) {
    let Some(index) = properties.index_of(coord) else {
        return;
    };
    match properties.channels {
        1 => data[index] += to_grayscale(color.truncate()) * weight,
        3 => {
            for (value, channel) in data[index..index + 3].iter_mut().zip(color.truncate().to_array()) {
                *value += channel * weight;
            }
        }
        4 => {
            for (value, channel) in data[index..index + 4].iter_mut().zip(color.to_array()) {
                *value += channel * weight;
            }
        }
        other => log::error!("Unsupported channel count: {}", other),
    }
}

/// Final image plus the per-worker buffers of the frame in flight.
#[derive(Debug, Clone, Default)]
pub struct Framebuffer {
    properties: FramebufferProperties,
    buffer: Vec<f64>,
    thread_buffers: Vec<ThreadBuffer>,
}

impl Framebuffer {
    pub fn new(properties: FramebufferProperties) -> Self {
        Self {
            properties,
            buffer: vec![0.0; properties.value_count()],
            thread_buffers: Vec::new(),
        }
    }

    pub fn properties(&self) -> FramebufferProperties {
        self.properties
    }

    /// Resize. The buffer is only reallocated (and cleared) when the properties change.
    pub fn set_properties(&mut self, properties: FramebufferProperties) {
        if properties == self.properties && self.buffer.len() == properties.value_count() {
            return;
        }
        self.properties = properties;
        self.buffer = vec![0.0; properties.value_count()];
        self.thread_buffers.clear();
    }

    /// Interleaved values, row-major from the top-left pixel.
    pub fn buffer(&self) -> &[f64] {
        &self.buffer
    }

    /// Raw bytes of the buffer, for uploading as a preview texture.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.buffer)
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
    }

    /// Allocate `count` zeroed thread buffers, replacing any existing ones.
    pub fn init_thread_buffers(&mut self, count: usize) {
        self.thread_buffers = (0..count).map(|_| ThreadBuffer::new(self.properties)).collect();
    }

    pub fn thread_buffers(&self) -> &[ThreadBuffer] {
        &self.thread_buffers
    }

    pub fn thread_buffers_mut(&mut self) -> &mut [ThreadBuffer] {
        &mut self.thread_buffers
    }

    /// Replace the main buffer with the element-wise sum of all thread buffers.
    pub fn reduce_thread_buffers(&mut self) {
        let thread_buffers = &self.thread_buffers;
        self.buffer.par_iter_mut().enumerate().for_each(|(i, value)| {
            *value = thread_buffers.iter().map(|b| b.data[i]).sum();
        });
    }

    /// Drop the thread buffers of the finished frame.
    pub fn clear_thread_buffers(&mut self) {
        self.thread_buffers.clear();
    }

    pub fn scale_buffer_values(&mut self, factor: f64) {
        self.buffer.par_iter_mut().for_each(|v| *v *= factor);
    }

    /// Largest value in the buffer, 0 when empty.
    pub fn maximum_value(&self) -> f64 {
        if self.buffer.is_empty() {
            return 0.0;
        }
        self.buffer.par_iter().copied().reduce(|| f64::MIN, f64::max)
    }

    /// Encode the colour channels to sRGB in place. Alpha stays linear.
    pub fn convert_to_srgb_color_space(&mut self) {
        let channels = self.properties.channels as usize;
        if channels == 0 {
            return;
        }
        let color_channels = if channels == 4 { 3 } else { channels };
        self.buffer.par_chunks_mut(channels).for_each(|pixel| {
            for value in &mut pixel[..color_channels] {
                *value = convert_to_srgb_space(*value);
            }
        });
    }

    /// 8-bit RGBA copy of the buffer, values clamped to `[0, 1]`.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let channels = self.properties.channels as usize;
        let quantize = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if channels == 0 {
            return Vec::new();
        }
        self.buffer
            .chunks(channels)
            .flat_map(|pixel| match pixel {
                [g] => [quantize(*g), quantize(*g), quantize(*g), 255],
                [r, g, b] => [quantize(*r), quantize(*g), quantize(*b), 255],
                [r, g, b, a] => [quantize(*r), quantize(*g), quantize(*b), quantize(*a)],
                _ => [255, 0, 255, 255],
            })
            .collect()
    }
}

impl PixelSink for Framebuffer {
    fn set_pixel_color(&mut self, ctx: &WorkerContext, coord: PixelCoord, color: ColorRgba, weight: f64) {
        let Some(target) = self.thread_buffers.get_mut(ctx.thread_id) else {
            log::error!(
                "Invalid thread ID: {} ({} thread buffers)",
                ctx.thread_id,
                self.thread_buffers.len()
            );
            return;
        };
        target.set_pixel_color(ctx, coord, color, weight);
    }
}
