//! Render settings.
//!
//! Every setter clamps its input, so a [`RenderSettings`] is always valid. JSON files
//! are read into an all-optional [`RenderSettingsConfig`] first and then applied
//! through the same setters.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::DEFAULT_CHUNK_SIZE;

pub const MAX_IMAGE_DIMENSION: u32 = 8192;
pub const MAX_SAMPLES_PER_PIXEL: u32 = 1024;
pub const MAX_BOUNCES: u32 = 100;
pub const MAX_CHUNK_SIZE: u32 = 1024;

/// Cores left free for the rest of the application during a render.
pub const THREAD_RESERVE: usize = 1;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to parse render settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read or write render settings: {0}")]
    Io(#[from] std::io::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    SingleThreaded,
    #[default]
    MultiThreadedCpu,
    /// Reserved. The renderer reports it as unsupported.
    GpuCuda,
}

/// Largest useful worker count on this machine.
pub fn max_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(THREAD_RESERVE)
        .max(1)
}

/// Nearest perfect square to `samples`, ties rounding down.
pub fn snap_to_perfect_square(samples: u32) -> u32 {
    let root = (samples as f64).sqrt().floor() as u32;
    let lower = root * root;
    let upper = (root + 1) * (root + 1);
    if samples - lower <= upper - samples {
        lower
    } else {
        upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSettings {
    width: u32,
    height: u32,
    channels: u32,
    samples_per_pixel: u32,
    max_bounces: u32,
    render_mode: RenderMode,
    chunk_size: u32,
    thread_count: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            channels: 3,
            samples_per_pixel: 1,
            max_bounces: 5,
            render_mode: RenderMode::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            thread_count: max_thread_count(),
        }
    }
}

/// On-disk form of [`RenderSettings`]. Missing fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderSettingsConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channels: Option<u32>,
    pub samples_per_pixel: Option<u32>,
    pub max_bounces: Option<u32>,
    pub render_mode: Option<RenderMode>,
    pub chunk_size: Option<u32>,
    pub thread_count: Option<usize>,
}

impl RenderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from JSON, clamping every value.
    pub fn from_json(json: &str) -> SettingsResult<Self> {
        let config: RenderSettingsConfig = serde_json::from_str(json)?;
        let mut settings = Self::default();
        settings.apply(&config);
        Ok(settings)
    }

    pub fn to_json(&self) -> SettingsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Apply every field that is present in `config`.
    pub fn apply(&mut self, config: &RenderSettingsConfig) {
        if let Some(width) = config.width {
            self.set_width(width);
        }
        if let Some(height) = config.height {
            self.set_height(height);
        }
        if let Some(channels) = config.channels {
            self.set_channels(channels);
        }
        if let Some(samples) = config.samples_per_pixel {
            self.set_samples_per_pixel(samples);
        }
        if let Some(bounces) = config.max_bounces {
            self.set_max_bounces(bounces);
        }
        if let Some(mode) = config.render_mode {
            self.set_render_mode(mode);
        }
        if let Some(chunk_size) = config.chunk_size {
            self.set_chunk_size(chunk_size);
        }
        if let Some(threads) = config.thread_count {
            self.set_thread_count(threads);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }

    pub fn max_bounces(&self) -> u32 {
        self.max_bounces
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width.clamp(1, MAX_IMAGE_DIMENSION);
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height.clamp(1, MAX_IMAGE_DIMENSION);
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.set_width(width);
        self.set_height(height);
    }

    /// 1, 3 or 4. Two channels become RGB, anything else is clamped into range.
    pub fn set_channels(&mut self, channels: u32) {
        self.channels = match channels {
            0 | 1 => 1,
            2 | 3 => 3,
            _ => 4,
        };
    }

    /// Clamped to `[1, MAX_SAMPLES_PER_PIXEL]` and snapped to a perfect square.
    pub fn set_samples_per_pixel(&mut self, samples: u32) {
        let clamped = samples.clamp(1, MAX_SAMPLES_PER_PIXEL);
        self.samples_per_pixel = snap_to_perfect_square(clamped);
    }

    pub fn set_max_bounces(&mut self, bounces: u32) {
        self.max_bounces = bounces.min(MAX_BOUNCES);
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    pub fn set_chunk_size(&mut self, chunk_size: u32) {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
    }

    pub fn set_thread_count(&mut self, threads: usize) {
        self.thread_count = threads.clamp(1, max_thread_count());
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.set_resolution(width, height);
        self
    }

    pub fn with_samples_per_pixel(mut self, samples: u32) -> Self {
        self.set_samples_per_pixel(samples);
        self
    }

    pub fn with_max_bounces(mut self, bounces: u32) -> Self {
        self.set_max_bounces(bounces);
        self
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.set_render_mode(mode);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.set_chunk_size(chunk_size);
        self
    }

    pub fn with_thread_count(mut self, threads: usize) -> Self {
        self.set_thread_count(threads);
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.set_channels(channels);
        self
    }
}
