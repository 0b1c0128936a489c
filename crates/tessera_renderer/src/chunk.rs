//! Chunked work units for the render strategies.
//!
//! A frame is split into one pass per stratified sub-pixel sample, and every pass is
//! tiled into `chunk_size` squares. Each chunk is rendered exactly once by whichever
//! worker claims it.

/// Default chunk edge length in pixels.
pub const DEFAULT_CHUNK_SIZE: u32 = 256;

/// Rectangle `[start, end)` of pixels plus the sub-pixel cell it samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Inclusive top-left pixel `(x, y)`.
    pub start: (u32, u32),
    /// Exclusive bottom-right pixel `(x, y)`.
    pub end: (u32, u32),
    /// Cell `(column, row)` in the `samples_per_row x samples_per_row` sub-pixel grid.
    pub subpixel_grid_pos: (u32, u32),
}

impl Chunk {
    pub fn width(&self) -> u32 {
        self.end.0 - self.start.0
    }

    pub fn height(&self) -> u32 {
        self.end.1 - self.start.1
    }

    pub fn pixel_count(&self) -> u32 {
        self.width() * self.height()
    }

    /// Linear sample index of this chunk's sub-pixel cell.
    pub fn sample_index(&self, samples_per_row: u32) -> u32 {
        self.subpixel_grid_pos.1 * samples_per_row + self.subpixel_grid_pos.0
    }
}

/// Number of sub-pixel samples per row of the stratified grid.
pub fn samples_per_row(samples_per_pixel: u32) -> u32 {
    ((samples_per_pixel.max(1) as f64).sqrt().floor() as u32).max(1)
}

/// Every chunk of a frame: for each sample `s` in `[0, spp)`, the image tiled by
/// `chunk_size`. Within a pass, tiles are ordered from the image centre outward.
pub fn generate_chunks(width: u32, height: u32, chunk_size: u32, samples_per_pixel: u32) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let per_row = samples_per_row(samples_per_pixel);
    let pass = tile_pass(width, height, chunk_size);

    let mut chunks = Vec::with_capacity(pass.len() * samples_per_pixel as usize);
    for sample in 0..samples_per_pixel {
        let grid = (sample % per_row, sample / per_row);
        chunks.extend(pass.iter().map(|&(start, end)| Chunk {
            start,
            end,
            subpixel_grid_pos: grid,
        }));
    }
    chunks
}

/// Tiles of one pass, sorted in spiral order from the centre.
fn tile_pass(width: u32, height: u32, chunk_size: u32) -> Vec<((u32, u32), (u32, u32))> {
    let mut tiles = Vec::new();
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let end = ((x + chunk_size).min(width), (y + chunk_size).min(height));
            tiles.push(((x, y), end));
            x += chunk_size;
        }
        y += chunk_size;
    }

    let center_x = width as f64 / 2.0;
    let center_y = height as f64 / 2.0;
    let distance = |&((x0, y0), (x1, y1)): &((u32, u32), (u32, u32))| {
        let cx = (x0 + x1) as f64 / 2.0;
        let cy = (y0 + y1) as f64 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };
    tiles.sort_by(|a, b| {
        distance(a)
            .partial_cmp(&distance(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every pixel of each pass is covered exactly once.
    fn assert_exact_tiling(width: u32, height: u32, chunk_size: u32, spp: u32) {
        let chunks = generate_chunks(width, height, chunk_size, spp);
        let per_row = samples_per_row(spp);

        for sample in 0..spp {
            let pass: Vec<&Chunk> = chunks.iter().filter(|c| c.sample_index(per_row) == sample).collect();
            let pixels: u32 = pass.iter().map(|c| c.pixel_count()).sum();
            assert_eq!(pixels, width * height);

            let mut coverage = vec![0u32; (width * height) as usize];
            for chunk in pass {
                for y in chunk.start.1..chunk.end.1 {
                    for x in chunk.start.0..chunk.end.0 {
                        coverage[(y * width + x) as usize] += 1;
                    }
                }
            }
            assert!(
                coverage.iter().all(|&c| c == 1),
                "pass {sample} of {width}x{height}/{chunk_size} is not an exact tiling"
            );
        }
    }

    #[test]
    fn test_chunk_count() {
        let chunks = generate_chunks(100, 50, 32, 4);
        // ceil(100/32) * ceil(50/32) * 4
        assert_eq!(chunks.len(), 4 * 2 * 4);
    }

    #[test]
    fn test_exact_tiling() {
        assert_exact_tiling(128, 128, 64, 1);
        assert_exact_tiling(100, 37, 16, 4);
        assert_exact_tiling(7, 5, 256, 9);
        assert_exact_tiling(33, 65, 1, 1);
    }

    #[test]
    fn test_subpixel_grid_positions() {
        let chunks = generate_chunks(8, 8, 8, 9);
        let grid: Vec<(u32, u32)> = chunks.iter().map(|c| c.subpixel_grid_pos).collect();
        assert_eq!(
            grid,
            vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1), (0, 2), (1, 2), (2, 2)]
        );
    }

    #[test]
    fn test_spiral_order_within_pass() {
        let chunks = generate_chunks(192, 192, 64, 1);
        assert_eq!(chunks.len(), 9);
        assert_eq!(chunks[0].start, (64, 64));
    }

    #[test]
    fn test_samples_per_row() {
        assert_eq!(samples_per_row(1), 1);
        assert_eq!(samples_per_row(4), 2);
        assert_eq!(samples_per_row(9), 3);
        assert_eq!(samples_per_row(1024), 32);
    }
}
