//! Fixed-size tile statistics over a band raster.

use crate::decode::BandRaster;

/// Side of the square tile window in pixels.
pub const TILE_SIZE: u32 = 366;

/// Per-tile and whole-image brightness statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSummary {
    /// Unweighted arithmetic mean of the tile means.
    pub image_mean: f64,
    /// Per-tile means in scan order: outer loop over x, inner loop over y.
    pub tile_means: Vec<f64>,
}

/// Compute tile statistics with the standard 366 pixel window.
pub fn summarize(raster: &BandRaster) -> RasterSummary {
    summarize_with_tile_size(raster, TILE_SIZE)
}

/// Compute tile statistics with an explicit window size.
///
/// Windows never overlap; windows on the right and bottom edges are clipped
/// to the raster bounds and still contribute one mean each. The image mean
/// averages the tile means unweighted, so a clipped edge tile carries the
/// same weight as a full interior tile.
pub fn summarize_with_tile_size(raster: &BandRaster, tile_size: u32) -> RasterSummary {
    assert!(tile_size > 0, "tile size must be positive");

    let mut tile_means = Vec::new();
    for x in (0..raster.width()).step_by(tile_size as usize) {
        for y in (0..raster.height()).step_by(tile_size as usize) {
            let w = tile_size.min(raster.width() - x);
            let h = tile_size.min(raster.height() - y);
            tile_means.push(window_mean(raster, x, y, w, h));
        }
    }

    let image_mean = if tile_means.is_empty() {
        0.0
    } else {
        tile_means.iter().sum::<f64>() / tile_means.len() as f64
    };

    RasterSummary {
        image_mean,
        tile_means,
    }
}

/// Arithmetic mean over one clipped window. A single-pixel window's value is
/// its own mean.
fn window_mean(raster: &BandRaster, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let mut sum = 0.0;
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            sum += raster.sample(x, y);
        }
    }
    sum / ((w as u64 * h as u64) as f64)
}
