//! Band raster decoding.
//!
//! Band assets arrive as single-band GeoTIFFs. Samples are widened to f64 on
//! decode so the statistics code works uniformly across the unsigned, signed,
//! and float sample formats the archive uses.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult, Limits};

use watch_common::{WatchError, WatchResult};

/// A decoded single-band raster, samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct BandRaster {
    width: u32,
    height: u32,
    samples: Vec<f64>,
}

impl BandRaster {
    /// Decode a GeoTIFF band asset from raw bytes.
    pub fn decode(bytes: &[u8]) -> WatchResult<Self> {
        let mut decoder = Decoder::new(Cursor::new(bytes))
            .map_err(|e| WatchError::RasterReadError(format!("open: {}", e)))?
            .with_limits(Limits::unlimited());

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| WatchError::RasterReadError(format!("dimensions: {}", e)))?;

        if width == 0 || height == 0 {
            return Err(WatchError::RasterReadError(format!(
                "degenerate raster dimensions {}x{}",
                width, height
            )));
        }

        let image = decoder
            .read_image()
            .map_err(|e| WatchError::RasterReadError(format!("read: {}", e)))?;

        // 64-bit integer samples would lose precision in f64; the archive
        // never serves them, so they fail like any other unknown format.
        let samples: Vec<f64> = match image {
            DecodingResult::U8(data) => data.into_iter().map(f64::from).collect(),
            DecodingResult::U16(data) => data.into_iter().map(f64::from).collect(),
            DecodingResult::U32(data) => data.into_iter().map(f64::from).collect(),
            DecodingResult::I8(data) => data.into_iter().map(f64::from).collect(),
            DecodingResult::I16(data) => data.into_iter().map(f64::from).collect(),
            DecodingResult::I32(data) => data.into_iter().map(f64::from).collect(),
            DecodingResult::F32(data) => data.into_iter().map(f64::from).collect(),
            DecodingResult::F64(data) => data,
            _ => {
                return Err(WatchError::RasterReadError(
                    "unsupported sample format".to_string(),
                ))
            }
        };

        Self::from_samples(width, height, samples)
    }

    /// Build a raster from in-memory samples; fails when the sample count
    /// does not match the dimensions (multi-band data lands here too).
    pub fn from_samples(width: u32, height: u32, samples: Vec<f64>) -> WatchResult<Self> {
        let expected = (width as usize) * (height as usize);
        if samples.len() != expected {
            return Err(WatchError::RasterReadError(format!(
                "expected {} samples for {}x{}, got {}",
                expected,
                width,
                height,
                samples.len()
            )));
        }

        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample value at (x, y).
    pub fn sample(&self, x: u32, y: u32) -> f64 {
        self.samples[(y as usize) * (self.width as usize) + (x as usize)]
    }
}
