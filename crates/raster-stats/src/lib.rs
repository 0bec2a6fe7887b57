//! Band raster statistics: GeoTIFF decoding and fixed-size tile means.

pub mod decode;
pub mod tiles;

pub use decode::BandRaster;
pub use tiles::{summarize, summarize_with_tile_size, RasterSummary, TILE_SIZE};
