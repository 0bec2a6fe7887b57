//! Error types for the hls-watch pipeline.

use thiserror::Error;

/// Result type alias using WatchError.
pub type WatchResult<T> = Result<T, WatchError>;

/// Terminal error kinds for one pipeline invocation.
///
/// Every variant ends the run that raised it; a later attempt is a brand-new
/// invocation. The only internal retry is the calendar-day stepping inside
/// the scene search, which is exhausted before `SceneNotFound` is returned.
#[derive(Debug, Error)]
pub enum WatchError {
    // === Geodetic errors ===
    #[error("Invalid coordinate for cell '{cell}': {message}")]
    InvalidCoordinate { cell: String, message: String },

    // === Catalog errors ===
    #[error("No scene found after {attempts} attempts (oldest day tried: {oldest_day})")]
    SceneNotFound { attempts: u32, oldest_day: String },

    #[error("Malformed catalog response: {0}")]
    MalformedCatalogResponse(String),

    #[error("Asset unavailable: {0}")]
    AssetUnavailable(String),

    // === Storage errors ===
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    // === Raster errors ===
    #[error("Raster read error: {0}")]
    RasterReadError(String),

    // === Analysis errors ===
    #[error("Analysis unavailable: {0}")]
    AnalysisUnavailable(String),
}

impl WatchError {
    /// Stable tag for this error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WatchError::InvalidCoordinate { .. } => "InvalidCoordinate",
            WatchError::SceneNotFound { .. } => "SceneNotFound",
            WatchError::MalformedCatalogResponse(_) => "MalformedCatalogResponse",
            WatchError::AssetUnavailable(_) => "AssetUnavailable",
            WatchError::StorageFailure(_) => "StorageFailure",
            WatchError::RasterReadError(_) => "RasterReadError",
            WatchError::AnalysisUnavailable(_) => "AnalysisUnavailable",
        }
    }
}
