//! Configuration loading for the watcher service.
//!
//! A single YAML file describes the scene catalog, the analysis model, the
//! staging backend, the event database, and the tracked regions. The two
//! credentials (`EARTHDATA_TOKEN`, `OPENAI_API_KEY`) come from the
//! environment, never from the file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use watch_common::TrackedRegion;

/// Root configuration loaded from the watcher YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub staging: StagingSection,
    #[serde(default)]
    pub events: EventsSection,
    /// Regions to watch; supplied read-only by the tracker-management system.
    #[serde(default)]
    pub regions: Vec<TrackedRegion>,
    /// Regions run concurrently, this many in flight at once.
    #[serde(default = "default_max_concurrent_regions")]
    pub max_concurrent_regions: usize,
}

fn default_max_concurrent_regions() -> usize {
    4
}

/// Scene catalog endpoint and search behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSection {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Spectral band asset downloaded and tiled.
    #[serde(default = "default_band")]
    pub band: String,
    /// Asset whose redirect-resolved URL is recorded as the scene preview.
    #[serde(default = "default_preview_asset")]
    pub preview_asset: String,
    /// Day-stepping retries after the initial search attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_url() -> String {
    "https://cmr.earthdata.nasa.gov/stac/LPCLOUD/search".to_string()
}

fn default_collection() -> String {
    "HLSL30.v2.0".to_string()
}

fn default_band() -> String {
    "B07".to_string()
}

fn default_preview_asset() -> String {
    "browse".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_catalog_timeout_secs() -> u64 {
    300
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            collection: default_collection(),
            band: default_band(),
            preview_asset: default_preview_asset(),
            max_retries: default_max_retries(),
            timeout_secs: default_catalog_timeout_secs(),
        }
    }
}

/// Chat-completion model and sampling parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSection {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default)]
    pub frequency_penalty: f64,
    #[serde(default)]
    pub presence_penalty: f64,
    #[serde(default = "default_analysis_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f64 {
    1.0
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_top_p() -> f64 {
    1.0
}

fn default_analysis_timeout_secs() -> u64 {
    120
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            timeout_secs: default_analysis_timeout_secs(),
        }
    }
}

/// Where band bytes are staged between download and tiling.
#[derive(Debug, Clone, Deserialize)]
pub struct StagingSection {
    /// One of "filesystem", "s3", or "memory".
    #[serde(default = "default_staging_backend")]
    pub backend: String,
    /// Root directory for the filesystem backend.
    #[serde(default = "default_staging_root")]
    pub root: String,
    /// Bucket for the S3 backend; credentials come from the environment.
    #[serde(default)]
    pub bucket: String,
}

fn default_staging_backend() -> String {
    "filesystem".to_string()
}

fn default_staging_root() -> String {
    "./staging".to_string()
}

impl Default for StagingSection {
    fn default() -> Self {
        Self {
            backend: default_staging_backend(),
            root: default_staging_root(),
            bucket: String::new(),
        }
    }
}

/// Event log location.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsSection {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    "./events.db".to_string()
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl WatcherConfig {
    /// Load the watcher configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: WatcherConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(
            regions = config.regions.len(),
            path = %path.display(),
            "Loaded watcher config"
        );
        Ok(config)
    }

    /// Find a configured region by id.
    pub fn region(&self, id: &str) -> Option<&TrackedRegion> {
        self.regions.iter().find(|r| r.id == id)
    }
}

/// Credentials read from the environment at startup.
///
/// These are the only ambient inputs; every component receives them
/// explicitly at construction.
#[derive(Debug, Clone)]
pub struct Secrets {
    /// Bearer token for authenticated band downloads.
    pub earthdata_token: String,
    /// API key for the chat-completion endpoint.
    pub openai_api_key: String,
}

impl Secrets {
    /// Read both credentials, failing with a named variable on absence.
    pub fn from_env() -> Result<Self> {
        let earthdata_token =
            std::env::var("EARTHDATA_TOKEN").context("EARTHDATA_TOKEN is not set")?;
        let openai_api_key =
            std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;

        Ok(Self {
            earthdata_token,
            openai_api_key,
        })
    }
}
