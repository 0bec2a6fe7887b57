//! Catalog access: the async seam and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, info, instrument};

use watch_common::{BoundingBox, WatchError, WatchResult};

use crate::types::{CatalogItem, SearchBody, SearchResponse};

/// Connection settings for the HTTP catalog client.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// STAC search endpoint.
    pub search_url: String,
    /// Collection searched for new scenes.
    pub collection: String,
    /// Bearer credential sent with band downloads.
    pub bearer_token: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_url: "https://cmr.earthdata.nasa.gov/stac/LPCLOUD/search".to_string(),
            collection: "HLSL30.v2.0".to_string(),
            bearer_token: String::new(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// Remote scene-catalog operations used by the pipeline.
///
/// The HTTP implementation talks to the real endpoints; tests substitute
/// fakes to script search outcomes and asset bytes.
#[async_trait]
pub trait SceneCatalog: Send + Sync {
    /// Search one calendar day for at most one scene intersecting the bbox.
    async fn search_day(&self, bbox: &BoundingBox, day: NaiveDate)
        -> WatchResult<SearchResponse>;

    /// Fetch the catalog item document behind a scene's self link.
    async fn fetch_item(&self, item_url: &str) -> WatchResult<CatalogItem>;

    /// Follow redirects on a preview asset and return the final URL.
    async fn resolve_preview(&self, href: &str) -> WatchResult<String>;

    /// Download a band asset with the bearer credential.
    async fn fetch_band(&self, href: &str) -> WatchResult<Bytes>;
}

/// `SceneCatalog` over HTTP.
pub struct HttpSceneCatalog {
    client: Client,
    config: CatalogConfig,
}

impl HttpSceneCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }
}

#[async_trait]
impl SceneCatalog for HttpSceneCatalog {
    #[instrument(skip(self, bbox), fields(day = %day))]
    async fn search_day(
        &self,
        bbox: &BoundingBox,
        day: NaiveDate,
    ) -> WatchResult<SearchResponse> {
        let body = SearchBody::for_day(&self.config.collection, day, bbox.corner_points());

        debug!(url = %self.config.search_url, "Searching catalog");

        let response = self
            .client
            .post(&self.config.search_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WatchError::AssetUnavailable(format!("catalog search: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::AssetUnavailable(format!(
                "catalog search returned {}",
                status
            )));
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| WatchError::MalformedCatalogResponse(format!("search body: {}", e)))
    }

    #[instrument(skip(self))]
    async fn fetch_item(&self, item_url: &str) -> WatchResult<CatalogItem> {
        let response = self
            .client
            .get(item_url)
            .send()
            .await
            .map_err(|e| WatchError::AssetUnavailable(format!("catalog item: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::AssetUnavailable(format!(
                "catalog item returned {}",
                status
            )));
        }

        response
            .json::<CatalogItem>()
            .await
            .map_err(|e| WatchError::MalformedCatalogResponse(format!("item body: {}", e)))
    }

    #[instrument(skip(self))]
    async fn resolve_preview(&self, href: &str) -> WatchResult<String> {
        let response = self
            .client
            .get(href)
            .send()
            .await
            .map_err(|e| WatchError::AssetUnavailable(format!("preview: {}", e)))?;

        if !response.status().is_success() {
            return Err(WatchError::AssetUnavailable(format!(
                "preview returned {}",
                response.status()
            )));
        }

        // The client follows redirects; the response URL is the final one.
        Ok(response.url().to_string())
    }

    #[instrument(skip(self))]
    async fn fetch_band(&self, href: &str) -> WatchResult<Bytes> {
        debug!("Downloading band asset");

        let response = self
            .client
            .get(href)
            .bearer_auth(&self.config.bearer_token)
            .send()
            .await
            .map_err(|e| WatchError::AssetUnavailable(format!("band download: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::AssetUnavailable(format!(
                "band download returned {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WatchError::AssetUnavailable(format!("band body: {}", e)))?;

        info!(size = bytes.len(), "Band asset downloaded");
        Ok(bytes)
    }
}
