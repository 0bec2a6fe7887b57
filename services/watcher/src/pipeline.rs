//! Pipeline orchestration: one run per tracked region.
//!
//! A run is strictly sequential through the stages; only the two sinks at
//! the end (webhook fan-out and event append) proceed in parallel. A stage
//! failure surfaces one typed error for the whole run, and a fresh attempt
//! is a brand-new run.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use raster_stats::{summarize, BandRaster, RasterSummary};
use scene_catalog::{find_scene, SceneCatalog, SearchPolicy};
use watch_common::{locate, TrackedRegion, TrackerEvent, WatchError, WatchResult, EVENT_TYPE_HLS};

use crate::analysis::SceneAnalyst;
use crate::config::WatcherConfig;
use crate::events::EventStore;
use crate::notify::{self, DeliveryOutcome, WebhookClient};
use crate::staging::BandStaging;

/// Pipeline knobs derived from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Spectral band asset downloaded and tiled.
    pub band: String,
    /// Asset whose redirect-resolved URL becomes the event's preview.
    pub preview_asset: String,
    /// Day-stepping retry cap for the scene search.
    pub policy: SearchPolicy,
    /// Regions in flight at once during `run_all`.
    pub max_concurrent_regions: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self {
            band: config.catalog.band.clone(),
            preview_asset: config.catalog.preview_asset.clone(),
            policy: SearchPolicy {
                max_retries: config.catalog.max_retries,
            },
            max_concurrent_regions: config.max_concurrent_regions,
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Id the event log assigned to the run's record.
    pub event_id: String,
    pub event: TrackerEvent,
    /// Per-target webhook results, in target order.
    pub deliveries: Vec<DeliveryOutcome>,
}

/// Success and failure counts across one `run_all` invocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunTally {
    pub succeeded: usize,
    pub failed: usize,
}

/// Orchestrates the scene-to-webhook pipeline.
pub struct WatchPipeline {
    settings: PipelineSettings,
    catalog: Arc<dyn SceneCatalog>,
    analyst: Arc<dyn SceneAnalyst>,
    webhooks: Arc<dyn WebhookClient>,
    events: Arc<dyn EventStore>,
    staging: BandStaging,
}

impl WatchPipeline {
    pub fn new(
        settings: PipelineSettings,
        catalog: Arc<dyn SceneCatalog>,
        analyst: Arc<dyn SceneAnalyst>,
        webhooks: Arc<dyn WebhookClient>,
        events: Arc<dyn EventStore>,
        staging: BandStaging,
    ) -> Self {
        Self {
            settings,
            catalog,
            analyst,
            webhooks,
            events,
            staging,
        }
    }

    /// Run the full pipeline once for one region.
    #[instrument(skip(self, region), fields(region = %region.id, cell = %region.mgrs))]
    pub async fn run_region(&self, region: &TrackedRegion) -> WatchResult<RunOutcome> {
        let run_id = Uuid::new_v4();

        let bbox = locate(&region.mgrs)?;
        info!(
            west = bbox.west,
            south = bbox.south,
            east = bbox.east,
            north = bbox.north,
            "Region bounding box resolved"
        );

        let start_day = Utc::now().date_naive();
        let scene = find_scene(self.catalog.as_ref(), &bbox, start_day, &self.settings.policy)
            .await?;

        let item = self.catalog.fetch_item(&scene.item_url).await?;

        let cloud_cover = item.cloud_cover_pct().ok_or_else(|| {
            WatchError::AssetUnavailable(format!(
                "catalog item {} has no cloud cover",
                scene.item_url
            ))
        })?;
        let preview_href = item
            .asset_href(&self.settings.preview_asset)
            .ok_or_else(|| {
                WatchError::AssetUnavailable(format!(
                    "catalog item has no {} asset",
                    self.settings.preview_asset
                ))
            })?
            .to_string();
        let band_href = item
            .asset_href(&self.settings.band)
            .ok_or_else(|| {
                WatchError::AssetUnavailable(format!(
                    "catalog item has no {} asset",
                    self.settings.band
                ))
            })?
            .to_string();
        let scene_bbox = item.corner_bbox().ok_or_else(|| {
            WatchError::MalformedCatalogResponse(format!(
                "catalog item {} has no usable bbox",
                scene.item_url
            ))
        })?;

        let sat_image = self.catalog.resolve_preview(&preview_href).await?;
        let band_bytes = self.catalog.fetch_band(&band_href).await?;

        // Stage the band for the raster stage, then drop it whatever happens.
        let key = BandStaging::band_key(&run_id, &self.settings.band);
        self.staging.put(&key, band_bytes).await?;
        let summary = self.summarize_staged(&key).await;
        if let Err(e) = self.staging.delete(&key).await {
            warn!(key = %key, error = %e, "Failed to remove staged band");
        }
        let summary = summary?;

        info!(
            tiles = summary.tile_means.len(),
            image_mean = summary.image_mean,
            cloud_cover,
            "Raster summarized"
        );

        let narrative = self
            .analyst
            .interpret(
                &region.mgrs,
                cloud_cover,
                summary.image_mean,
                &summary.tile_means,
            )
            .await?;

        let event = TrackerEvent {
            tracker_id: region.id.clone(),
            event_type: EVENT_TYPE_HLS.to_string(),
            gpt4_response: narrative,
            cloud_cover,
            sat_image,
            img_avg_color: summary.image_mean,
            tile_avg_color: summary.tile_means,
            bbox: scene_bbox,
        };

        // Independent sinks: delivery failures never block persistence.
        let (deliveries, appended) = tokio::join!(
            notify::fan_out(
                self.webhooks.as_ref(),
                &region.webhook_targets,
                &region.signing_secret,
                &event,
            ),
            self.events.append(&event),
        );
        let event_id = appended?;

        info!(
            event_id = %event_id,
            delivered = deliveries.iter().filter(|o| o.succeeded()).count(),
            targets = deliveries.len(),
            "Run complete"
        );

        Ok(RunOutcome {
            event_id,
            event,
            deliveries,
        })
    }

    /// Run every region with bounded concurrency, absorbing failures.
    pub async fn run_all(&self, regions: &[TrackedRegion]) -> RunTally {
        info!(
            regions = regions.len(),
            max_in_flight = self.settings.max_concurrent_regions,
            "Running all regions"
        );

        let mut tally = RunTally::default();

        let mut outcomes = stream::iter(regions.iter())
            .map(|region| async move { (region, self.run_region(region).await) })
            .buffer_unordered(self.settings.max_concurrent_regions.max(1));

        while let Some((region, result)) = outcomes.next().await {
            match result {
                Ok(outcome) => {
                    info!(
                        region = %region.id,
                        event_id = %outcome.event_id,
                        delivered = outcome.deliveries.iter().filter(|o| o.succeeded()).count(),
                        targets = outcome.deliveries.len(),
                        "Region run succeeded"
                    );
                    tally.succeeded += 1;
                }
                Err(e) => {
                    error!(region = %region.id, kind = e.kind(), error = %e, "Region run failed");
                    tally.failed += 1;
                }
            }
        }

        tally
    }

    async fn summarize_staged(&self, key: &str) -> WatchResult<RasterSummary> {
        let bytes = self.staging.get(key).await?;
        let raster = BandRaster::decode(&bytes)?;
        Ok(summarize(&raster))
    }
}
