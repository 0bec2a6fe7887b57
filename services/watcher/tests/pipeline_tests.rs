//! End-to-end pipeline tests over scripted collaborators.
//!
//! The catalog, analyst, and webhook client are in-process fakes; staging
//! and the event log use their in-memory backends. Only the pipeline code
//! itself is real.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use tiff::encoder::{colortype, TiffEncoder};

use scene_catalog::{CatalogItem, Feature, Link, SceneCatalog, SearchPolicy, SearchResponse};
use watch_common::{BoundingBox, TrackedRegion, TrackerEvent, WatchError, WatchResult};
use watcher::analysis::SceneAnalyst;
use watcher::events::{EventStore, SqliteEventStore};
use watcher::notify::WebhookClient;
use watcher::pipeline::{PipelineSettings, WatchPipeline};
use watcher::staging::BandStaging;

const ITEM_URL: &str = "https://catalog.test/items/scene-1";
const PREVIEW_FINAL_URL: &str = "https://assets.test/browse-final.jpg";
const NARRATIVE: &str = "Bright fields with a dark river crossing the west tiles.";

// ============================================================================
// Scripted collaborators
// ============================================================================

/// Catalog fake: zero-feature days followed by one fixed scene.
struct ScriptedCatalog {
    empty_days: usize,
    item: CatalogItem,
    band_bytes: Bytes,
    days_searched: Mutex<Vec<NaiveDate>>,
}

#[async_trait]
impl SceneCatalog for ScriptedCatalog {
    async fn search_day(
        &self,
        _bbox: &BoundingBox,
        day: NaiveDate,
    ) -> WatchResult<SearchResponse> {
        let mut days = self.days_searched.lock().unwrap();
        days.push(day);

        if days.len() <= self.empty_days {
            return Ok(SearchResponse::default());
        }

        Ok(SearchResponse {
            features: vec![Feature {
                links: vec![Link {
                    rel: "self".to_string(),
                    href: ITEM_URL.to_string(),
                }],
            }],
        })
    }

    async fn fetch_item(&self, item_url: &str) -> WatchResult<CatalogItem> {
        assert_eq!(item_url, ITEM_URL);
        Ok(self.item.clone())
    }

    async fn resolve_preview(&self, href: &str) -> WatchResult<String> {
        assert_eq!(href, "https://assets.test/browse.jpg");
        Ok(PREVIEW_FINAL_URL.to_string())
    }

    async fn fetch_band(&self, href: &str) -> WatchResult<Bytes> {
        assert_eq!(href, "https://assets.test/B07.tif");
        Ok(self.band_bytes.clone())
    }
}

/// Analyst fake returning a fixed narrative and recording its inputs.
struct FixedAnalyst {
    calls: Mutex<Vec<(String, f64, f64, Vec<f64>)>>,
}

#[async_trait]
impl SceneAnalyst for FixedAnalyst {
    async fn interpret(
        &self,
        cell: &str,
        cloud_cover_pct: f64,
        image_mean: f64,
        tile_means: &[f64],
    ) -> WatchResult<String> {
        self.calls.lock().unwrap().push((
            cell.to_string(),
            cloud_cover_pct,
            image_mean,
            tile_means.to_vec(),
        ));
        Ok(NARRATIVE.to_string())
    }
}

/// Webhook fake failing configured targets and recording the rest.
struct RecordingWebhooks {
    fail_targets: Vec<String>,
    deliveries: Mutex<Vec<(String, String, TrackerEvent)>>,
}

#[async_trait]
impl WebhookClient for RecordingWebhooks {
    async fn deliver(
        &self,
        target: &str,
        secret: &str,
        event: &TrackerEvent,
    ) -> anyhow::Result<()> {
        if self.fail_targets.iter().any(|t| t == target) {
            anyhow::bail!("delivery refused");
        }
        self.deliveries.lock().unwrap().push((
            target.to_string(),
            secret.to_string(),
            event.clone(),
        ));
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// 732x732 Gray16 GeoTIFF whose four 366x366 quadrants hold the constants
/// 10/20/30/40, giving tile means [10, 20, 30, 40] in scan order.
fn quadrant_tiff() -> Bytes {
    let (width, height) = (732u32, 732u32);
    let mut samples = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let value: u16 = match (x < 366, y < 366) {
                (true, true) => 10,
                (true, false) => 20,
                (false, true) => 30,
                (false, false) => 40,
            };
            samples.push(value);
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    TiffEncoder::new(&mut cursor)
        .unwrap()
        .write_image::<colortype::Gray16>(width, height, &samples)
        .unwrap();
    Bytes::from(cursor.into_inner())
}

fn scripted_item(cloud_fraction: f64) -> CatalogItem {
    serde_json::from_value(serde_json::json!({
        "properties": { "eo:cloud_cover": cloud_fraction },
        "assets": {
            "browse": { "href": "https://assets.test/browse.jpg" },
            "B07": { "href": "https://assets.test/B07.tif" }
        },
        "bbox": [-122.9, 37.0, -122.0, 37.9]
    }))
    .unwrap()
}

fn region(id: &str, targets: &[&str]) -> TrackedRegion {
    TrackedRegion {
        id: id.to_string(),
        name: "North field".to_string(),
        mgrs: "10SEG".to_string(),
        webhook_targets: targets.iter().map(|t| t.to_string()).collect(),
        signing_secret: "shh".to_string(),
    }
}

struct Harness {
    pipeline: WatchPipeline,
    store: SqliteEventStore,
    catalog: Arc<ScriptedCatalog>,
    analyst: Arc<FixedAnalyst>,
    webhooks: Arc<RecordingWebhooks>,
}

async fn harness(
    staging: BandStaging,
    item: CatalogItem,
    band_bytes: Bytes,
    empty_days: usize,
    fail_targets: &[&str],
) -> Harness {
    let catalog = Arc::new(ScriptedCatalog {
        empty_days,
        item,
        band_bytes,
        days_searched: Mutex::new(Vec::new()),
    });
    let analyst = Arc::new(FixedAnalyst {
        calls: Mutex::new(Vec::new()),
    });
    let webhooks = Arc::new(RecordingWebhooks {
        fail_targets: fail_targets.iter().map(|t| t.to_string()).collect(),
        deliveries: Mutex::new(Vec::new()),
    });
    let store = SqliteEventStore::open_memory().await.unwrap();

    let settings = PipelineSettings {
        band: "B07".to_string(),
        preview_asset: "browse".to_string(),
        policy: SearchPolicy { max_retries: 5 },
        max_concurrent_regions: 2,
    };

    let pipeline = WatchPipeline::new(
        settings,
        catalog.clone(),
        analyst.clone(),
        webhooks.clone(),
        Arc::new(store.clone()),
        staging,
    );

    Harness {
        pipeline,
        store,
        catalog,
        analyst,
        webhooks,
    }
}

/// Count regular files under a directory, recursively.
fn count_files(dir: &std::path::Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files(&path);
            } else {
                count += 1;
            }
        }
    }
    count
}

// ============================================================================
// Successful runs
// ============================================================================

#[tokio::test]
async fn test_successful_run_builds_delivers_and_records_the_event() {
    let h = harness(
        BandStaging::memory(),
        scripted_item(0.12),
        quadrant_tiff(),
        0,
        &[],
    )
    .await;
    let region = region("trk-field", &["https://hooks.test/a", "https://hooks.test/b"]);

    let outcome = h.pipeline.run_region(&region).await.unwrap();

    // The event carries the statistics, narrative, and resolved preview.
    assert_eq!(outcome.event.tracker_id, "trk-field");
    assert_eq!(outcome.event.event_type, "hls");
    assert_eq!(outcome.event.cloud_cover, 12.0);
    assert_eq!(outcome.event.img_avg_color, 25.0);
    assert_eq!(outcome.event.tile_avg_color, vec![10.0, 20.0, 30.0, 40.0]);
    assert_eq!(outcome.event.sat_image, PREVIEW_FINAL_URL);
    assert_eq!(outcome.event.gpt4_response, NARRATIVE);
    assert_eq!(outcome.event.bbox, [[-122.9, 37.0], [-122.0, 37.9]]);

    // The analyst saw the same numbers the event carries.
    let calls = h.analyst.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "10SEG");
    assert_eq!(calls[0].1, 12.0);
    assert_eq!(calls[0].2, 25.0);
    assert_eq!(calls[0].3, vec![10.0, 20.0, 30.0, 40.0]);

    // Both targets were delivered to with the region's secret.
    let deliveries = h.webhooks.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.iter().all(|(_, secret, e)| {
        secret == "shh" && *e == outcome.event
    }));

    // Exactly one record, matching the returned id.
    let stored = h.store.events_for_region("trk-field", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, outcome.event_id);
    assert_eq!(stored[0].event, outcome.event);
}

#[tokio::test]
async fn test_scene_found_after_empty_days_steps_backwards() {
    let h = harness(
        BandStaging::memory(),
        scripted_item(0.12),
        quadrant_tiff(),
        2,
        &[],
    )
    .await;
    let region = region("trk-field", &[]);

    let outcome = h.pipeline.run_region(&region).await.unwrap();
    assert_eq!(outcome.event.cloud_cover, 12.0);

    // Two empty days then the hit, each exactly one day earlier.
    let days = h.catalog.days_searched.lock().unwrap();
    assert_eq!(days.len(), 3);
    for pair in days.windows(2) {
        assert_eq!(pair[0].pred_opt().unwrap(), pair[1]);
    }
}

#[tokio::test]
async fn test_partial_webhook_failure_still_persists_the_event() {
    let h = harness(
        BandStaging::memory(),
        scripted_item(0.5),
        quadrant_tiff(),
        0,
        &["https://hooks.test/bad"],
    )
    .await;
    let region = region(
        "trk-field",
        &[
            "https://hooks.test/a",
            "https://hooks.test/bad",
            "https://hooks.test/b",
        ],
    );

    let outcome = h.pipeline.run_region(&region).await.unwrap();

    // Outcomes in target order, failure absorbed.
    assert_eq!(outcome.deliveries.len(), 3);
    assert!(outcome.deliveries[0].succeeded());
    assert!(!outcome.deliveries[1].succeeded());
    assert!(outcome.deliveries[2].succeeded());
    assert_eq!(outcome.deliveries[1].target, "https://hooks.test/bad");

    // The two healthy targets were reached.
    assert_eq!(h.webhooks.deliveries.lock().unwrap().len(), 2);

    // Exactly one event record regardless of the failed delivery.
    let stored = h.store.events_for_region("trk-field", 10).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_staged_band_is_removed_after_a_successful_run() {
    let dir = tempfile::tempdir().unwrap();
    let staging = BandStaging::from_config(&watcher::config::StagingSection {
        backend: "filesystem".to_string(),
        root: dir.path().to_string_lossy().into_owned(),
        bucket: String::new(),
    })
    .unwrap();

    let h = harness(staging, scripted_item(0.12), quadrant_tiff(), 0, &[]).await;
    h.pipeline.run_region(&region("trk-field", &[])).await.unwrap();

    assert_eq!(count_files(dir.path()), 0);
}

// ============================================================================
// Failing runs
// ============================================================================

#[tokio::test]
async fn test_six_empty_days_fail_with_scene_not_found_and_no_side_effects() {
    let h = harness(
        BandStaging::memory(),
        scripted_item(0.12),
        quadrant_tiff(),
        usize::MAX,
        &[],
    )
    .await;
    let region = region("trk-field", &["https://hooks.test/a"]);

    let err = h.pipeline.run_region(&region).await.unwrap_err();
    match err {
        WatchError::SceneNotFound { attempts, .. } => assert_eq!(attempts, 6),
        other => panic!("expected SceneNotFound, got {other:?}"),
    }

    // Exactly six days were tried, each one day earlier than the last,
    // starting from today.
    let days = h.catalog.days_searched.lock().unwrap();
    assert_eq!(days.len(), 6);
    for pair in days.windows(2) {
        assert_eq!(pair[0].pred_opt().unwrap(), pair[1]);
    }
    let today = Utc::now().date_naive();
    assert!(days[0] == today || days[0] == today.pred_opt().unwrap());

    // Nothing delivered, nothing persisted.
    assert!(h.webhooks.deliveries.lock().unwrap().is_empty());
    assert!(h
        .store
        .events_for_region("trk-field", 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_undecodable_band_fails_the_run_and_cleans_staging() {
    let dir = tempfile::tempdir().unwrap();
    let staging = BandStaging::from_config(&watcher::config::StagingSection {
        backend: "filesystem".to_string(),
        root: dir.path().to_string_lossy().into_owned(),
        bucket: String::new(),
    })
    .unwrap();

    let h = harness(
        staging,
        scripted_item(0.12),
        Bytes::from_static(b"definitely not a tiff"),
        0,
        &[],
    )
    .await;
    let region = region("trk-field", &["https://hooks.test/a"]);

    let err = h.pipeline.run_region(&region).await.unwrap_err();
    assert!(matches!(err, WatchError::RasterReadError(_)));

    // The staged bytes were still removed.
    assert_eq!(count_files(dir.path()), 0);

    assert!(h.webhooks.deliveries.lock().unwrap().is_empty());
    assert!(h
        .store
        .events_for_region("trk-field", 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_item_without_band_asset_is_unavailable() {
    let item: CatalogItem = serde_json::from_value(serde_json::json!({
        "properties": { "eo:cloud_cover": 0.12 },
        "assets": {
            "browse": { "href": "https://assets.test/browse.jpg" }
        },
        "bbox": [-122.9, 37.0, -122.0, 37.9]
    }))
    .unwrap();

    let h = harness(BandStaging::memory(), item, quadrant_tiff(), 0, &[]).await;

    let err = h
        .pipeline
        .run_region(&region("trk-field", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::AssetUnavailable(_)));
}

#[tokio::test]
async fn test_item_without_cloud_cover_is_unavailable() {
    let item: CatalogItem = serde_json::from_value(serde_json::json!({
        "properties": {},
        "assets": {
            "browse": { "href": "https://assets.test/browse.jpg" },
            "B07": { "href": "https://assets.test/B07.tif" }
        },
        "bbox": [-122.9, 37.0, -122.0, 37.9]
    }))
    .unwrap();

    let h = harness(BandStaging::memory(), item, quadrant_tiff(), 0, &[]).await;

    let err = h
        .pipeline
        .run_region(&region("trk-field", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::AssetUnavailable(_)));
}

// ============================================================================
// Multi-region runs
// ============================================================================

#[tokio::test]
async fn test_run_all_absorbs_individual_region_failures() {
    let h = harness(
        BandStaging::memory(),
        scripted_item(0.12),
        quadrant_tiff(),
        0,
        &[],
    )
    .await;

    let good = region("trk-good", &[]);
    let mut bad = region("trk-bad", &[]);
    bad.mgrs = "10SIO".to_string(); // I and O never appear in grid letters

    let tally = h.pipeline.run_all(&[good, bad]).await;
    assert_eq!(tally.succeeded, 1);
    assert_eq!(tally.failed, 1);

    // Only the good region produced a record.
    assert_eq!(
        h.store.events_for_region("trk-good", 10).await.unwrap().len(),
        1
    );
    assert!(h
        .store
        .events_for_region("trk-bad", 10)
        .await
        .unwrap()
        .is_empty());
}
