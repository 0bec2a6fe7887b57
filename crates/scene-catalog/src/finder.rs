//! Day-stepping scene search.
//!
//! The catalog indexes scenes by capture day, and a fresh capture for a given
//! cell may be several days old. The finder queries the starting day first
//! and walks backwards one calendar day per failed attempt until it finds a
//! scene or exhausts the retry cap.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use watch_common::{BoundingBox, WatchError, WatchResult};

use crate::client::SceneCatalog;
use crate::types::SceneReference;

/// Retry policy for the calendar-day search window.
#[derive(Debug, Clone)]
pub struct SearchPolicy {
    /// Additional attempts after the first, each one day earlier.
    pub max_retries: u32,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self { max_retries: 5 }
    }
}

/// Find the freshest scene intersecting `bbox`, starting at `start_day`.
///
/// Attempts are strictly sequential; an attempt must fail (transport error,
/// server error, or zero features) before the previous calendar day is
/// tried. Exhausting the cap surfaces `SceneNotFound`. A response whose
/// feature lacks a `self` link aborts the search immediately with
/// `MalformedCatalogResponse`.
pub async fn find_scene(
    catalog: &dyn SceneCatalog,
    bbox: &BoundingBox,
    start_day: NaiveDate,
    policy: &SearchPolicy,
) -> WatchResult<SceneReference> {
    let attempts = policy.max_retries + 1;
    let mut day = start_day;
    let mut oldest_day = start_day;

    for attempt in 1..=attempts {
        match catalog.search_day(bbox, day).await {
            Ok(response) => {
                if let Some(feature) = response.features.first() {
                    let href = feature.self_link().ok_or_else(|| {
                        WatchError::MalformedCatalogResponse(format!(
                            "feature for {} has no self link",
                            day
                        ))
                    })?;

                    info!(day = %day, attempt, item_url = %href, "Scene found");
                    return Ok(SceneReference {
                        item_url: href.to_string(),
                        day,
                    });
                }
                debug!(day = %day, attempt, "No scenes for day");
            }
            Err(e) => {
                warn!(day = %day, attempt, error = %e, "Catalog search attempt failed");
            }
        }

        oldest_day = day;
        if attempt < attempts {
            day = match day.pred_opt() {
                Some(previous) => previous,
                None => break,
            };
        }
    }

    Err(WatchError::SceneNotFound {
        attempts,
        oldest_day: oldest_day.to_string(),
    })
}
