//! Event payload shared by webhook delivery and the durable event log.

use serde::{Deserialize, Serialize};

/// Event-type tag carried by every scene-analysis event.
pub const EVENT_TYPE_HLS: &str = "hls";

/// One completed scene analysis for a tracked region.
///
/// Serialized with camelCase field names; this exact shape is what webhook
/// subscribers receive and what the event log stores. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerEvent {
    /// Owning region's identifier.
    pub tracker_id: String,
    /// Fixed event-type tag, `EVENT_TYPE_HLS` for this pipeline.
    pub event_type: String,
    /// The model's free-text narrative.
    pub gpt4_response: String,
    /// Cloud-cover percentage, 0-100, rounded to two decimals.
    pub cloud_cover: f64,
    /// Resolved preview image URL for the scene.
    pub sat_image: String,
    /// Whole-image mean band value.
    pub img_avg_color: f64,
    /// Per-tile mean band values in tiler scan order.
    pub tile_avg_color: Vec<f64>,
    /// Scene bounding box as two corner points, lower-left then upper-right,
    /// each in longitude/latitude order.
    pub bbox: [[f64; 2]; 2],
}
