//! Tracked region definitions.
//!
//! Regions are owned by the upstream tracker-management system; the watcher
//! receives them read-only, one per pipeline invocation.

use serde::{Deserialize, Serialize};

/// A ground region monitored for newly available scenes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedRegion {
    /// Stable identifier carried into every event this region produces.
    pub id: String,
    /// Human-readable name, used in logs.
    #[serde(default)]
    pub name: String,
    /// 5-character MGRS reference of the watched 100 km square.
    pub mgrs: String,
    /// Webhook endpoints notified after each successful run.
    #[serde(default)]
    pub webhook_targets: Vec<String>,
    /// Shared secret sent in the signing header of every delivery.
    #[serde(default)]
    pub signing_secret: String,
}
