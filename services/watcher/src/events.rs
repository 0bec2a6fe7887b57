//! Append-only event log backed by SQLite.
//!
//! Every successful pipeline run appends exactly one row; nothing updates
//! or deletes rows afterwards. The read side exists for inspection and
//! tests, the pipeline itself only appends.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use watch_common::{TrackerEvent, WatchError, WatchResult};

/// One persisted pipeline event.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: String,
    pub event: TrackerEvent,
    pub created_at: DateTime<Utc>,
}

/// Durable store of pipeline events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event, returning its freshly assigned id.
    async fn append(&self, event: &TrackerEvent) -> WatchResult<String>;

    /// Most recent events for a region, newest first.
    async fn events_for_region(&self, tracker_id: &str, limit: u32)
        -> WatchResult<Vec<StoredEvent>>;
}

/// `EventStore` over a SQLite database file.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Open or create the event database at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to open event database")?;

        init_schema(&pool).await?;

        info!(path = %path.display(), "Opened event database");

        Ok(Self { pool })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        // A second connection would see a fresh empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        init_schema(&pool).await?;

        Ok(Self { pool })
    }
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            tracker_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            gpt4_response TEXT NOT NULL,
            sat_image TEXT NOT NULL,
            cloud_cover REAL NOT NULL,
            img_avg_color REAL NOT NULL,
            tile_avg_color TEXT NOT NULL,
            bbox TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_tracker ON events(tracker_id)")
        .execute(pool)
        .await?;

    Ok(())
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn append(&self, event: &TrackerEvent) -> WatchResult<String> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        let tile_avg_color = serde_json::to_string(&event.tile_avg_color)
            .map_err(|e| WatchError::StorageFailure(format!("encode tile means: {}", e)))?;
        let bbox = serde_json::to_string(&event.bbox)
            .map_err(|e| WatchError::StorageFailure(format!("encode bbox: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO events (
                id, tracker_id, event_type, gpt4_response, sat_image,
                cloud_cover, img_avg_color, tile_avg_color, bbox, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&event.tracker_id)
        .bind(&event.event_type)
        .bind(&event.gpt4_response)
        .bind(&event.sat_image)
        .bind(event.cloud_cover)
        .bind(event.img_avg_color)
        .bind(&tile_avg_color)
        .bind(&bbox)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| WatchError::StorageFailure(format!("append event: {}", e)))?;

        debug!(event_id = %id, tracker = %event.tracker_id, "Recorded event");
        Ok(id)
    }

    async fn events_for_region(
        &self,
        tracker_id: &str,
        limit: u32,
    ) -> WatchResult<Vec<StoredEvent>> {
        let rows: Vec<(
            String,
            String,
            String,
            String,
            String,
            f64,
            f64,
            String,
            String,
            String,
        )> = sqlx::query_as(
            r#"
            SELECT id, tracker_id, event_type, gpt4_response, sat_image,
                   cloud_cover, img_avg_color, tile_avg_color, bbox, created_at
            FROM events
            WHERE tracker_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(tracker_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WatchError::StorageFailure(format!("query events: {}", e)))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let tile_avg_color: Vec<f64> = serde_json::from_str(&row.7)
                .map_err(|e| WatchError::StorageFailure(format!("decode tile means: {}", e)))?;
            let bbox: [[f64; 2]; 2] = serde_json::from_str(&row.8)
                .map_err(|e| WatchError::StorageFailure(format!("decode bbox: {}", e)))?;

            events.push(StoredEvent {
                id: row.0,
                event: TrackerEvent {
                    tracker_id: row.1,
                    event_type: row.2,
                    gpt4_response: row.3,
                    sat_image: row.4,
                    cloud_cover: row.5,
                    img_avg_color: row.6,
                    tile_avg_color,
                    bbox,
                },
                created_at: DateTime::parse_from_rfc3339(&row.9)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            });
        }

        Ok(events)
    }
}
