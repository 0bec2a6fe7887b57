//! Satellite imagery watcher.
//!
//! One invocation runs the pipeline for one region (`--region`) or for
//! every configured region, then exits; scheduling is external. Requires
//! `EARTHDATA_TOKEN` and `OPENAI_API_KEY` in the environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use scene_catalog::{CatalogConfig, HttpSceneCatalog};
use watcher::analysis::OpenAiAnalyst;
use watcher::config::{Secrets, WatcherConfig};
use watcher::events::SqliteEventStore;
use watcher::notify::HttpWebhookClient;
use watcher::pipeline::{PipelineSettings, WatchPipeline};
use watcher::staging::BandStaging;

#[derive(Parser, Debug)]
#[command(name = "watcher")]
#[command(about = "Satellite imagery watcher for tracked regions")]
struct Args {
    /// Path to the watcher configuration file
    #[arg(long, env = "WATCHER_CONFIG", default_value = "config/watcher.yaml")]
    config: PathBuf,

    /// Run a single region by id (default: all configured regions)
    #[arg(short, long)]
    region: Option<String>,

    /// Webhook delivery timeout in seconds
    #[arg(long, default_value = "30")]
    webhook_timeout: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting satellite imagery watcher");

    let config = WatcherConfig::load(&args.config)?;
    if config.regions.is_empty() {
        bail!("No regions configured in {}", args.config.display());
    }
    info!(
        regions = config.regions.len(),
        config = %args.config.display(),
        "Loaded configuration"
    );

    let secrets = Secrets::from_env()?;

    // Assemble the pipeline
    let catalog = HttpSceneCatalog::new(CatalogConfig {
        search_url: config.catalog.search_url.clone(),
        collection: config.catalog.collection.clone(),
        bearer_token: secrets.earthdata_token.clone(),
        request_timeout: Duration::from_secs(config.catalog.timeout_secs),
    });
    let analyst = OpenAiAnalyst::new(config.analysis.clone(), secrets.openai_api_key.clone());
    let webhooks = HttpWebhookClient::new(Duration::from_secs(args.webhook_timeout));
    let events = SqliteEventStore::open(Path::new(&config.events.database_path)).await?;
    let staging = BandStaging::from_config(&config.staging)?;

    let pipeline = WatchPipeline::new(
        PipelineSettings::from_config(&config),
        Arc::new(catalog),
        Arc::new(analyst),
        Arc::new(webhooks),
        Arc::new(events),
        staging,
    );

    match &args.region {
        Some(id) => {
            let region = config
                .region(id)
                .with_context(|| format!("Region {} is not configured", id))?;

            let outcome = pipeline.run_region(region).await?;
            info!(
                region = %region.id,
                event_id = %outcome.event_id,
                delivered = outcome.deliveries.iter().filter(|o| o.succeeded()).count(),
                targets = outcome.deliveries.len(),
                "Watcher run complete"
            );
        }
        None => {
            let tally = pipeline.run_all(&config.regions).await;
            info!(
                succeeded = tally.succeeded,
                failed = tally.failed,
                "Watcher run complete"
            );

            if tally.succeeded == 0 && tally.failed > 0 {
                bail!("All {} region runs failed", tally.failed);
            }
        }
    }

    Ok(())
}
