//! Webhook fan-out for finished pipeline runs.
//!
//! Every target gets the full event as JSON with the region's shared secret
//! in the signing header. Deliveries run concurrently; a failed target is
//! logged and reported in the outcome list but never fails the run.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tracing::{info, warn};

use watch_common::TrackerEvent;

/// Header carrying the region's shared secret on outgoing deliveries.
pub const SIGNING_SECRET_HEADER: &str = "signing-secret";

/// Delivers one event to one webhook target.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn deliver(&self, target: &str, secret: &str, event: &TrackerEvent) -> Result<()>;
}

/// Outcome of delivering to a single target.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub target: String,
    /// `None` on success, the failure message otherwise.
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Deliver `event` to every target concurrently.
///
/// Failures are absorbed into the returned outcomes, in target order.
pub async fn fan_out(
    client: &dyn WebhookClient,
    targets: &[String],
    secret: &str,
    event: &TrackerEvent,
) -> Vec<DeliveryOutcome> {
    let deliveries = targets.iter().map(|target| async move {
        match client.deliver(target, secret, event).await {
            Ok(()) => DeliveryOutcome {
                target: target.clone(),
                error: None,
            },
            Err(e) => {
                warn!(target = %target, error = %e, "Webhook delivery failed");
                DeliveryOutcome {
                    target: target.clone(),
                    error: Some(e.to_string()),
                }
            }
        }
    });

    let outcomes = join_all(deliveries).await;

    let delivered = outcomes.iter().filter(|o| o.succeeded()).count();
    info!(
        delivered,
        failed = outcomes.len() - delivered,
        "Webhook fan-out complete"
    );

    outcomes
}

/// `WebhookClient` over HTTP.
pub struct HttpWebhookClient {
    client: Client,
}

impl HttpWebhookClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn deliver(&self, target: &str, secret: &str, event: &TrackerEvent) -> Result<()> {
        let response = self
            .client
            .post(target)
            .header(SIGNING_SECRET_HEADER, secret)
            .json(event)
            .send()
            .await?;

        response.error_for_status()?;
        Ok(())
    }
}
