//! Language-model interpretation of band statistics.
//!
//! One chat-completion request per run, built from a fixed two-role prompt.
//! Failures here are terminal for the invocation; unlike the scene search
//! there is no retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use watch_common::{WatchError, WatchResult};

use crate::config::AnalysisSection;

/// Produces a free-text narrative for one scene's statistics.
#[async_trait]
pub trait SceneAnalyst: Send + Sync {
    async fn interpret(
        &self,
        cell: &str,
        cloud_cover_pct: f64,
        image_mean: f64,
        tile_means: &[f64],
    ) -> WatchResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

fn system_prompt(cell: &str) -> String {
    format!(
        "You are a satellite. You are looking at Red-Edge of a part of the Earth's \
         surface at MGRS {}. Your task is to take the average darkness of the image \
         and the average darkness of the tiles and come up with reasonable \
         explanations for what you are seeing.",
        cell
    )
}

fn user_prompt(cloud_cover_pct: f64, image_mean: f64, tile_means: &[f64]) -> String {
    let means = tile_means
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "This image has a cloud cover level of {}%. The average darkness of the \
         image is {}. The average darkness of the {} tiles in this image is {}.",
        cloud_cover_pct,
        image_mean,
        tile_means.len(),
        means
    )
}

/// `SceneAnalyst` over the OpenAI chat-completions API.
pub struct OpenAiAnalyst {
    client: Client,
    config: AnalysisSection,
    api_key: String,
}

impl OpenAiAnalyst {
    pub fn new(config: AnalysisSection, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            api_key,
        }
    }
}

#[async_trait]
impl SceneAnalyst for OpenAiAnalyst {
    #[instrument(skip(self, tile_means), fields(cell = %cell, tiles = tile_means.len()))]
    async fn interpret(
        &self,
        cell: &str,
        cloud_cover_pct: f64,
        image_mean: f64,
        tile_means: &[f64],
    ) -> WatchResult<String> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(cell),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(cloud_cover_pct, image_mean, tile_means),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            presence_penalty: self.config.presence_penalty,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| WatchError::AnalysisUnavailable(format!("completion request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::AnalysisUnavailable(format!(
                "completion returned {}",
                status
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| WatchError::AnalysisUnavailable(format!("completion body: {}", e)))?;

        let narrative = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                WatchError::AnalysisUnavailable("completion had no choices".to_string())
            })?;

        debug!(chars = narrative.len(), "Received interpretation");
        Ok(narrative)
    }
}
