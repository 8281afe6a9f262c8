//! Ollama HTTP client
//!
//! Talks to a local Ollama server: `POST /api/generate` for completions and
//! `GET /api/tags` to check the model has been pulled.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use speechrag_core::config::LlmSettings;
use speechrag_core::traits::Answerer;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Ollama HTTP error: {0}")]
    Http(String),
    #[error("Ollama returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Ollama server not reachable at {0}")]
    ServerUnavailable(String),
    #[error("Model '{model}' is not available (pulled: {available:?})")]
    ModelMissing { model: String, available: Vec<String> },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl From<reqwest::Error> for OllamaError {
    fn from(e: reqwest::Error) -> Self {
        OllamaError::Http(e.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}

/// `mistral` matches `mistral` and `mistral:latest`; an explicit tag must
/// match exactly.
pub fn model_available(model: &str, tags: &[ModelTag]) -> bool {
    tags.iter().any(|t| {
        t.name == model || (!model.contains(':') && t.name.strip_suffix(":latest") == Some(model))
    })
}

#[derive(Clone)]
pub struct OllamaAnswerer {
    http: Client,
    base_url: String,
    model: String,
    temperature: f32,
    name: String,
}

impl OllamaAnswerer {
    pub fn new(settings: &LlmSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            name: format!("ollama:{}", settings.model),
        })
    }

    pub fn base_url(&self) -> &str { &self.base_url }
    pub fn model(&self) -> &str { &self.model }

    pub async fn complete(&self, prompt: &str) -> Result<String, OllamaError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.temperature },
        };
        let started = Instant::now();
        let resp = self.http.post(format!("{}/api/generate", self.base_url)).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "ollama generate failed");
            return Err(OllamaError::Status { status: status.as_u16(), body });
        }
        let parsed: GenerateResponse = resp.json().await.map_err(|e| OllamaError::Deserialize(e.to_string()))?;
        let ms = started.elapsed().as_millis() as u64;
        debug!(model = %self.model, ms, done = parsed.done, chars = parsed.response.len(), "ollama generate");
        Ok(parsed.response)
    }

    pub async fn list_models(&self) -> Result<Vec<ModelTag>, OllamaError> {
        let resp = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|_| OllamaError::ServerUnavailable(self.base_url.clone()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OllamaError::Status { status: status.as_u16(), body });
        }
        let tags: TagsResponse = resp.json().await.map_err(|e| OllamaError::Deserialize(e.to_string()))?;
        Ok(tags.models)
    }
}

#[async_trait]
impl Answerer for OllamaAnswerer {
    fn name(&self) -> &str { &self.name }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.complete(prompt).await?)
    }

    async fn ready(&self) -> anyhow::Result<()> {
        let models = self.list_models().await?;
        if !model_available(&self.model, &models) {
            return Err(OllamaError::ModelMissing {
                model: self.model.clone(),
                available: models.into_iter().map(|m| m.name).collect(),
            }
            .into());
        }
        info!(base_url = %self.base_url, model = %self.model, "ollama ready");
        Ok(())
    }
}
