#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::{Embedder, Generator, same_model};
use crate::config::{Config, ConfigError};

/// Output size of all-MiniLM-L6-v2
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Sampling options forwarded verbatim to `/api/generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Context window in tokens
    pub num_ctx: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl Default for GenerationOptions {
    #[inline]
    fn default() -> Self {
        Self {
            num_ctx: 1200,
            temperature: 0.2,
            top_k: 40,
            top_p: 0.8,
            repeat_penalty: 1.1,
        }
    }
}

impl GenerationOptions {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_ctx == 0 {
            return Err(ConfigError::InvalidContextWindow(self.num_ctx));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK(self.top_k as usize));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::InvalidTopP(self.top_p));
        }
        if self.repeat_penalty <= 0.0 || self.repeat_penalty.is_nan() {
            return Err(ConfigError::InvalidRepeatPenalty(self.repeat_penalty));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    batch_size: u32,
    expected_dimension: Option<usize>,
    options: GenerationOptions,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            embedding_model: config.ollama.embedding_model.clone(),
            generation_model: config.ollama.generation_model.clone(),
            batch_size: config.ollama.batch_size.max(1),
            expected_dimension: Some(config.ollama.embedding_dimension as usize),
            options: config.generation.clone(),
            agent: build_agent(request_timeout(config.ollama.request_timeout_seconds)),
            retry_attempts: config.ollama.retry_attempts.max(1),
        })
    }

    /// Embed with `model` instead of the configured one. The configured
    /// `embedding_dimension` belongs to the configured model, so it is only
    /// enforced when `model` names that same model.
    #[inline]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !same_model(&model, &self.embedding_model) {
            self.expected_dimension = None;
        }
        self.embedding_model = model;
        self
    }

    #[inline]
    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let (status, body) = self
            .post_json(&url, &request_json)
            .context("Failed to generate embeddings")?;

        if !is_success(status) {
            bail!("Ollama returned HTTP {} for embeddings: {}", status, body);
        }

        let response: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;

        if response.embeddings.len() != texts.len() {
            bail!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            );
        }

        if let Some(expected) = self.expected_dimension {
            if let Some(bad) = response.embeddings.iter().find(|v| v.len() != expected) {
                bail!(
                    "Model '{}' returned {}-dimensional vectors but embedding_dimension is {}",
                    self.embedding_model,
                    bad.len(),
                    expected
                );
            }
        }

        Ok(response.embeddings)
    }

    fn post_json(&self, url: &Url, body: &str) -> Result<(u16, String)> {
        self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(body)
                .and_then(|mut resp| {
                    let status = resp.status().as_u16();
                    resp.body_mut().read_to_string().map(|text| (status, text))
                })
        })
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<(u16, String)>
    where
        F: FnMut() -> Result<(u16, String), ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok((status, body)) if status >= 500 && attempt < self.retry_attempts => {
                    warn!(
                        "Server error (status {}), attempt {}/{}",
                        status, attempt, self.retry_attempts
                    );
                    last_error = Some(anyhow!("Server error: HTTP {}: {}", status, body));
                }
                Ok(response) => {
                    debug!("Request completed on attempt {}", attempt);
                    return Ok(response);
                }
                Err(error) => match error {
                    ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_) => {
                        warn!(
                            "Transport error: {}, attempt {}/{}",
                            error, attempt, self.retry_attempts
                        );
                        last_error = Some(anyhow!("Request error: {}", error));
                    }
                    _ => {
                        warn!("Non-retryable error: {}", error);
                        return Err(anyhow!("Non-retryable error: {}", error));
                    }
                },
            }

            if attempt < self.retry_attempts {
                let delay = Duration::from_millis(EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000);
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All request attempts failed for {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow!("Request failed after retries")))
    }
}

impl Embedder for OllamaClient {
    #[inline]
    fn model_name(&self) -> &str {
        &self.embedding_model
    }

    /// Embed texts in batches of the configured size
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            let batch_vectors = self
                .embed_single_batch(batch)
                .with_context(|| format!("Failed to process batch of {} texts", batch.len()))?;
            vectors.extend(batch_vectors);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }
}

impl Generator for OllamaClient {
    /// Returns the `response` field of the reply. Any other payload, including
    /// HTTP error bodies, is returned verbatim so the caller sees what the
    /// service actually said.
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generation URL")?;

        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
            options: &self.options,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        debug!(
            "Sending prompt of {} chars to model {}",
            prompt.len(),
            self.generation_model
        );

        let (status, body) = self
            .post_json(&url, &request_json)
            .context("Failed to reach generation service")?;

        Ok(extract_completion(status, body))
    }
}

/// Pull the completion text out of a `/api/generate` reply, falling back to
/// the raw payload
fn extract_completion(status: u16, body: String) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();

    if let Some(text) = parsed
        .as_ref()
        .and_then(|value| value.get("response"))
        .and_then(serde_json::Value::as_str)
    {
        if !is_success(status) {
            warn!("Generation service returned HTTP {} with a response", status);
        }
        return text.to_string();
    }

    warn!(
        "Generation service returned HTTP {} without a response field, returning raw payload",
        status
    );
    body
}

fn request_timeout(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(timeout)
        .http_status_as_error(false)
        .build()
        .into()
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

