use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EmbedError, EmbedText};

const DEFAULT_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "nomic-embed-text";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Option<Vec<Vec<f32>>>,
    error: Option<String>,
}

/// Embedding client for an Ollama-compatible `POST /api/embed` endpoint.
///
/// Configuration via environment variables:
/// - `FAQ_EMBED_URL`: endpoint base URL (default `http://localhost:11434`)
/// - `FAQ_EMBED_MODEL`: embedding model name (default `nomic-embed-text`)
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn from_env(http: Client) -> Self {
        let base_url = env_or("FAQ_EMBED_URL", DEFAULT_URL);
        let model = env_or("FAQ_EMBED_MODEL", DEFAULT_MODEL);
        Self {
            http,
            base_url,
            model,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .http
            .post(&url)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("embedding API rate limited");
            return Err(EmbedError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet = if text.len() > 200 { &text[..200] } else { &text };
            warn!(status = %status, "embedding API error");
            return Err(EmbedError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {snippet}"),
            });
        }

        let body: EmbedResponse = response.json().await?;
        if let Some(message) = body.error {
            return Err(EmbedError::BadResponse(message));
        }

        let embeddings = body
            .embeddings
            .ok_or_else(|| EmbedError::BadResponse("missing embeddings array".into()))?;
        if embeddings.len() != texts.len() {
            return Err(EmbedError::BadResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        debug!(model = %self.model, count = embeddings.len(), "embedding batch complete");
        Ok(embeddings)
    }
}

impl EmbedText for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyBatch);
        }

        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient embedding error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(EmbedError::RateLimited))
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn is_retriable(e: &EmbedError) -> bool {
    matches!(
        e,
        EmbedError::RateLimited
            | EmbedError::Network(_)
            | EmbedError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}
