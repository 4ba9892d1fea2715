use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{TranslateError, TranslateText};

const DEFAULT_URL: &str = "http://localhost:5000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Translation client for a LibreTranslate-compatible `POST /translate`
/// endpoint.
///
/// Configuration via environment variables:
/// - `FAQ_TRANSLATE_URL`: endpoint base URL (default `http://localhost:5000`)
/// - `FAQ_TRANSLATE_API_KEY`: API key, if the instance requires one
#[derive(Debug, Clone)]
pub struct LibreClient {
    http: Client,
    base_url: String,
    api_key: Option<ApiKey>,
}

impl LibreClient {
    pub fn from_env(http: Client) -> Self {
        let base_url = env::var("FAQ_TRANSLATE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let api_key = env::var("FAQ_TRANSLATE_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(ApiKey);
        Self {
            http,
            base_url,
            api_key,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key: None,
        }
    }

    async fn request(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let url = format!("{}/translate", self.base_url);
        let request = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_ref().map(|k| k.0.as_str()),
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
            warn!("translation API rate limited");
            return Err(TranslateError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<TranslateResponse>(&text)
                && let Some(message) = body.error
            {
                warn!(status = %status, error = %message, "translation API error");
                return Err(TranslateError::Api {
                    code: status.as_u16(),
                    message,
                });
            }
            let snippet = if text.len() > 200 { &text[..200] } else { &text };
            warn!(status = %status, "translation API error (no structured body)");
            return Err(TranslateError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {snippet}"),
            });
        }

        let body: TranslateResponse = response.json().await?;
        if let Some(message) = body.error {
            return Err(TranslateError::BadResponse(message));
        }

        let translated = body
            .translated_text
            .ok_or_else(|| TranslateError::BadResponse("missing translatedText".into()))?;
        debug!(source, target, "translation complete");
        Ok(translated)
    }
}

impl TranslateText for LibreClient {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.request(text, source, target).await {
                Ok(translated) => return Ok(translated),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient translation error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(TranslateError::RateLimited))
    }
}

fn is_retriable(e: &TranslateError) -> bool {
    matches!(
        e,
        TranslateError::RateLimited
            | TranslateError::Network(_)
            | TranslateError::Api {
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
