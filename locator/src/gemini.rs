//! Gemini-backed comment locator.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{LocatorError, Result};
use crate::locator::{CommentLocator, LocatedSpan};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Upper bound on a server-requested retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "\
You place review comments inside a paragraph of a legal document.
For every comment, pick the shortest span of the paragraph it refers to and
return its first few words as \"start\" and its last few words as \"end\".
Both must be copied exactly, character for character, from the paragraph.
If a comment concerns the whole paragraph or cannot be placed, return empty
strings for both.
Answer with a JSON array holding one {\"start\", \"end\"} object per comment,
in the order the comments were given, and nothing else.";

/// Locates comments with the Gemini `generateContent` API.
pub struct GeminiLocator {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    model: String,

    /// Per-request timeout.
    timeout: Duration,

    /// Attempts per call, including the first.
    max_attempts: u32,

    /// Delay before the first retry; doubled on each further retry.
    retry_backoff: Duration,
}

impl GeminiLocator {
    /// Create a locator reading its key from `GOOGLE_API_KEY`.
    pub fn new() -> Self {
        Self::from_env(API_KEY_ENV)
    }

    /// Create a locator reading its key from the given variable.
    pub fn from_env(var: &str) -> Self {
        Self {
            api_key: std::env::var(var).ok().filter(|key| !key.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of attempts per call (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(paragraph_text: &str, comments: &[String]) -> serde_json::Value {
        let input = serde_json::json!({
            "paragraph": paragraph_text,
            "comments": comments,
        });
        serde_json::json!({
            "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]},
            "contents": [{"role": "user", "parts": [{"text": input.to_string()}]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.0
            }
        })
    }

    async fn call(&self, api_key: &str, body: &serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);

            return Err(LocatorError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LocatorError::ApiRequest {
                status: status.as_u16(),
                message,
            });
        }

        let result: GenerateContentResponse = response.json().await?;
        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(LocatorError::InvalidResponse("no text in response".to_string()));
        }
        Ok(text)
    }

    fn retry_delay(&self, attempt: u32, error: &LocatorError) -> Duration {
        match error {
            LocatorError::RateLimited { retry_after_secs } if *retry_after_secs > 0 => {
                Duration::from_secs(*retry_after_secs).min(MAX_RETRY_DELAY)
            }
            _ => self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1))),
        }
    }
}

impl Default for GeminiLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentLocator for GeminiLocator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn locate(&self, paragraph_text: &str, comments: &[String]) -> Result<Vec<LocatedSpan>> {
        if comments.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(LocatorError::ProviderNotConfigured)?;

        debug!("Locating {} comments with model: {}", comments.len(), self.model);
        let body = Self::request_body(paragraph_text, comments);

        let mut attempt = 1;
        let text = loop {
            match self.call(api_key, &body).await {
                Ok(text) => break text,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.retry_delay(attempt, &e);
                    warn!("Locator attempt {attempt}/{} failed: {e}, retrying in {delay:?}", self.max_attempts);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let spans = parse_spans(&text)?;
        if spans.len() != comments.len() {
            return Err(LocatorError::InvalidResponse(format!(
                "expected {} locations, got {}",
                comments.len(),
                spans.len()
            )));
        }
        info!(
            "Located {} of {} comments",
            spans.iter().filter(|span| !span.is_empty()).count(),
            spans.len()
        );
        Ok(spans)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Parse the model's answer: a JSON array of spans, or an object wrapping
/// one under `locations`, optionally inside a code fence.
pub fn parse_spans(text: &str) -> Result<Vec<LocatedSpan>> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(text))?;
    let list = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(mut map) => map
            .remove("locations")
            .ok_or_else(|| LocatorError::InvalidResponse("object without `locations`".to_string()))?,
        other => {
            return Err(LocatorError::InvalidResponse(format!("unexpected JSON value: {other}")));
        }
    };
    Ok(serde_json::from_value(list)?)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
