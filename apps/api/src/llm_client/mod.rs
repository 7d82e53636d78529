/// LLM Client: the single point of entry for all model calls in the service.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// Everything goes through an `LlmProvider`, constructed once at startup and
/// carried in `AppState` as `Arc<dyn LlmProvider>`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
pub mod mock;
pub mod prompts;

const GEMINI_PROVIDER_NAME: &str = "Google Gemini";

/// Structured failure kinds. Providers that can tell us what went wrong set
/// the kind directly; `from_message` is the fallback for free-text errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Auth,
    Quota,
    ContentSafety,
    Timeout,
    Transport,
    EmptyResponse,
    Unknown,
}

impl ProviderErrorKind {
    /// Substring adapter over provider error text. Fragile by nature, so it
    /// only runs when the transport gave us nothing better.
    pub fn from_message(message: &str) -> Self {
        let upper = message.to_uppercase();
        if ["API_KEY", "INVALID", "PERMISSION", "UNAUTHENTICATED"]
            .iter()
            .any(|m| upper.contains(m))
        {
            ProviderErrorKind::Auth
        } else if ["QUOTA", "LIMIT", "RESOURCE_EXHAUSTED"]
            .iter()
            .any(|m| upper.contains(m))
        {
            ProviderErrorKind::Quota
        } else if ["BLOCKED", "SAFETY"].iter().any(|m| upper.contains(m)) {
            ProviderErrorKind::ContentSafety
        } else {
            ProviderErrorKind::Unknown
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::Quota | ProviderErrorKind::Timeout | ProviderErrorKind::Transport
        )
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Builds an error whose kind is inferred from its text.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ProviderErrorKind::from_message(&message),
            message,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            ProviderErrorKind::Timeout
        } else if e.is_connect() || e.is_request() {
            ProviderErrorKind::Transport
        } else {
            ProviderErrorKind::Unknown
        };
        ProviderError::new(kind, e.to_string())
    }
}

/// The single seam between the service and a hosted language model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name, used in diagnostics.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Sends one prompt and returns the raw text completion.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Settings for the Gemini client, filled from `Config` at startup.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateResponse {
    /// Joins the text parts of the first candidate, or reports why there are none.
    pub fn into_text(self) -> Result<String, ProviderError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::new(
                ProviderErrorKind::ContentSafety,
                format!("Prompt blocked: {reason}"),
            ));
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::EmptyResponse, "No candidates returned")
        })?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::new(
                ProviderErrorKind::ContentSafety,
                "Response blocked by SAFETY filter",
            ));
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::EmptyResponse,
                "LLM returned empty content",
            ));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a non-success HTTP response onto a structured error.
fn classify_http_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<GeminiError>(body)
        .map(|e| match e.error.status {
            Some(s) => format!("{s}: {}", e.error.message),
            None => e.error.message,
        })
        .unwrap_or_else(|_| body.to_string());

    let kind = match status.as_u16() {
        401 | 403 => ProviderErrorKind::Auth,
        429 => ProviderErrorKind::Quota,
        _ => ProviderErrorKind::from_message(&message),
    };
    ProviderError::new(kind, format!("API error (status {}): {message}", status.as_u16()))
}

/// Google Gemini `generateContent` client with retry on transient failures.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.model
        )
    }

    async fn attempt(&self, body: &GenerateRequest<'_>) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_http_error(status, &body);
            if status.is_server_error() {
                return Err(ProviderError::new(ProviderErrorKind::Transport, err.message));
            }
            return Err(err);
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed.into_text()
    }
}

const BASE_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 30_000;

/// 1s, 2s, 4s ... before retry `attempt` (1-based), capped at 30s.
fn backoff_delay(attempt: u32) -> Duration {
    let ms = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| factor.checked_mul(BASE_BACKOFF_MS))
        .map_or(MAX_BACKOFF_MS, |ms| ms.min(MAX_BACKOFF_MS));
    Duration::from_millis(ms)
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn name(&self) -> &str {
        GEMINI_PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    /// Retries on rate limits, timeouts, transport and 5xx failures with
    /// exponential backoff. Everything else is returned on first sight.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        };

        let attempts = self.settings.max_retries.max(1);
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&body).await {
                Ok(text) => {
                    debug!("LLM call succeeded: {} chars", text.len());
                    return Ok(text);
                }
                Err(e) if e.kind.is_retryable() => {
                    warn!("LLM call failed ({:?}): {}", e.kind, e.message);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::new(ProviderErrorKind::Unknown, "LLM call failed without an error")
        }))
    }
}
