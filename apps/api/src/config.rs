use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::GeminiSettings;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_AI_MODEL: &str = "gemini-1.5-flash";

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a number does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means the in-memory stores.
    pub database_url: Option<String>,
    /// Unset disables the suggestion cache.
    pub redis_url: Option<String>,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub ai_model: String,
    pub ai_timeout: Duration,
    pub ai_retry_attempts: u32,
    pub ai_max_tokens: u32,
    pub ai_temperature: f32,
    pub ai_cache_ttl: Duration,
    pub context_retention_days: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            redis_url: optional_env("REDIS_URL"),
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_api_base: optional_env("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            ai_model: optional_env("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            ai_timeout: Duration::from_secs(parse_env("AI_TIMEOUT_SECS", 30)?),
            ai_retry_attempts: parse_env("AI_RETRY_ATTEMPTS", 3)?,
            ai_max_tokens: parse_env("AI_MAX_TOKENS", 800)?,
            ai_temperature: parse_env("AI_TEMPERATURE", 0.7)?,
            ai_cache_ttl: Duration::from_secs(parse_env("AI_CACHE_TTL_SECS", 3600)?),
            context_retention_days: parse_env("CONTEXT_RETENTION_DAYS", 30)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            api_key: self.gemini_api_key.clone(),
            api_base: self.gemini_api_base.clone(),
            model: self.ai_model.clone(),
            timeout: self.ai_timeout,
            max_retries: self.ai_retry_attempts,
            max_output_tokens: self.ai_max_tokens,
            temperature: self.ai_temperature,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and empty are the same thing.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
