//! Provider liveness check behind the `ai_status` and health endpoints.

use serde::Serialize;
use tracing::warn;

use crate::enrichment::diagnostics::{clip, FailureClass};
use crate::llm_client::prompts::HEALTH_CHECK_PROMPT;
use crate::llm_client::{LlmProvider, ProviderErrorKind};

const MAX_ECHO_CHARS: usize = 100;
const MAX_TEST_RESPONSE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    /// Reachable, but the reply carried no text.
    Partial,
    Disconnected,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub status: ConnectionStatus,
    pub ai_connected: bool,
    pub provider: String,
    pub model: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
}

/// Sends a trivial prompt and reports what came back.
pub async fn check_provider(provider: &dyn LlmProvider) -> ProviderHealth {
    let name = provider.name().to_string();
    let model = provider.model().to_string();

    match provider.generate(HEALTH_CHECK_PROMPT).await {
        Ok(text) if !text.trim().is_empty() => ProviderHealth {
            status: ConnectionStatus::Connected,
            ai_connected: true,
            message: format!("✅ {name} is connected and responding"),
            test_response: Some(clip(text.trim(), MAX_TEST_RESPONSE_CHARS)),
            error: None,
            instructions: Vec::new(),
            provider: name,
            model,
        },
        Ok(_) => partial(name, model),
        Err(err) if err.kind == ProviderErrorKind::EmptyResponse => partial(name, model),
        Err(err) => {
            let class = FailureClass::classify(&err);
            warn!(failure = class.as_str(), "AI health check failed: {}", err.message);
            let (message, instructions) = match class {
                FailureClass::Auth => (
                    format!("🔑 Invalid {name} API key"),
                    [
                        "1. Verify your API key is correct",
                        "2. Check the provider console for the key status",
                        "3. Ensure the API key has the required permissions",
                    ],
                ),
                FailureClass::Quota => (
                    format!("⏳ {name} API quota exceeded"),
                    [
                        "1. Check your API usage in the provider console",
                        "2. Wait for the quota reset or upgrade your plan",
                        "3. Monitor your API usage",
                    ],
                ),
                FailureClass::ContentSafety | FailureClass::Unknown => (
                    format!("❌ {name} connection failed: {}", clip(&err.message, MAX_ECHO_CHARS)),
                    [
                        "1. Check your internet connection",
                        "2. Verify the API key configuration",
                        "3. Try again in a few moments",
                    ],
                ),
            };
            ProviderHealth {
                status: ConnectionStatus::Disconnected,
                ai_connected: false,
                provider: name,
                model,
                message,
                test_response: None,
                error: Some(clip(&err.message, MAX_ECHO_CHARS)),
                instructions: instructions.iter().map(|s| s.to_string()).collect(),
            }
        }
    }
}

fn partial(provider: String, model: String) -> ProviderHealth {
    ProviderHealth {
        status: ConnectionStatus::Partial,
        ai_connected: false,
        message: format!("⚠️ {provider} connected but not responding properly"),
        provider,
        model,
        test_response: None,
        error: None,
        instructions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::ScriptedProvider;
    use crate::llm_client::ProviderError;

    #[tokio::test]
    async fn test_connected_check_echoes_reply() {
        let health = check_provider(&ScriptedProvider::replying("OK")).await;
        assert_eq!(health.status, ConnectionStatus::Connected);
        assert!(health.ai_connected);
        assert_eq!(health.test_response.as_deref(), Some("OK"));
        assert_eq!(health.model, "scripted-1");
    }

    #[tokio::test]
    async fn test_blank_reply_is_partial() {
        let health = check_provider(&ScriptedProvider::replying("  ")).await;
        assert_eq!(health.status, ConnectionStatus::Partial);
        assert!(!health.ai_connected);
    }

    #[tokio::test]
    async fn test_auth_failure_gives_instructions() {
        let provider = ScriptedProvider::failing(ProviderError::from_message("API_KEY_INVALID"));
        let health = check_provider(&provider).await;
        assert_eq!(health.status, ConnectionStatus::Disconnected);
        assert!(health.message.contains("Invalid"));
        assert_eq!(health.instructions.len(), 3);
        assert_eq!(health.error.as_deref(), Some("API_KEY_INVALID"));
    }

    #[tokio::test]
    async fn test_check_uses_health_prompt() {
        let provider = ScriptedProvider::replying("OK");
        check_provider(&provider).await;
        assert_eq!(provider.prompts(), vec![HEALTH_CHECK_PROMPT.to_string()]);
    }
}
