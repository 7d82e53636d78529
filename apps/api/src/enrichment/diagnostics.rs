//! Failure classification and the short remediation notes shown to users.

use serde::Serialize;

use crate::llm_client::{ProviderError, ProviderErrorKind};

/// Longest slice of a raw provider message echoed back to users.
const MAX_ERROR_ECHO_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Auth,
    Quota,
    ContentSafety,
    Unknown,
}

impl FailureClass {
    /// Trusts a structured kind from the provider; otherwise falls back to
    /// the message adapter.
    pub fn classify(err: &ProviderError) -> Self {
        let kind = match err.kind {
            ProviderErrorKind::Auth | ProviderErrorKind::Quota | ProviderErrorKind::ContentSafety => {
                err.kind
            }
            _ => ProviderErrorKind::from_message(&err.message),
        };
        match kind {
            ProviderErrorKind::Auth => FailureClass::Auth,
            ProviderErrorKind::Quota => FailureClass::Quota,
            ProviderErrorKind::ContentSafety => FailureClass::ContentSafety,
            _ => FailureClass::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Auth => "auth",
            FailureClass::Quota => "quota",
            FailureClass::ContentSafety => "content_safety",
            FailureClass::Unknown => "unknown",
        }
    }
}

pub(crate) fn clip(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}

/// 3 or 4 lines explaining the failure; always ends with the fallback notice.
pub fn diagnostic_lines(err: &ProviderError, provider: &str) -> Vec<String> {
    match FailureClass::classify(err) {
        FailureClass::Auth => vec![
            format!("🔑 {provider} API Key Error - Invalid or expired API key"),
            format!("🔧 Please check your {provider} API key configuration"),
            "✅ Verify the API key is active and has the required permissions".to_string(),
            "🔄 Using fallback analysis...".to_string(),
        ],
        FailureClass::Quota => vec![
            format!("⏳ {provider} API Quota Exceeded - Rate limit reached"),
            "🕐 Please wait a few minutes before retrying".to_string(),
            "🔄 Using basic analysis instead...".to_string(),
        ],
        FailureClass::ContentSafety => vec![
            format!("⚠️ Content blocked by {provider} safety filters"),
            "✏️ Try rephrasing your content or use different wording".to_string(),
            "🔄 Using fallback analysis...".to_string(),
        ],
        FailureClass::Unknown => vec![
            format!("❌ {provider} Error: {}...", clip(&err.message, MAX_ERROR_ECHO_CHARS)),
            "🌐 Check your internet connection and API key".to_string(),
            "🔁 Try reprocessing in a few moments".to_string(),
            "🔄 Using fallback analysis...".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_kind_wins() {
        let err = ProviderError::new(ProviderErrorKind::Quota, "slow down");
        assert_eq!(FailureClass::classify(&err), FailureClass::Quota);
    }

    #[test]
    fn test_unstructured_kind_uses_message() {
        let err = ProviderError::new(ProviderErrorKind::Unknown, "429 QUOTA_EXCEEDED");
        assert_eq!(FailureClass::classify(&err), FailureClass::Quota);
        let err = ProviderError::new(ProviderErrorKind::Timeout, "operation timed out");
        assert_eq!(FailureClass::classify(&err), FailureClass::Unknown);
    }

    #[test]
    fn test_quota_diagnostics_mention_rate_limit() {
        let lines = diagnostic_lines(&ProviderError::from_message("QUOTA_EXCEEDED"), "Gemini");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Quota Exceeded"));
        assert!(lines[0].contains("Rate limit"));
    }

    #[test]
    fn test_line_counts_per_class() {
        for (msg, expected) in [
            ("API_KEY_INVALID", 4),
            ("RESOURCE_EXHAUSTED", 3),
            ("response BLOCKED", 3),
            ("socket closed", 4),
        ] {
            let n = diagnostic_lines(&ProviderError::from_message(msg), "Gemini").len();
            assert_eq!(n, expected, "{msg}");
        }
    }

    #[test]
    fn test_unknown_echo_is_clipped() {
        let long = "x".repeat(500);
        let lines = diagnostic_lines(&ProviderError::from_message(long), "Gemini");
        assert!(lines[0].chars().count() < 130);
    }
}
