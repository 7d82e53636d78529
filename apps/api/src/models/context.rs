use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ParseEnumError;

/// Context entries shorter than this (after trimming) are rejected.
pub const MIN_CONTENT_LEN: usize = 5;

/// Upper bound on stored insights for a context entry.
pub const MAX_CONTEXT_INSIGHTS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Whatsapp,
    Email,
    #[default]
    Notes,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Whatsapp => "whatsapp",
            SourceType::Email => "email",
            SourceType::Notes => "notes",
        }
    }

    /// Human-facing label used inside prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceType::Whatsapp => "WhatsApp",
            SourceType::Email => "Email",
            SourceType::Notes => "Notes",
        }
    }
}

impl FromStr for SourceType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whatsapp" => Ok(SourceType::Whatsapp),
            "email" => Ok(SourceType::Email),
            "notes" => Ok(SourceType::Notes),
            other => Err(ParseEnumError::new("source_type", other)),
        }
    }
}

/// Lifecycle: unprocessed → processing → {processed | failed}.
/// Reprocessing re-enters `Processing` from any state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Unprocessed,
    Processing,
    Processed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Unprocessed => "unprocessed",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unprocessed" => Ok(ProcessingStatus::Unprocessed),
            "processing" => Ok(ProcessingStatus::Processing),
            "processed" => Ok(ProcessingStatus::Processed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(ParseEnumError::new("processing_status", other)),
        }
    }
}

/// A free-form note (chat message, email, jotting) annotated with insights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: Uuid,
    pub content: String,
    pub source_type: SourceType,
    pub processing_status: ProcessingStatus,
    pub insights: Vec<String>,
    /// Opaque to the enrichment pipeline.
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ContextEntry {
    pub fn insights_count(&self) -> usize {
        self.insights.len()
    }
}

/// Validated input for creating a context entry.
#[derive(Debug, Clone)]
pub struct NewContextEntry {
    pub content: String,
    pub source_type: SourceType,
    pub metadata: Value,
}

/// Terminal result of one enrichment run. Only these columns are written
/// back, so nothing else on the entry is touched by a slow provider call.
#[derive(Debug, Clone)]
pub struct ContextOutcome {
    pub status: ProcessingStatus,
    pub insights: Vec<String>,
    pub processed_at: DateTime<Utc>,
}
