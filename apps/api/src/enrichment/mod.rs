//! AI enrichment: turns a free-text entity into a bounded list of tagged insights.
//!
//! Flow: snapshot → prompt → provider → parser (on success) or
//!       diagnostics + fallback (on any failure) → persist.
//!
//! Enrichment never fails outright: every path ends with a non-empty,
//! bounded insight list written back through the store.

pub mod diagnostics;
pub mod fallback;
pub mod format;
pub mod health;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod scoring;

use chrono::{DateTime, Utc};

use crate::models::context::{ContextEntry, SourceType};
use crate::models::task::{Priority, Task};

/// The fields of a context entry the pipeline reads.
#[derive(Debug, Clone, Copy)]
pub struct ContextSnapshot<'a> {
    pub content: &'a str,
    pub source_type: SourceType,
}

impl<'a> From<&'a ContextEntry> for ContextSnapshot<'a> {
    fn from(entry: &'a ContextEntry) -> Self {
        Self {
            content: &entry.content,
            source_type: entry.source_type,
        }
    }
}

/// The fields of a task the pipeline reads.
#[derive(Debug, Clone, Copy)]
pub struct TaskSnapshot<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_time: Option<f64>,
}

impl<'a> From<&'a Task> for TaskSnapshot<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            title: &task.title,
            description: task.description.as_deref(),
            category: task.category_name.as_deref(),
            priority: task.priority,
            deadline: task.deadline,
            estimated_time: task.estimated_time,
        }
    }
}

/// Case-insensitive "any keyword occurs as a substring" test.
/// `haystack` must already be lowercased.
pub(crate) fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}
