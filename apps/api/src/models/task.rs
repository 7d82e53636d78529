use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CATEGORY_NAME_LEN: usize = 50;

/// Upper bound on stored AI suggestions for a task.
pub const MAX_TASK_SUGGESTIONS: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(ParseEnumError::new("priority", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(ParseEnumError::new("task status", other)),
        }
    }
}

/// `usage_count` only ever goes up: it counts associations, not live tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub icon: String,
    pub color: String,
}

const DEFAULT_CATEGORY_ICON: &str = "📋";
const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";

const CATEGORY_STYLES: &[(&str, &str, &str)] = &[
    ("Work", "💼", "#3B82F6"),
    ("Personal", "👤", "#10B981"),
    ("Health", "💊", "#EF4444"),
    ("Learning", "📚", "#F59E0B"),
    ("Family", "👨‍👩‍👧‍👦", "#8B5CF6"),
    ("Finance", "💰", "#059669"),
    ("Travel", "✈️", "#06B6D4"),
    ("Shopping", "🛒", "#EC4899"),
];

impl NewCategory {
    /// Builds a category using the well-known icon and color for its name,
    /// or the neutral defaults for anything else.
    pub fn styled(name: &str) -> Self {
        let (icon, color) = CATEGORY_STYLES
            .iter()
            .find(|(known, _, _)| *known == name)
            .map(|(_, icon, color)| (*icon, *color))
            .unwrap_or((DEFAULT_CATEGORY_ICON, DEFAULT_CATEGORY_COLOR));
        Self {
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Weak reference: deleting the category nulls this, never the task.
    pub category_id: Option<Uuid>,
    /// Denormalised from the category on read.
    pub category_name: Option<String>,
    pub priority: Priority,
    pub priority_score: i32,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    /// Estimated hours.
    pub estimated_time: Option<f64>,
    pub ai_enhanced: bool,
    pub ai_suggestions: Vec<String>,
    pub ai_processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub priority: Priority,
    pub priority_score: i32,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_time: Option<f64>,
}

/// Enrichment columns written back after a provider round trip. The store
/// rescores from the row as it is at write time.
#[derive(Debug, Clone)]
pub struct TaskEnhancement {
    pub ai_suggestions: Vec<String>,
    pub ai_enhanced: bool,
    pub processed_at: DateTime<Utc>,
}

/// Detachable audit record of a single suggestion produced for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiInsight {
    pub id: Uuid,
    pub task_id: Uuid,
    pub insight_type: String,
    pub content: String,
    pub confidence_score: f64,
    pub applied: bool,
    pub created_at: DateTime<Utc>,
}
