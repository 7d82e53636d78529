//! Read-only rollups over tasks and the non-AI parts of a suggestion preview.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::enrichment::contains_any;
use crate::enrichment::fallback::categorize;
use crate::models::task::{Priority, Task, TaskStatus};

const RECENT_WINDOW_DAYS: i64 = 30;
const RECENT_LIMIT: usize = 10;
const PREFERRED_CATEGORY_COUNT: usize = 3;
const DEFAULT_PREFERRED_CATEGORIES: [&str; 3] = ["Work", "Personal", "Learning"];
const DEFAULT_COMPLETION_HOURS: f64 = 2.5;
const PEAK_PRODUCTIVITY_HOURS: [&str; 2] = ["09:00-11:00", "14:00-16:00"];
const MAX_TAGS: usize = 5;

/// (tag, keywords) in output order.
const TAG_PATTERNS: &[(&str, &[&str])] = &[
    ("Meeting", &["meeting", "call", "conference"]),
    ("Research", &["research", "analyze", "study"]),
    ("Development", &["develop", "build", "create", "design"]),
    ("Planning", &["plan", "organize", "schedule"]),
    ("Review", &["review", "check", "audit"]),
    ("Client", &["client", "customer", "stakeholder"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Workload {
    Low,
    Medium,
    High,
}

impl Workload {
    /// Over open (pending + in progress) tasks.
    pub fn from_open_tasks(open: usize) -> Self {
        match open {
            n if n > 10 => Workload::High,
            n if n > 5 => Workload::Medium,
            _ => Workload::Low,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserPatterns {
    pub preferred_categories: Vec<String>,
    pub average_completion_time: f64,
    pub peak_productivity_hours: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskStatistics {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct ContextualAnalysis {
    pub total_entries: usize,
    pub recent_tasks: Vec<String>,
    pub current_workload: Workload,
    pub user_patterns: UserPatterns,
    pub statistics: TaskStatistics,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn compute_contextual_analysis(tasks: &[Task], now: DateTime<Utc>) -> ContextualAnalysis {
    let count = |s: TaskStatus| tasks.iter().filter(|t| t.status == s).count();
    let total_tasks = tasks.len();
    let completed_tasks = count(TaskStatus::Completed);
    let pending_tasks = count(TaskStatus::Pending);
    let in_progress_tasks = count(TaskStatus::InProgress);

    let window_start = now - Duration::days(RECENT_WINDOW_DAYS);
    let mut recent: Vec<&Task> = tasks.iter().filter(|t| t.created_at >= window_start).collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_tasks = recent
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|t| t.title.clone())
        .collect();

    let mut per_category: HashMap<&str, usize> = HashMap::new();
    for name in tasks.iter().filter_map(|t| t.category_name.as_deref()) {
        *per_category.entry(name).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = per_category.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let preferred_categories: Vec<String> = if ranked.is_empty() {
        DEFAULT_PREFERRED_CATEGORIES.iter().map(|s| s.to_string()).collect()
    } else {
        ranked
            .into_iter()
            .take(PREFERRED_CATEGORY_COUNT)
            .map(|(name, _)| name.to_string())
            .collect()
    };

    let estimates: Vec<f64> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter_map(|t| t.estimated_time)
        .collect();
    let average_completion_time = if estimates.is_empty() {
        DEFAULT_COMPLETION_HOURS
    } else {
        round1(estimates.iter().sum::<f64>() / estimates.len() as f64)
    };

    let completion_rate = if total_tasks == 0 {
        0.0
    } else {
        round1(completed_tasks as f64 / total_tasks as f64 * 100.0)
    };

    ContextualAnalysis {
        total_entries: total_tasks,
        recent_tasks,
        current_workload: Workload::from_open_tasks(pending_tasks + in_progress_tasks),
        user_patterns: UserPatterns {
            preferred_categories,
            average_completion_time,
            peak_productivity_hours: PEAK_PRODUCTIVITY_HOURS.iter().map(|s| s.to_string()).collect(),
        },
        statistics: TaskStatistics {
            total_tasks,
            completed_tasks,
            pending_tasks,
            in_progress_tasks,
            completion_rate,
        },
    }
}

pub fn suggest_deadline(priority: Priority, now: DateTime<Utc>) -> DateTime<Utc> {
    let days = match priority {
        Priority::Urgent => 1,
        Priority::High => 3,
        Priority::Medium => 7,
        Priority::Low => 14,
    };
    now + Duration::days(days)
}

/// Keyword tags in a fixed order, then the category, at most five.
pub fn extract_tags(title: &str, description: Option<&str>, category: Option<&str>) -> Vec<String> {
    let text = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();
    let mut tags: Vec<String> = TAG_PATTERNS
        .iter()
        .filter(|(_, keywords)| contains_any(&text, keywords))
        .map(|(tag, _)| tag.to_string())
        .collect();
    if let Some(category) = category {
        tags.push(category.to_string());
    }
    tags.truncate(MAX_TAGS);
    tags
}

/// Explicit category if given, else the keyword bucket of title and description.
pub fn recommend_category(title: &str, description: Option<&str>, category: Option<&str>) -> String {
    match category {
        Some(name) => name.to_string(),
        None => {
            let text = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();
            categorize(&text).0.to_string()
        }
    }
}
