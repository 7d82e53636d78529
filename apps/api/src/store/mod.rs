//! Persistence ports. Handlers and the enrichment pipeline only see these
//! traits; `main` picks PostgreSQL or the in-memory adapter at startup.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::context::{
    ContextEntry, ContextOutcome, NewContextEntry, ProcessingStatus, SourceType,
};
use crate::models::task::{
    AiInsight, Category, NewCategory, NewTask, Priority, Task, TaskEnhancement, TaskStatus,
};
use crate::models::ParseEnumError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} '{key}' already exists")]
    Duplicate { entity: &'static str, key: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(#[from] ParseEnumError),

    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        StoreError::NotFound { entity, id }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Listing filters for context entries. All present fields must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextFilter {
    pub source_type: Option<SourceType>,
    pub status: Option<ProcessingStatus>,
    /// Case-insensitive literal substring over content and insights.
    pub search: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
}

impl ContextFilter {
    pub fn matches(&self, entry: &ContextEntry) -> bool {
        if self.source_type.is_some_and(|s| s != entry.source_type) {
            return false;
        }
        if self.status.is_some_and(|s| s != entry.processing_status) {
            return false;
        }
        if !created_within(entry.created_at, self.created_after, self.created_before) {
            return false;
        }
        match self.search_term() {
            Some(term) => {
                entry.content.to_lowercase().contains(&term)
                    || entry
                        .insights
                        .iter()
                        .any(|i| i.to_lowercase().contains(&term))
            }
            None => true,
        }
    }

    /// Lowercased search term, ignoring blank input.
    pub fn search_term(&self) -> Option<String> {
        search_term(self.search.as_deref())
    }
}

/// Listing filters for tasks. All present fields must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// Case-insensitive literal substring over title and description.
    pub search: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if !created_within(task.created_at, self.created_after, self.created_before) {
            return false;
        }
        match self.search_term() {
            Some(term) => {
                task.title.to_lowercase().contains(&term)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            }
            None => true,
        }
    }

    pub fn search_term(&self) -> Option<String> {
        search_term(self.search.as_deref())
    }
}

fn created_within(
    created_at: DateTime<Utc>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
) -> bool {
    after.map_or(true, |a| created_at >= a) && before.map_or(true, |b| created_at < b)
}

fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn create_context(&self, entry: NewContextEntry) -> StoreResult<ContextEntry>;

    async fn get_context(&self, id: Uuid) -> StoreResult<ContextEntry>;

    /// Sets only the processing status. `updated_at` is refreshed.
    async fn set_context_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> StoreResult<ContextEntry>;

    /// Writes status, insights and `processed_at`; every other column is
    /// left as it is at write time.
    async fn record_context_outcome(
        &self,
        id: Uuid,
        outcome: &ContextOutcome,
    ) -> StoreResult<ContextEntry>;

    async fn delete_context(&self, id: Uuid) -> StoreResult<()>;

    /// Newest first.
    async fn list_contexts(&self, filter: &ContextFilter) -> StoreResult<Vec<ContextEntry>>;

    /// Bulk retention: removes entries created before `cutoff`.
    async fn delete_contexts_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;

    async fn get_task(&self, id: Uuid) -> StoreResult<Task>;

    /// Writes the user-editable fields and the score back. Enrichment
    /// columns are owned by `record_enhancement`. `updated_at` is refreshed.
    async fn update_task(&self, task: &Task) -> StoreResult<Task>;

    /// Writes the enrichment columns and rescores from the row's current
    /// priority, deadline, estimate and category.
    async fn record_enhancement(
        &self,
        id: Uuid,
        enhancement: &TaskEnhancement,
    ) -> StoreResult<Task>;

    /// Audit rows for the task go with it.
    async fn delete_task(&self, id: Uuid) -> StoreResult<()>;

    /// Highest `priority_score` first, then newest.
    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// By name.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    async fn get_category(&self, id: Uuid) -> StoreResult<Category>;

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>>;

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category>;

    /// Tasks that referenced the category keep existing with no category.
    async fn delete_category(&self, id: Uuid) -> StoreResult<()>;

    async fn increment_category_usage(&self, id: Uuid) -> StoreResult<Category>;

    async fn record_insights(&self, insights: &[AiInsight]) -> StoreResult<()>;

    /// Newest first.
    async fn list_insights(&self, task_id: Uuid) -> StoreResult<Vec<AiInsight>>;
}
