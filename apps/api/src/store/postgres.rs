//! PostgreSQL adapter. Insight lists and metadata live in JSONB columns;
//! enums are stored as their snake_case text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::enrichment::scoring::score_task;
use crate::models::context::{ContextEntry, ContextOutcome, NewContextEntry, ProcessingStatus};
use crate::models::task::{AiInsight, Category, NewCategory, NewTask, Task, TaskEnhancement};
use crate::store::{
    ContextFilter, ContextStore, StoreError, StoreResult, TaskFilter, TaskStore,
};

const TASK_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.category_id, c.name AS category_name,
           t.priority, t.priority_score, t.status, t.deadline, t.estimated_time,
           t.ai_enhanced, t.ai_suggestions, t.ai_processed_at, t.created_at, t.updated_at
    FROM tasks t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

#[derive(Debug, FromRow)]
struct ContextEntryRow {
    id: Uuid,
    content: String,
    source_type: String,
    processing_status: String,
    insights: Json<Vec<String>>,
    metadata: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ContextEntryRow> for ContextEntry {
    type Error = StoreError;

    fn try_from(row: ContextEntryRow) -> Result<Self, Self::Error> {
        Ok(ContextEntry {
            id: row.id,
            content: row.content,
            source_type: row.source_type.parse()?,
            processing_status: row.processing_status.parse()?,
            insights: row.insights.0,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
            processed_at: row.processed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    category_id: Option<Uuid>,
    category_name: Option<String>,
    priority: String,
    priority_score: i32,
    status: String,
    deadline: Option<DateTime<Utc>>,
    estimated_time: Option<f64>,
    ai_enhanced: bool,
    ai_suggestions: Json<Vec<String>>,
    ai_processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            category_id: row.category_id,
            category_name: row.category_name,
            priority: row.priority.parse()?,
            priority_score: row.priority_score,
            status: row.status.parse()?,
            deadline: row.deadline,
            estimated_time: row.estimated_time,
            ai_enhanced: row.ai_enhanced,
            ai_suggestions: row.ai_suggestions.0,
            ai_processed_at: row.ai_processed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    icon: String,
    color: String,
    usage_count: i32,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            icon: row.icon,
            color: row.color,
            usage_count: row.usage_count,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AiInsightRow {
    id: Uuid,
    task_id: Uuid,
    insight_type: String,
    content: String,
    confidence_score: f64,
    applied: bool,
    created_at: DateTime<Utc>,
}

impl From<AiInsightRow> for AiInsight {
    fn from(row: AiInsightRow) -> Self {
        AiInsight {
            id: row.id,
            task_id: row.task_id,
            insight_type: row.insight_type,
            content: row.content,
            confidence_score: row.confidence_score,
            applied: row.applied,
            created_at: row.created_at,
        }
    }
}

/// Contains-pattern for `ILIKE ... ESCAPE '\'` with the term matched literally.
fn like_pattern(term: Option<String>) -> Option<String> {
    term.map(|t| {
        let escaped = t
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{escaped}%")
    })
}

/// sqlx-backed implementation of both store ports.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens the pool and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Applies the embedded migrations under `migrations/`.
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn fetch_task(&self, id: Uuid) -> StoreResult<Task> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("{TASK_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(StoreError::not_found("task", id))?.try_into()
    }
}

#[async_trait]
impl ContextStore for PgStore {
    async fn create_context(&self, entry: NewContextEntry) -> StoreResult<ContextEntry> {
        let row: ContextEntryRow = sqlx::query_as(
            r#"
            INSERT INTO context_entries (id, content, source_type, processing_status, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.content)
        .bind(entry.source_type.as_str())
        .bind(ProcessingStatus::Unprocessed.as_str())
        .bind(&entry.metadata)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_context(&self, id: Uuid) -> StoreResult<ContextEntry> {
        let row: Option<ContextEntryRow> =
            sqlx::query_as("SELECT * FROM context_entries WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or(StoreError::not_found("context entry", id))?
            .try_into()
    }

    async fn set_context_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> StoreResult<ContextEntry> {
        let row: Option<ContextEntryRow> = sqlx::query_as(
            r#"
            UPDATE context_entries
            SET processing_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::not_found("context entry", id))?
            .try_into()
    }

    async fn record_context_outcome(
        &self,
        id: Uuid,
        outcome: &ContextOutcome,
    ) -> StoreResult<ContextEntry> {
        let row: Option<ContextEntryRow> = sqlx::query_as(
            r#"
            UPDATE context_entries
            SET processing_status = $2, insights = $3, processed_at = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(outcome.status.as_str())
        .bind(Json(&outcome.insights))
        .bind(outcome.processed_at)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::not_found("context entry", id))?
            .try_into()
    }

    async fn delete_context(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM context_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("context entry", id));
        }
        Ok(())
    }

    async fn list_contexts(&self, filter: &ContextFilter) -> StoreResult<Vec<ContextEntry>> {
        let rows: Vec<ContextEntryRow> = sqlx::query_as(
            r#"
            SELECT * FROM context_entries
            WHERE ($1::text IS NULL OR source_type = $1)
              AND ($2::text IS NULL OR processing_status = $2)
              AND ($3::text IS NULL
                   OR content ILIKE $3 ESCAPE '\'
                   OR insights::text ILIKE $3 ESCAPE '\')
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.source_type.map(|s| s.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(like_pattern(filter.search_term()))
        .bind(filter.created_after)
        .bind(filter.created_before)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ContextEntry::try_from).collect()
    }

    async fn delete_contexts_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM context_entries WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, title, description, category_id, priority, priority_score,
                 status, deadline, estimated_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.category_id)
        .bind(task.priority.as_str())
        .bind(task.priority_score)
        .bind(task.status.as_str())
        .bind(task.deadline)
        .bind(task.estimated_time)
        .execute(&self.pool)
        .await?;
        self.fetch_task(id).await
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Task> {
        self.fetch_task(id).await
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, category_id = $4, priority = $5,
                priority_score = $6, status = $7, deadline = $8, estimated_time = $9,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.category_id)
        .bind(task.priority.as_str())
        .bind(task.priority_score)
        .bind(task.status.as_str())
        .bind(task.deadline)
        .bind(task.estimated_time)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("task", task.id));
        }
        self.fetch_task(task.id).await
    }

    async fn record_enhancement(
        &self,
        id: Uuid,
        enhancement: &TaskEnhancement,
    ) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("{TASK_SELECT} WHERE t.id = $1 FOR UPDATE OF t"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current: Task = row.ok_or(StoreError::not_found("task", id))?.try_into()?;

        sqlx::query(
            r#"
            UPDATE tasks
            SET priority_score = $2, ai_enhanced = $3, ai_suggestions = $4,
                ai_processed_at = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(score_task(&current, enhancement.processed_at))
        .bind(enhancement.ai_enhanced)
        .bind(Json(&enhancement.ai_suggestions))
        .bind(enhancement.processed_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        self.fetch_task(id).await
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("task", id));
        }
        Ok(())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            r#"{TASK_SELECT}
            WHERE ($1::text IS NULL OR t.status = $1)
              AND ($2::text IS NULL OR t.priority = $2)
              AND ($3::text IS NULL
                   OR t.title ILIKE $3 ESCAPE '\'
                   OR t.description ILIKE $3 ESCAPE '\')
              AND ($4::timestamptz IS NULL OR t.created_at >= $4)
              AND ($5::timestamptz IS NULL OR t.created_at < $5)
            ORDER BY t.priority_score DESC, t.created_at DESC
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .bind(like_pattern(filter.search_term()))
        .bind(filter.created_after)
        .bind(filter.created_before)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT * FROM categories ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Category> {
        let row: Option<CategoryRow> = sqlx::query_as("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Category::from)
            .ok_or(StoreError::not_found("category", id))
    }

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT * FROM categories WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Category::from))
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let row: CategoryRow = sqlx::query_as(
            r#"
            INSERT INTO categories (id, name, icon, color)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.icon)
        .bind(&category.color)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate {
                entity: "category",
                key: category.name.clone(),
            },
            other => StoreError::Database(other),
        })?;
        Ok(row.into())
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<()> {
        // tasks.category_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", id));
        }
        Ok(())
    }

    async fn increment_category_usage(&self, id: Uuid) -> StoreResult<Category> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "UPDATE categories SET usage_count = usage_count + 1 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Category::from)
            .ok_or(StoreError::not_found("category", id))
    }

    async fn record_insights(&self, insights: &[AiInsight]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for insight in insights {
            sqlx::query(
                r#"
                INSERT INTO ai_insights
                    (id, task_id, insight_type, content, confidence_score, applied, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(insight.id)
            .bind(insight.task_id)
            .bind(&insight.insight_type)
            .bind(&insight.content)
            .bind(insight.confidence_score)
            .bind(insight.applied)
            .bind(insight.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_insights(&self, task_id: Uuid) -> StoreResult<Vec<AiInsight>> {
        // Distinguish "no insights yet" from "no such task".
        self.fetch_task(task_id).await?;
        let rows: Vec<AiInsightRow> = sqlx::query_as(
            "SELECT * FROM ai_insights WHERE task_id = $1 ORDER BY created_at DESC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AiInsight::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(Some("50%".to_string())).as_deref(), Some("%50\\%%"));
        assert_eq!(like_pattern(Some("file_v2".to_string())).as_deref(), Some("%file\\_v2%"));
        assert_eq!(like_pattern(Some("a\\b".to_string())).as_deref(), Some("%a\\\\b%"));
        assert_eq!(like_pattern(None), None);
    }
}
