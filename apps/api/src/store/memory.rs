//! In-memory store used when no database is configured, and by tests.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::enrichment::scoring::score_task;
use crate::models::context::{ContextEntry, ContextOutcome, NewContextEntry, ProcessingStatus};
use crate::models::task::{AiInsight, Category, NewCategory, NewTask, Task, TaskEnhancement};
use crate::store::{
    ContextFilter, ContextStore, StoreError, StoreResult, TaskFilter, TaskStore,
};

/// Thread-safe in-memory implementation of both store ports.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    contexts: HashMap<Uuid, ContextEntry>,
    tasks: HashMap<Uuid, Task>,
    categories: HashMap<Uuid, Category>,
    insights: Vec<AiInsight>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|err| StoreError::Poisoned(err.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|err| StoreError::Poisoned(err.to_string()))
    }
}

impl MemoryState {
    /// Resolves the denormalised category name at read time.
    fn hydrate(&self, task: &Task) -> Task {
        let mut task = task.clone();
        task.category_name = task
            .category_id
            .and_then(|id| self.categories.get(&id))
            .map(|c| c.name.clone());
        task
    }
}

#[async_trait]
impl ContextStore for MemoryStore {
    async fn create_context(&self, entry: NewContextEntry) -> StoreResult<ContextEntry> {
        let now = Utc::now();
        let created = ContextEntry {
            id: Uuid::new_v4(),
            content: entry.content,
            source_type: entry.source_type,
            processing_status: ProcessingStatus::Unprocessed,
            insights: Vec::new(),
            metadata: entry.metadata,
            created_at: now,
            updated_at: now,
            processed_at: None,
        };
        self.write()?.contexts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_context(&self, id: Uuid) -> StoreResult<ContextEntry> {
        self.read()?
            .contexts
            .get(&id)
            .cloned()
            .ok_or(StoreError::not_found("context entry", id))
    }

    async fn set_context_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> StoreResult<ContextEntry> {
        let mut state = self.write()?;
        let stored = state
            .contexts
            .get_mut(&id)
            .ok_or(StoreError::not_found("context entry", id))?;
        stored.processing_status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn record_context_outcome(
        &self,
        id: Uuid,
        outcome: &ContextOutcome,
    ) -> StoreResult<ContextEntry> {
        let mut state = self.write()?;
        let stored = state
            .contexts
            .get_mut(&id)
            .ok_or(StoreError::not_found("context entry", id))?;
        stored.processing_status = outcome.status;
        stored.insights = outcome.insights.clone();
        stored.processed_at = Some(outcome.processed_at);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_context(&self, id: Uuid) -> StoreResult<()> {
        self.write()?
            .contexts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::not_found("context entry", id))
    }

    async fn list_contexts(&self, filter: &ContextFilter) -> StoreResult<Vec<ContextEntry>> {
        let state = self.read()?;
        let mut entries: Vec<ContextEntry> = state
            .contexts
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by_key(|e| Reverse(e.created_at));
        Ok(entries)
    }

    async fn delete_contexts_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.write()?;
        let before = state.contexts.len();
        state.contexts.retain(|_, e| e.created_at >= cutoff);
        Ok((before - state.contexts.len()) as u64)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let now = Utc::now();
        let created = Task {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            category_id: task.category_id,
            category_name: None,
            priority: task.priority,
            priority_score: task.priority_score,
            status: task.status,
            deadline: task.deadline,
            estimated_time: task.estimated_time,
            ai_enhanced: false,
            ai_suggestions: Vec::new(),
            ai_processed_at: None,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.write()?;
        if let Some(category_id) = created.category_id {
            if !state.categories.contains_key(&category_id) {
                return Err(StoreError::not_found("category", category_id));
            }
        }
        state.tasks.insert(created.id, created.clone());
        Ok(state.hydrate(&created))
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Task> {
        let state = self.read()?;
        state
            .tasks
            .get(&id)
            .map(|t| state.hydrate(t))
            .ok_or(StoreError::not_found("task", id))
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        let mut state = self.write()?;
        if let Some(category_id) = task.category_id {
            if !state.categories.contains_key(&category_id) {
                return Err(StoreError::not_found("category", category_id));
            }
        }
        let stored = state
            .tasks
            .get_mut(&task.id)
            .ok_or(StoreError::not_found("task", task.id))?;
        let updated = Task {
            ai_enhanced: stored.ai_enhanced,
            ai_suggestions: stored.ai_suggestions.clone(),
            ai_processed_at: stored.ai_processed_at,
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..task.clone()
        };
        *stored = updated.clone();
        Ok(state.hydrate(&updated))
    }

    async fn record_enhancement(
        &self,
        id: Uuid,
        enhancement: &TaskEnhancement,
    ) -> StoreResult<Task> {
        let mut state = self.write()?;
        let current = state
            .tasks
            .get(&id)
            .map(|t| state.hydrate(t))
            .ok_or(StoreError::not_found("task", id))?;
        let priority_score = score_task(&current, enhancement.processed_at);
        let stored = state
            .tasks
            .get_mut(&id)
            .ok_or(StoreError::not_found("task", id))?;
        stored.priority_score = priority_score;
        stored.ai_suggestions = enhancement.ai_suggestions.clone();
        stored.ai_enhanced = enhancement.ai_enhanced;
        stored.ai_processed_at = Some(enhancement.processed_at);
        stored.updated_at = Utc::now();
        let updated = stored.clone();
        Ok(state.hydrate(&updated))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.write()?;
        state
            .tasks
            .remove(&id)
            .ok_or(StoreError::not_found("task", id))?;
        state.insights.retain(|i| i.task_id != id);
        Ok(())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .map(|t| state.hydrate(t))
            .collect();
        tasks.sort_by_key(|t| (Reverse(t.priority_score), Reverse(t.created_at)));
        Ok(tasks)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.read()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Category> {
        self.read()?
            .categories
            .get(&id)
            .cloned()
            .ok_or(StoreError::not_found("category", id))
    }

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self
            .read()?
            .categories
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut state = self.write()?;
        if state.categories.values().any(|c| c.name == category.name) {
            return Err(StoreError::Duplicate {
                entity: "category",
                key: category.name,
            });
        }
        let created = Category {
            id: Uuid::new_v4(),
            name: category.name,
            icon: category.icon,
            color: category.color,
            usage_count: 0,
            created_at: Utc::now(),
        };
        state.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.write()?;
        state
            .categories
            .remove(&id)
            .ok_or(StoreError::not_found("category", id))?;
        for task in state.tasks.values_mut() {
            if task.category_id == Some(id) {
                task.category_id = None;
            }
        }
        Ok(())
    }

    async fn increment_category_usage(&self, id: Uuid) -> StoreResult<Category> {
        let mut state = self.write()?;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(StoreError::not_found("category", id))?;
        category.usage_count += 1;
        Ok(category.clone())
    }

    async fn record_insights(&self, insights: &[AiInsight]) -> StoreResult<()> {
        let mut state = self.write()?;
        if let Some(missing) = insights.iter().find(|i| !state.tasks.contains_key(&i.task_id)) {
            return Err(StoreError::not_found("task", missing.task_id));
        }
        state.insights.extend_from_slice(insights);
        Ok(())
    }

    async fn list_insights(&self, task_id: Uuid) -> StoreResult<Vec<AiInsight>> {
        let state = self.read()?;
        if !state.tasks.contains_key(&task_id) {
            return Err(StoreError::not_found("task", task_id));
        }
        let mut insights: Vec<AiInsight> = state
            .insights
            .iter()
            .filter(|i| i.task_id == task_id)
            .cloned()
            .collect();
        insights.sort_by_key(|i| Reverse(i.created_at));
        Ok(insights)
    }
}
