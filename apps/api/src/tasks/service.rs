use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::SuggestionCache;
use crate::enrichment::orchestrator::{Enricher, SuggestionPreview};
use crate::enrichment::scoring::{compute_preview_score, compute_priority_score, score_task};
use crate::errors::AppError;
use crate::models::task::{
    Category, NewCategory, NewTask, Priority, Task, TaskStatus, MAX_CATEGORY_NAME_LEN,
    MAX_TITLE_LEN,
};
use crate::store::{StoreError, TaskStore};
use crate::tasks::analysis::{extract_tags, recommend_category, suggest_deadline};

/// Body of `POST /api/tasks` and `PUT /api/tasks/:id`. A PUT replaces every
/// field, so anything omitted is cleared. `priority_score` is derived and
/// ignored if sent.
#[derive(Debug, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    /// Takes precedence over `category_id`; created on first use.
    pub category_name: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_time: Option<f64>,
}

/// Body of `PATCH /api/tasks/:id`. Omitted fields are left alone; an explicit
/// `null` clears the nullable ones.
#[derive(Debug, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<Uuid>>,
    pub category_name: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "present")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub estimated_time: Option<Option<f64>>,
}

/// Only runs when the key is present, so `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_estimate(hours: Option<f64>) -> Result<Option<f64>, AppError> {
    match hours {
        Some(h) if !h.is_finite() || h < 0.0 => Err(AppError::Validation(
            "estimated_time must be a non-negative number of hours".to_string(),
        )),
        other => Ok(other),
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

pub fn validate_category_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Category name is required".to_string()));
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Category name must be at most {MAX_CATEGORY_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Looks a category up by name, creating it with its well-known style if new.
pub async fn get_or_create_category(
    store: &dyn TaskStore,
    name: &str,
) -> Result<Category, AppError> {
    let name = validate_category_name(name)?;
    if let Some(existing) = store.find_category_by_name(&name).await? {
        return Ok(existing);
    }
    match store.create_category(NewCategory::styled(&name)).await {
        Ok(created) => {
            info!(category = %created.name, "Category created");
            Ok(created)
        }
        // Lost a race with a concurrent create.
        Err(StoreError::Duplicate { .. }) => store
            .find_category_by_name(&name)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Category '{name}' could not be created"))),
        Err(e) => Err(e.into()),
    }
}

async fn resolve_category(
    store: &dyn TaskStore,
    category_id: Option<Uuid>,
    category_name: Option<&str>,
) -> Result<Option<Category>, AppError> {
    if let Some(name) = category_name.filter(|n| !n.trim().is_empty()) {
        return get_or_create_category(store, name).await.map(Some);
    }
    match category_id {
        Some(id) => match store.get_category(id).await {
            Ok(category) => Ok(Some(category)),
            Err(StoreError::NotFound { .. }) => Err(AppError::Validation(format!(
                "Category {id} does not exist"
            ))),
            Err(e) => Err(e.into()),
        },
        None => Ok(None),
    }
}

/// Persists the task, counts the category association, then enhances inline.
pub async fn create_task(
    store: &dyn TaskStore,
    enricher: &Enricher,
    input: TaskInput,
    now: DateTime<Utc>,
) -> Result<Task, AppError> {
    let title = validate_title(&input.title)?;
    let estimated_time = validate_estimate(input.estimated_time)?;
    let category =
        resolve_category(store, input.category_id, input.category_name.as_deref()).await?;

    let priority_score = compute_priority_score(
        input.priority,
        input.deadline,
        estimated_time,
        category.as_ref().map(|c| c.name.as_str()),
        now,
    );
    let created = store
        .create_task(NewTask {
            title,
            description: normalize_description(input.description),
            category_id: category.as_ref().map(|c| c.id),
            priority: input.priority,
            priority_score,
            status: input.status,
            deadline: input.deadline,
            estimated_time,
        })
        .await?;
    if let Some(category) = &category {
        store.increment_category_usage(category.id).await?;
    }
    info!(task_id = %created.id, priority_score, "Task created");

    Ok(enricher.enrich_task(store, created).await?)
}

/// Full replacement.
pub async fn replace_task(
    store: &dyn TaskStore,
    id: Uuid,
    input: TaskInput,
    now: DateTime<Utc>,
) -> Result<Task, AppError> {
    let mut task = store.get_task(id).await?;
    let previous_category = task.category_id;

    task.title = validate_title(&input.title)?;
    task.description = normalize_description(input.description);
    task.priority = input.priority;
    task.status = input.status;
    task.deadline = input.deadline;
    task.estimated_time = validate_estimate(input.estimated_time)?;
    let category =
        resolve_category(store, input.category_id, input.category_name.as_deref()).await?;
    task.category_id = category.as_ref().map(|c| c.id);
    task.category_name = category.map(|c| c.name);

    save_edited(store, task, previous_category, now).await
}

/// Partial update.
pub async fn patch_task(
    store: &dyn TaskStore,
    id: Uuid,
    patch: TaskPatch,
    now: DateTime<Utc>,
) -> Result<Task, AppError> {
    let mut task = store.get_task(id).await?;
    let previous_category = task.category_id;

    if let Some(title) = patch.title {
        task.title = validate_title(&title)?;
    }
    if let Some(description) = patch.description {
        task.description = normalize_description(description);
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(deadline) = patch.deadline {
        task.deadline = deadline;
    }
    if let Some(hours) = patch.estimated_time {
        task.estimated_time = validate_estimate(hours)?;
    }
    let by_name = patch.category_name.as_deref().filter(|n| !n.trim().is_empty());
    if by_name.is_some() || patch.category_id.is_some() {
        let category = resolve_category(store, patch.category_id.flatten(), by_name).await?;
        task.category_id = category.as_ref().map(|c| c.id);
        task.category_name = category.map(|c| c.name);
    }

    save_edited(store, task, previous_category, now).await
}

/// Recomputes the score and counts a newly associated category.
/// Moving away from a category never decrements its count.
async fn save_edited(
    store: &dyn TaskStore,
    mut task: Task,
    previous_category: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Task, AppError> {
    task.priority_score = score_task(&task, now);
    let saved = store.update_task(&task).await?;
    if let Some(category_id) = saved.category_id.filter(|id| Some(*id) != previous_category) {
        store.increment_category_usage(category_id).await?;
    }
    debug!(task_id = %saved.id, priority_score = saved.priority_score, "Task updated");
    Ok(saved)
}

pub async fn enhance_task(
    store: &dyn TaskStore,
    enricher: &Enricher,
    id: Uuid,
) -> Result<Task, AppError> {
    let task = store.get_task(id).await?;
    Ok(enricher.enrich_task(store, task).await?)
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityAnalysis {
    pub recommended_priority: Priority,
    pub priority_score: i32,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryAnalysis {
    pub recommended_category: String,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadlineSuggestion {
    pub recommended_deadline: DateTime<Utc>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnhancementSuggestions {
    pub enhanced_description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResponse {
    pub suggestions: Vec<String>,
    pub ai_powered: bool,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub priority_analysis: PriorityAnalysis,
    pub category_analysis: CategoryAnalysis,
    pub deadline_suggestion: DeadlineSuggestion,
    pub enhancement_suggestions: EnhancementSuggestions,
}

/// A validated preview request with blank optionals dropped.
struct PreviewInput<'a> {
    title: String,
    description: Option<&'a str>,
    category: Option<&'a str>,
    priority: Priority,
}

impl<'a> PreviewInput<'a> {
    fn from_request(req: &'a SuggestionRequest) -> Result<Self, AppError> {
        Ok(Self {
            title: validate_title(&req.title)?,
            description: req.description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
            category: req.category.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            priority: req.priority,
        })
    }

    fn cache_key(&self) -> String {
        SuggestionCache::key(&[
            self.title.as_str(),
            self.description.unwrap_or_default(),
            self.category.unwrap_or_default(),
            self.priority.as_str(),
        ])
    }
}

/// Suggestions for a task that has not been created. Only the provider's
/// suggestions are cached, and only when the provider answered; every
/// time-dependent field is rebuilt per request.
pub async fn suggest(
    enricher: &Enricher,
    cache: Option<&SuggestionCache>,
    req: SuggestionRequest,
    now: DateTime<Utc>,
) -> Result<SuggestionResponse, AppError> {
    let input = PreviewInput::from_request(&req)?;
    let key = input.cache_key();
    if let Some(cache) = cache {
        if let Some(suggestions) = cache.get::<Vec<String>>(&key).await {
            let cached = SuggestionPreview {
                suggestions,
                ai_powered: true,
                error: None,
            };
            return Ok(build_suggestion_response(&input, cached, now));
        }
    }

    let preview = enricher
        .preview(&input.title, input.description, input.category, input.priority)
        .await;
    if let (Some(cache), true) = (cache, preview.ai_powered) {
        cache.set(&key, &preview.suggestions).await;
    }
    Ok(build_suggestion_response(&input, preview, now))
}

fn build_suggestion_response(
    input: &PreviewInput<'_>,
    preview: SuggestionPreview,
    now: DateTime<Utc>,
) -> SuggestionResponse {
    let PreviewInput {
        title,
        description,
        category,
        priority,
    } = input;
    let (description, category, priority) = (*description, *category, *priority);
    let recommended_category = recommend_category(title, description, category);

    SuggestionResponse {
        fallback: !preview.ai_powered,
        ai_powered: preview.ai_powered,
        suggestions: preview.suggestions,
        error: preview.error,
        generated_at: now,
        priority_analysis: PriorityAnalysis {
            recommended_priority: priority,
            priority_score: compute_preview_score(priority, title, description),
            reasoning: format!(
                "{} priority recommended based on task characteristics and urgency indicators",
                priority.label()
            ),
        },
        category_analysis: CategoryAnalysis {
            confidence: if category.is_some() { 0.8 } else { 0.6 },
            reasoning: format!("Task content suggests {recommended_category} category placement"),
            recommended_category,
        },
        deadline_suggestion: DeadlineSuggestion {
            recommended_deadline: suggest_deadline(priority, now),
            reasoning: format!(
                "Recommended timeline based on {} priority level and estimated complexity",
                priority.as_str()
            ),
        },
        enhancement_suggestions: EnhancementSuggestions {
            enhanced_description: description.map(str::to_string).unwrap_or_else(|| {
                format!("Complete the task: {title} with focus on quality and timely delivery")
            }),
            tags: extract_tags(title, description, category),
        },
    }
}
