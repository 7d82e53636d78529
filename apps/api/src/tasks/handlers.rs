use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enrichment::health::{check_provider, ProviderHealth};
use crate::errors::AppError;
use crate::models::task::{AiInsight, Category, NewCategory, Task};
use crate::state::AppState;
use crate::store::TaskFilter;
use crate::tasks::analysis::{compute_contextual_analysis, ContextualAnalysis};
use crate::tasks::service::{
    self, SuggestionRequest, SuggestionResponse, TaskInput, TaskPatch,
};

#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub ai_suggestions_count: usize,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            ai_suggestions_count: task.ai_suggestions.len(),
            task,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnhanceResponse {
    pub message: String,
    pub ai_suggestions: Vec<String>,
    pub ai_enhanced: bool,
    pub task: TaskView,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// POST /api/tasks
pub async fn handle_create(
    State(state): State<AppState>,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<TaskView>), AppError> {
    let task =
        service::create_task(state.tasks.as_ref(), &state.enricher, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

/// GET /api/tasks
pub async fn handle_list(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<TaskView>>, AppError> {
    let tasks = state.tasks.list_tasks(&filter).await?;
    Ok(Json(tasks.into_iter().map(TaskView::from).collect()))
}

/// GET /api/tasks/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskView>, AppError> {
    Ok(Json(state.tasks.get_task(id).await?.into()))
}

/// PUT /api/tasks/:id
pub async fn handle_replace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TaskInput>,
) -> Result<Json<TaskView>, AppError> {
    let task = service::replace_task(state.tasks.as_ref(), id, input, Utc::now()).await?;
    Ok(Json(task.into()))
}

/// PATCH /api/tasks/:id
pub async fn handle_patch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<TaskView>, AppError> {
    let task = service::patch_task(state.tasks.as_ref(), id, patch, Utc::now()).await?;
    Ok(Json(task.into()))
}

/// DELETE /api/tasks/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.tasks.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/:id/enhance_with_ai
pub async fn handle_enhance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EnhanceResponse>, AppError> {
    let task = service::enhance_task(state.tasks.as_ref(), &state.enricher, id).await?;
    let message = if task.ai_enhanced {
        format!("Task enhanced with {}", state.enricher.provider().name())
    } else {
        "Task enhanced with fallback suggestions".to_string()
    };
    Ok(Json(EnhanceResponse {
        message,
        ai_suggestions: task.ai_suggestions.clone(),
        ai_enhanced: task.ai_enhanced,
        task: task.into(),
    }))
}

/// GET /api/tasks/:id/insights
pub async fn handle_insights(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AiInsight>>, AppError> {
    Ok(Json(state.tasks.list_insights(id).await?))
}

/// POST /api/tasks/get_ai_suggestions
pub async fn handle_suggestions(
    State(state): State<AppState>,
    Json(req): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let response =
        service::suggest(&state.enricher, state.cache.as_ref(), req, Utc::now()).await?;
    Ok(Json(response))
}

/// GET /api/tasks/contextual_analysis
pub async fn handle_contextual_analysis(
    State(state): State<AppState>,
) -> Result<Json<ContextualAnalysis>, AppError> {
    let tasks = state.tasks.list_tasks(&TaskFilter::default()).await?;
    Ok(Json(compute_contextual_analysis(&tasks, Utc::now())))
}

/// GET /api/tasks/ai_status
pub async fn handle_ai_status(State(state): State<AppState>) -> Json<ProviderHealth> {
    Json(check_provider(state.enricher.provider()).await)
}

/// GET /api/tasks/categories
pub async fn handle_list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.tasks.list_categories().await?))
}

/// POST /api/tasks/categories
pub async fn handle_create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let name = service::validate_category_name(&req.name)?;
    let mut category = NewCategory::styled(&name);
    if let Some(icon) = req.icon.filter(|i| !i.trim().is_empty()) {
        category.icon = icon;
    }
    if let Some(color) = req.color {
        if !is_hex_color(&color) {
            return Err(AppError::Validation(format!(
                "color must look like #RRGGBB, got '{color}'"
            )));
        }
        category.color = color;
    }
    let created = state.tasks.create_category(category).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/tasks/categories/:id
pub async fn handle_get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.tasks.get_category(id).await?))
}

/// DELETE /api/tasks/categories/:id
pub async fn handle_delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.tasks.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_check() {
        assert!(is_hex_color("#3B82F6"));
        assert!(!is_hex_color("3B82F6"));
        assert!(!is_hex_color("#3B82FZ"));
        assert!(!is_hex_color("#FFF"));
    }
}
