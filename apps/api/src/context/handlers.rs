use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::context::service::{self, SubmitContextRequest};
use crate::context::stats::{compute_context_stats, ContextStats};
use crate::enrichment::health::{check_provider, ProviderHealth};
use crate::errors::AppError;
use crate::models::context::{ContextEntry, ProcessingStatus};
use crate::state::AppState;
use crate::store::ContextFilter;

/// Entry as returned by the API, with its insight count alongside.
#[derive(Debug, Serialize)]
pub struct ContextEntryView {
    #[serde(flatten)]
    pub entry: ContextEntry,
    pub insights_count: usize,
}

impl From<ContextEntry> for ContextEntryView {
    fn from(entry: ContextEntry) -> Self {
        let insights_count = entry.insights_count();
        Self {
            entry,
            insights_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReprocessResponse {
    pub message: String,
    pub new_insights: Vec<String>,
    pub processing_status: ProcessingStatus,
    pub entry: ContextEntryView,
}

#[derive(Debug, Serialize)]
pub struct ClearOldResponse {
    pub message: String,
    pub deleted_count: u64,
}

/// POST /api/context/entries
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitContextRequest>,
) -> Result<(StatusCode, Json<ContextEntryView>), AppError> {
    let new_entry = service::validate_submission(req)?;
    let entry = service::submit(state.contexts.as_ref(), &state.enricher, new_entry).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// GET /api/context/entries
pub async fn handle_list(
    State(state): State<AppState>,
    Query(filter): Query<ContextFilter>,
) -> Result<Json<Vec<ContextEntryView>>, AppError> {
    let entries = state.contexts.list_contexts(&filter).await?;
    Ok(Json(entries.into_iter().map(ContextEntryView::from).collect()))
}

/// GET /api/context/entries/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContextEntryView>, AppError> {
    let entry = state.contexts.get_context(id).await?;
    Ok(Json(entry.into()))
}

/// DELETE /api/context/entries/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.contexts.delete_context(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/context/entries/:id/reprocess
pub async fn handle_reprocess(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReprocessResponse>, AppError> {
    let entry = service::reprocess(state.contexts.as_ref(), &state.enricher, id).await?;
    let message = match entry.processing_status {
        ProcessingStatus::Processed => format!(
            "Entry reprocessed successfully with {}",
            state.enricher.provider().name()
        ),
        _ => "Entry reprocessed with fallback analysis".to_string(),
    };
    Ok(Json(ReprocessResponse {
        message,
        new_insights: entry.insights.clone(),
        processing_status: entry.processing_status,
        entry: entry.into(),
    }))
}

/// GET /api/context/entries/ai_status and GET /api/context/health
pub async fn handle_ai_status(State(state): State<AppState>) -> Json<ProviderHealth> {
    Json(check_provider(state.enricher.provider()).await)
}

/// GET /api/context/entries/stats
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<ContextStats>, AppError> {
    let entries = state.contexts.list_contexts(&ContextFilter::default()).await?;
    Ok(Json(compute_context_stats(&entries, Utc::now())))
}

/// DELETE /api/context/entries/clear_old
pub async fn handle_clear_old(
    State(state): State<AppState>,
) -> Result<Json<ClearOldResponse>, AppError> {
    let deleted_count = service::clear_old(
        state.contexts.as_ref(),
        Utc::now(),
        state.config.context_retention_days,
    )
    .await?;
    Ok(Json(ClearOldResponse {
        message: format!("Deleted {deleted_count} old entries"),
        deleted_count,
    }))
}
