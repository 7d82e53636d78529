pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::context::handlers as context;
use crate::errors::AppError;
use crate::state::AppState;
use crate::tasks::handlers as tasks;

async fn route_not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Context entries
        .route(
            "/api/context/entries",
            get(context::handle_list).post(context::handle_submit),
        )
        .route("/api/context/entries/ai_status", get(context::handle_ai_status))
        .route("/api/context/entries/stats", get(context::handle_stats))
        .route(
            "/api/context/entries/clear_old",
            delete(context::handle_clear_old),
        )
        .route(
            "/api/context/entries/:id",
            get(context::handle_get).delete(context::handle_delete),
        )
        .route(
            "/api/context/entries/:id/reprocess",
            post(context::handle_reprocess),
        )
        .route("/api/context/health", get(context::handle_ai_status))
        // Tasks
        .route("/api/tasks", get(tasks::handle_list).post(tasks::handle_create))
        .route("/api/tasks/ai_status", get(tasks::handle_ai_status))
        .route(
            "/api/tasks/contextual_analysis",
            get(tasks::handle_contextual_analysis),
        )
        .route(
            "/api/tasks/get_ai_suggestions",
            post(tasks::handle_suggestions),
        )
        .route(
            "/api/tasks/categories",
            get(tasks::handle_list_categories).post(tasks::handle_create_category),
        )
        .route(
            "/api/tasks/categories/:id",
            get(tasks::handle_get_category).delete(tasks::handle_delete_category),
        )
        .route(
            "/api/tasks/:id",
            get(tasks::handle_get)
                .put(tasks::handle_replace)
                .patch(tasks::handle_patch)
                .delete(tasks::handle_delete),
        )
        .route("/api/tasks/:id/enhance_with_ai", post(tasks::handle_enhance))
        .route("/api/tasks/:id/insights", get(tasks::handle_insights))
        .fallback(route_not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::enrichment::orchestrator::Enricher;
    use crate::llm_client::mock::ScriptedProvider;
    use crate::llm_client::ProviderError;
    use crate::store::memory::MemoryStore;

    fn test_config() -> Config {
        Config {
            database_url: None,
            redis_url: None,
            gemini_api_key: "test-key".to_string(),
            gemini_api_base: "http://localhost".to_string(),
            ai_model: "scripted-1".to_string(),
            ai_timeout: Duration::from_secs(1),
            ai_retry_attempts: 0,
            ai_max_tokens: 800,
            ai_temperature: 0.7,
            ai_cache_ttl: Duration::from_secs(60),
            context_retention_days: 30,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn app(provider: ScriptedProvider) -> Router {
        let store = MemoryStore::new();
        build_router(AppState {
            contexts: Arc::new(store.clone()),
            tasks: Arc::new(store),
            enricher: Enricher::new(Arc::new(provider)),
            cache: None,
            config: test_config(),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(ScriptedProvider::replying("OK"));
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_context_submit_returns_enriched_entry() {
        let app = app(ScriptedProvider::replying(
            "🎯 Priority: High - client is waiting\n💡 Key insight: the report is overdue",
        ));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/context/entries",
            Some(json!({"content": "Send the quarterly report to the client", "source_type": "email"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["processing_status"], "processed");
        assert_eq!(body["insights_count"], 2);

        let (status, list) = send(&app, Method::GET, "/api/context/entries?source_type=email", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_context_submit_rejects_short_content() {
        let app = app(ScriptedProvider::replying("OK"));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/context/entries",
            Some(json!({"content": " hi "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_failed_context_counts_in_stats() {
        let app = app(ScriptedProvider::failing(ProviderError::from_message(
            "API_KEY_INVALID: API key not valid.",
        )));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/context/entries",
            Some(json!({"content": "URGENT: renew passport before the trip"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["processing_status"], "failed");

        let (_, stats) = send(&app, Method::GET, "/api/context/entries/stats", None).await;
        assert_eq!(stats["failed_count"], 1);
        assert_eq!(stats["ai_success_rate"], 0.0);
    }

    #[tokio::test]
    async fn test_missing_entry_is_404() {
        let app = app(ScriptedProvider::replying("OK"));
        let uri = format!("/api/context/entries/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_task_lifecycle() {
        let app = app(ScriptedProvider::replying(
            "🧩 Task Breakdown: draft, review, send\n🤖 AI Recommendation: start with the outline",
        ));
        let (status, task) = send(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({"title": "Write launch email", "category_name": "Work", "priority": "high"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["ai_enhanced"], true);
        assert_eq!(task["ai_suggestions_count"], 2);
        assert_eq!(task["priority_score"], 85);
        let id = task["id"].as_str().unwrap().to_string();

        let (status, patched) = send(
            &app,
            Method::PATCH,
            &format!("/api/tasks/{id}"),
            Some(json!({"status": "completed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["status"], "completed");

        let (_, insights) = send(&app, Method::GET, &format!("/api/tasks/{id}/insights"), None).await;
        assert_eq!(insights.as_array().map(Vec::len), Some(2));

        let (_, categories) = send(&app, Method::GET, "/api/tasks/categories", None).await;
        assert_eq!(categories[0]["name"], "Work");
        assert_eq!(categories[0]["usage_count"], 1);

        let (status, _) = send(&app, Method::DELETE, &format!("/api/tasks/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_enhance_reports_fallback() {
        let app = app(ScriptedProvider::new(vec![
            Ok("🧩 Task Breakdown: split it into three steps".to_string()),
            Err(ProviderError::from_message("RESOURCE_EXHAUSTED: quota")),
        ]));
        let (_, task) = send(&app, Method::POST, "/api/tasks", Some(json!({"title": "Book dentist"}))).await;
        let id = task["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/tasks/{id}/enhance_with_ai"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ai_enhanced"], false);
        assert_eq!(body["ai_suggestions"].as_array().map(Vec::len), Some(8));
    }

    #[tokio::test]
    async fn test_duplicate_category_is_400() {
        let app = app(ScriptedProvider::replying("OK"));
        let body = json!({"name": "Garden"});
        let (status, created) = send(&app, Method::POST, "/api/tasks/categories", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["icon"], "📋");
        let (status, _) = send(&app, Method::POST, "/api/tasks/categories", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_suggestions_preview() {
        let app = app(ScriptedProvider::replying("🧩 Task Breakdown: gather receipts and totals"));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/tasks/get_ai_suggestions",
            Some(json!({"title": "Prepare tax return", "priority": "urgent"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ai_powered"], true);
        assert_eq!(body["priority_analysis"]["priority_score"], 100);
    }

    #[tokio::test]
    async fn test_ai_status_connected() {
        let app = app(ScriptedProvider::replying("OK"));
        let (status, body) = send(&app, Method::GET, "/api/tasks/ai_status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ai_connected"], true);
    }

    #[tokio::test]
    async fn test_tasks_filter_by_creation_date() {
        let app = app(ScriptedProvider::replying("🧩 Task Breakdown: pick a date and call the office"));
        send(&app, Method::POST, "/api/tasks", Some(json!({"title": "Book dentist"}))).await;

        let (status, recent) =
            send(&app, Method::GET, "/api/tasks?created_after=2000-01-01T00:00:00Z", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(recent.as_array().map(Vec::len), Some(1));

        let (_, old) = send(&app, Method::GET, "/api/tasks?created_before=2000-01-01T00:00:00Z", None).await;
        assert_eq!(old.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = app(ScriptedProvider::replying("OK"));
        let (status, body) = send(&app, Method::GET, "/api/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
