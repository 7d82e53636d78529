use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::enrichment::orchestrator::Enricher;
use crate::errors::AppError;
use crate::models::context::{ContextEntry, NewContextEntry, SourceType, MIN_CONTENT_LEN};
use crate::store::ContextStore;

#[derive(Debug, Deserialize)]
pub struct SubmitContextRequest {
    pub content: String,
    #[serde(default)]
    pub source_type: SourceType,
    pub metadata: Option<Value>,
}

/// Trims the content and checks the shape of the submission.
pub fn validate_submission(req: SubmitContextRequest) -> Result<NewContextEntry, AppError> {
    let content = req.content.trim().to_string();
    if content.chars().count() < MIN_CONTENT_LEN {
        return Err(AppError::Validation(format!(
            "Content must be at least {MIN_CONTENT_LEN} characters long"
        )));
    }

    let metadata = match req.metadata {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(map @ Value::Object(_)) => map,
        Some(_) => {
            return Err(AppError::Validation(
                "metadata must be a JSON object".to_string(),
            ))
        }
    };

    Ok(NewContextEntry {
        content,
        source_type: req.source_type,
        metadata,
    })
}

/// Persists the entry, then enriches it inline. The caller gets the entry
/// with insights already populated.
pub async fn submit(
    store: &dyn ContextStore,
    enricher: &Enricher,
    entry: NewContextEntry,
) -> Result<ContextEntry, AppError> {
    let created = store.create_context(entry).await?;
    info!(entry_id = %created.id, source = created.source_type.as_str(), "Context entry created");
    Ok(enricher.enrich_context(store, created).await?)
}

/// Re-enters processing from whatever state the entry is in.
pub async fn reprocess(
    store: &dyn ContextStore,
    enricher: &Enricher,
    id: Uuid,
) -> Result<ContextEntry, AppError> {
    let entry = store.get_context(id).await?;
    Ok(enricher.enrich_context(store, entry).await?)
}

pub fn retention_cutoff(now: DateTime<Utc>, retention_days: i64) -> DateTime<Utc> {
    now - Duration::days(retention_days)
}

pub async fn clear_old(
    store: &dyn ContextStore,
    now: DateTime<Utc>,
    retention_days: i64,
) -> Result<u64, AppError> {
    let deleted = store
        .delete_contexts_before(retention_cutoff(now, retention_days))
        .await?;
    info!(deleted, retention_days, "Cleared old context entries");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(content: &str, metadata: Option<Value>) -> SubmitContextRequest {
        SubmitContextRequest {
            content: content.to_string(),
            source_type: SourceType::Whatsapp,
            metadata,
        }
    }

    #[test]
    fn test_short_content_rejected_after_trim() {
        assert!(validate_submission(request("   hi    ", None)).is_err());
        assert!(validate_submission(request("hello", None)).is_ok());
    }

    #[test]
    fn test_metadata_defaults_to_empty_object() {
        let entry = validate_submission(request("call the plumber", None)).unwrap();
        assert_eq!(entry.metadata, json!({}));
    }

    #[test]
    fn test_non_object_metadata_rejected() {
        assert!(validate_submission(request("call the plumber", Some(json!([1, 2])))).is_err());
    }

    #[test]
    fn test_source_type_defaults_to_notes() {
        let req: SubmitContextRequest =
            serde_json::from_value(json!({"content": "buy stamps"})).unwrap();
        assert_eq!(req.source_type, SourceType::Notes);
    }

    #[test]
    fn test_retention_cutoff() {
        let now = Utc::now();
        assert_eq!(retention_cutoff(now, 30), now - Duration::days(30));
    }
}
