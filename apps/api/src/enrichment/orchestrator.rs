//! Enrichment Orchestrator: owns the provider round-trip for one entity and
//! writes the outcome back through the store.
//!
//! Context entries run in two phases (`begin_context` then `complete_context`)
//! with a persist in between, so readers can observe the in-flight state and a
//! queued executor could run the second phase later. `enrich_context` runs both
//! back to back. Provider failures never surface as errors here; only store
//! failures do.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::enrichment::diagnostics::{diagnostic_lines, FailureClass};
use crate::enrichment::fallback::{context_fallback, preview_fallback, task_fallback};
use crate::enrichment::format::{PREVIEW_FORMAT, TASK_FORMAT};
use crate::enrichment::parser::{parse_context_insights, parse_insights, parse_task_suggestions};
use crate::enrichment::prompts::{context_prompt, preview_prompt, task_prompt};
use crate::enrichment::{ContextSnapshot, TaskSnapshot};
use crate::llm_client::{LlmProvider, ProviderError, ProviderErrorKind};
use crate::models::context::{ContextEntry, ContextOutcome, ProcessingStatus, MAX_CONTEXT_INSIGHTS};
use crate::models::task::{AiInsight, Priority, Task, TaskEnhancement};
use crate::store::{ContextStore, StoreResult, TaskStore};

/// Audit confidence for suggestions that came back from the provider.
pub const PROVIDER_CONFIDENCE: f64 = 0.8;
/// Audit confidence for rule-based suggestions.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Suggestions for a task that does not exist yet.
#[derive(Debug, Clone)]
pub struct SuggestionPreview {
    pub suggestions: Vec<String>,
    /// True when the provider answered, even if nothing in the answer parsed.
    pub ai_powered: bool,
    pub error: Option<String>,
}

/// Holds the provider handle built once at startup.
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn LlmProvider>,
}

impl Enricher {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    /// A successful call with nothing but whitespace is as good as a failure.
    async fn request(&self, prompt: &str) -> Result<String, ProviderError> {
        let raw = self.provider.generate(prompt).await?;
        if raw.trim().is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::EmptyResponse,
                "No AI response received",
            ));
        }
        Ok(raw)
    }

    /// Marks the entry as in flight and persists it.
    pub async fn begin_context(
        &self,
        store: &dyn ContextStore,
        entry: ContextEntry,
    ) -> StoreResult<ContextEntry> {
        store
            .set_context_status(entry.id, ProcessingStatus::Processing)
            .await
    }

    /// Calls the provider and persists the terminal state. Only the
    /// enrichment columns are written, so edits made during the call stand.
    pub async fn complete_context(
        &self,
        store: &dyn ContextStore,
        entry: ContextEntry,
    ) -> StoreResult<ContextEntry> {
        let snapshot = ContextSnapshot::from(&entry);
        let result = self.request(&context_prompt(&snapshot)).await;
        let (status, insights) = context_outcome(&snapshot, result, self.provider.name());

        match status {
            ProcessingStatus::Processed => info!(
                entry_id = %entry.id,
                insights = insights.len(),
                "Context entry processed"
            ),
            _ => warn!(entry_id = %entry.id, "Context entry fell back to rule-based insights"),
        }

        let outcome = ContextOutcome {
            status,
            insights,
            processed_at: Utc::now(),
        };
        store
            .record_context_outcome(entry.id, &outcome)
            .await
            .inspect_err(|e| {
                error!(entry_id = %entry.id, "Failed to persist enrichment result: {e}");
            })
    }

    pub async fn enrich_context(
        &self,
        store: &dyn ContextStore,
        entry: ContextEntry,
    ) -> StoreResult<ContextEntry> {
        let entry = self.begin_context(store, entry).await?;
        self.complete_context(store, entry).await
    }

    /// Enhances a task and writes one audit row per suggestion. The write
    /// touches only the enrichment columns and rescores from the stored row,
    /// so edits made while the provider was working survive. Tasks have no
    /// failed status: a fallback run leaves `ai_enhanced` false with the
    /// rule-based suggestions in place.
    pub async fn enrich_task(&self, store: &dyn TaskStore, task: Task) -> StoreResult<Task> {
        let now = Utc::now();
        let (ai_suggestions, ai_enhanced) = {
            let snapshot = TaskSnapshot::from(&task);
            let result = self.request(&task_prompt(&snapshot)).await;
            task_outcome(&snapshot, result, self.provider.name(), now)
        };

        let enhancement = TaskEnhancement {
            ai_suggestions,
            ai_enhanced,
            processed_at: now,
        };
        let task = store
            .record_enhancement(task.id, &enhancement)
            .await
            .inspect_err(|e| {
                error!(task_id = %task.id, "Failed to persist task enhancement: {e}");
            })?;
        info!(
            task_id = %task.id,
            ai_enhanced = task.ai_enhanced,
            suggestions = task.ai_suggestions.len(),
            priority_score = task.priority_score,
            "Task enhanced"
        );

        let audit = audit_records(task.id, &task.ai_suggestions, task.ai_enhanced, now);
        if let Err(e) = store.record_insights(&audit).await {
            // Audit rows are detachable; the task itself is already saved.
            error!(task_id = %task.id, "Failed to record AI insights: {e}");
        }
        Ok(task)
    }

    pub async fn preview(
        &self,
        title: &str,
        description: Option<&str>,
        category: Option<&str>,
        priority: Priority,
    ) -> SuggestionPreview {
        let prompt = preview_prompt(title, description, category, priority);
        match self.request(&prompt).await {
            Ok(raw) => {
                let mut suggestions = parse_insights(&raw, &PREVIEW_FORMAT);
                if suggestions.is_empty() {
                    suggestions = preview_fallback(title, priority, category);
                }
                SuggestionPreview {
                    suggestions,
                    ai_powered: true,
                    error: None,
                }
            }
            Err(err) => {
                warn!(
                    failure = FailureClass::classify(&err).as_str(),
                    "Suggestion preview fell back: {}", err.message
                );
                SuggestionPreview {
                    suggestions: preview_fallback(title, priority, category),
                    ai_powered: false,
                    error: Some(err.message),
                }
            }
        }
    }
}

/// Context terminal state: parsed insights on success; diagnostics followed by
/// the rule-based insights on failure. Never empty, never above the bound.
pub fn context_outcome(
    entry: &ContextSnapshot<'_>,
    result: Result<String, ProviderError>,
    provider: &str,
) -> (ProcessingStatus, Vec<String>) {
    match result {
        Ok(raw) => (ProcessingStatus::Processed, parse_context_insights(&raw)),
        Err(err) => {
            warn!(
                failure = FailureClass::classify(&err).as_str(),
                "{provider} call failed: {}", err.message
            );
            let mut insights = diagnostic_lines(&err, provider);
            insights.extend(context_fallback(entry));
            insights.truncate(MAX_CONTEXT_INSIGHTS);
            (ProcessingStatus::Failed, insights)
        }
    }
}

/// Task suggestions and the `ai_enhanced` flag. Diagnostics are logged only,
/// the stored list is the rule-based one.
pub fn task_outcome(
    task: &TaskSnapshot<'_>,
    result: Result<String, ProviderError>,
    provider: &str,
    now: DateTime<Utc>,
) -> (Vec<String>, bool) {
    match result {
        Ok(raw) => (parse_task_suggestions(&raw, task, now), true),
        Err(err) => {
            warn!(
                failure = FailureClass::classify(&err).as_str(),
                diagnostics = ?diagnostic_lines(&err, provider),
                "{provider} call failed for task"
            );
            (task_fallback(task, now), false)
        }
    }
}

fn audit_records(
    task_id: Uuid,
    suggestions: &[String],
    enhanced: bool,
    now: DateTime<Utc>,
) -> Vec<AiInsight> {
    let confidence_score = if enhanced {
        PROVIDER_CONFIDENCE
    } else {
        FALLBACK_CONFIDENCE
    };
    suggestions
        .iter()
        .map(|content| AiInsight {
            id: Uuid::new_v4(),
            task_id,
            insight_type: TASK_FORMAT
                .slot_for(content)
                .map(|slot| slot.key)
                .unwrap_or("suggestion")
                .to_string(),
            content: content.clone(),
            confidence_score,
            applied: false,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::ScriptedProvider;
    use crate::models::context::{NewContextEntry, SourceType};
    use crate::models::task::{NewTask, TaskStatus};
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    const CONTEXT_REPLY: &str = "\
🎯 Priority: high - client deliverable due tomorrow
📂 Category: Work - report for a client
📌 Main task: Submit the report to the client";

    const TASK_REPLY: &str = "\
🧩 Task Breakdown: outline, draft, review
⏰ Time Management: two focused sessions
Some chatter the parser should ignore
🤖 AI Recommendation: start with the outline";

    fn enricher(provider: ScriptedProvider) -> Enricher {
        Enricher::new(Arc::new(provider))
    }

    async fn seeded_entry(store: &MemoryStore, content: &str) -> ContextEntry {
        store
            .create_context(NewContextEntry {
                content: content.to_string(),
                source_type: SourceType::Email,
                metadata: json!({}),
            })
            .await
            .unwrap()
    }

    async fn seeded_task(store: &MemoryStore) -> Task {
        store
            .create_task(NewTask {
                title: "Write quarterly report".to_string(),
                description: Some("Numbers for the board".to_string()),
                category_id: None,
                priority: Priority::High,
                priority_score: 0,
                status: TaskStatus::Pending,
                deadline: None,
                estimated_time: Some(5.0),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_context_success_stores_parsed_insights() {
        let store = MemoryStore::new();
        let entry = seeded_entry(&store, "URGENT: submit report to client by tomorrow").await;
        let enriched = enricher(ScriptedProvider::replying(CONTEXT_REPLY))
            .enrich_context(&store, entry)
            .await
            .unwrap();

        assert_eq!(enriched.processing_status, ProcessingStatus::Processed);
        assert_eq!(enriched.insights.len(), 3);
        assert!(enriched.processed_at.is_some());
        let stored = store.get_context(enriched.id).await.unwrap();
        assert_eq!(stored.insights, enriched.insights);
    }

    #[tokio::test]
    async fn test_quota_error_fails_with_diagnostics_and_fallback() {
        let store = MemoryStore::new();
        let entry = seeded_entry(&store, "URGENT: submit report to client by tomorrow").await;
        let provider = ScriptedProvider::failing(ProviderError::from_message(
            "429 QUOTA_EXCEEDED: quota exceeded for generate requests",
        ));
        let enriched = enricher(provider).enrich_context(&store, entry).await.unwrap();

        assert_eq!(enriched.processing_status, ProcessingStatus::Failed);
        assert!(enriched.insights[0].contains("Quota Exceeded"));
        assert!(enriched.insights.iter().any(|i| i.starts_with("🎯 Priority: High")));
        assert!(enriched.insights.len() <= MAX_CONTEXT_INSIGHTS);
        let stored = store.get_context(enriched.id).await.unwrap();
        assert_eq!(stored.processing_status, ProcessingStatus::Failed);
        assert!(!stored.insights.is_empty());
    }

    #[tokio::test]
    async fn test_every_failure_mode_resolves_to_terminal_state() {
        let failures = vec![
            Err(ProviderError::new(ProviderErrorKind::Timeout, "deadline exceeded")),
            Err(ProviderError::from_message("API_KEY_INVALID")),
            Err(ProviderError::new(ProviderErrorKind::ContentSafety, "blocked")),
            Ok("   \n  ".to_string()),
            Ok("no glyphs, no labels, nothing useful".to_string()),
        ];
        for outcome in failures {
            let store = MemoryStore::new();
            let entry = seeded_entry(&store, "Pick up groceries on the way home").await;
            let enriched = enricher(ScriptedProvider::new(vec![outcome]))
                .enrich_context(&store, entry)
                .await
                .unwrap();
            assert!(matches!(
                enriched.processing_status,
                ProcessingStatus::Processed | ProcessingStatus::Failed
            ));
            assert!(!enriched.insights.is_empty());
            assert!(enriched.insights.len() <= MAX_CONTEXT_INSIGHTS);
        }
    }

    #[tokio::test]
    async fn test_begin_context_persists_processing_state() {
        let store = MemoryStore::new();
        let entry = seeded_entry(&store, "Renew the car insurance").await;
        let enricher = enricher(ScriptedProvider::replying(CONTEXT_REPLY));

        let in_flight = enricher.begin_context(&store, entry).await.unwrap();
        let observed = store.get_context(in_flight.id).await.unwrap();
        assert_eq!(observed.processing_status, ProcessingStatus::Processing);

        let done = enricher.complete_context(&store, in_flight).await.unwrap();
        assert_eq!(done.processing_status, ProcessingStatus::Processed);
    }

    #[tokio::test]
    async fn test_task_success_marks_enhanced_and_scores() {
        let store = MemoryStore::new();
        let task = seeded_task(&store).await;
        let enhanced = enricher(ScriptedProvider::replying(TASK_REPLY))
            .enrich_task(&store, task)
            .await
            .unwrap();

        assert!(enhanced.ai_enhanced);
        assert_eq!(enhanced.ai_suggestions.len(), 3);
        // high (75) + 5h effort (5)
        assert_eq!(enhanced.priority_score, 80);
        assert!(enhanced.ai_processed_at.is_some());

        let audit = store.list_insights(enhanced.id).await.unwrap();
        assert_eq!(audit.len(), 3);
        assert!(audit.iter().all(|i| i.confidence_score == PROVIDER_CONFIDENCE));
        assert!(audit.iter().any(|i| i.insight_type == "breakdown"));
    }

    #[tokio::test]
    async fn test_task_failure_has_no_failed_status() {
        let store = MemoryStore::new();
        let task = seeded_task(&store).await;
        let provider = ScriptedProvider::failing(ProviderError::from_message("QUOTA_EXCEEDED"));
        let enhanced = enricher(provider).enrich_task(&store, task).await.unwrap();

        // Unlike context entries there is no failed state: the task keeps its
        // workflow status and only `ai_enhanced` records the degradation.
        assert_eq!(enhanced.status, TaskStatus::Pending);
        assert!(!enhanced.ai_enhanced);
        assert_eq!(enhanced.ai_suggestions.len(), 8);
        assert!(enhanced.ai_processed_at.is_some());
        assert_eq!(enhanced.priority_score, 80);

        let audit = store.list_insights(enhanced.id).await.unwrap();
        assert!(audit.iter().all(|i| i.confidence_score == FALLBACK_CONFIDENCE));
    }

    #[tokio::test]
    async fn test_task_unparseable_reply_uses_fallback_but_stays_enhanced() {
        let store = MemoryStore::new();
        let task = seeded_task(&store).await;
        let enhanced = enricher(ScriptedProvider::replying("I cannot help with that."))
            .enrich_task(&store, task)
            .await
            .unwrap();
        assert!(enhanced.ai_enhanced);
        assert_eq!(enhanced.ai_suggestions.len(), 8);
    }

    #[tokio::test]
    async fn test_prompt_carries_entity_fields() {
        let store = MemoryStore::new();
        let task = seeded_task(&store).await;
        let provider = Arc::new(ScriptedProvider::replying(TASK_REPLY));
        Enricher::new(provider.clone())
            .enrich_task(&store, task)
            .await
            .unwrap();
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Write quarterly report"));
        assert!(prompts[0].contains("Numbers for the board"));
    }

    #[tokio::test]
    async fn test_preview_falls_back_on_error() {
        let provider = ScriptedProvider::failing(ProviderError::from_message("socket hang up"));
        let preview = enricher(provider)
            .preview("Plan launch", None, None, Priority::Medium)
            .await;
        assert!(!preview.ai_powered);
        assert_eq!(preview.suggestions.len(), 7);
        assert_eq!(preview.error.as_deref(), Some("socket hang up"));
    }

    #[tokio::test]
    async fn test_preview_caps_at_seven() {
        let reply = (0..12)
            .map(|i| format!("🚀 use technique number {i} for this"))
            .collect::<Vec<_>>()
            .join("\n");
        let preview = enricher(ScriptedProvider::replying(&reply))
            .preview("Plan launch", None, Some("Work"), Priority::High)
            .await;
        assert!(preview.ai_powered);
        assert_eq!(preview.suggestions.len(), 7);
    }

    #[test]
    fn test_unknown_lines_audited_as_suggestion() {
        let audit = audit_records(
            Uuid::new_v4(),
            &["plain text suggestion".to_string()],
            false,
            Utc::now(),
        );
        assert_eq!(audit[0].insight_type, "suggestion");
    }
}
