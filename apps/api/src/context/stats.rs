use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::context::{ContextEntry, ProcessingStatus, SourceType};

const RECENT_WINDOW_DAYS: i64 = 7;
const RECENT_LIMIT: usize = 5;
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Serialize)]
pub struct RecentActivity {
    pub id: Uuid,
    pub content: String,
    pub source_type: SourceType,
    pub processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub insights_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ContextStats {
    pub total_entries: usize,
    pub whatsapp_count: usize,
    pub email_count: usize,
    pub notes_count: usize,
    pub processed_count: usize,
    pub failed_count: usize,
    pub processing_count: usize,
    /// Summed over processed entries only.
    pub total_insights: usize,
    /// Processed / total × 100, one decimal.
    pub ai_success_rate: f64,
    pub recent_activity: Vec<RecentActivity>,
}

fn clip_content(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        format!("{}...", content.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        content.to_string()
    }
}

/// Read-only rollup over every stored entry.
pub fn compute_context_stats(entries: &[ContextEntry], now: DateTime<Utc>) -> ContextStats {
    let by_source = |s: SourceType| entries.iter().filter(|e| e.source_type == s).count();
    let by_status = |s: ProcessingStatus| {
        entries
            .iter()
            .filter(|e| e.processing_status == s)
            .count()
    };

    let total_entries = entries.len();
    let processed_count = by_status(ProcessingStatus::Processed);
    let total_insights = entries
        .iter()
        .filter(|e| e.processing_status == ProcessingStatus::Processed)
        .map(ContextEntry::insights_count)
        .sum();

    let ai_success_rate = if total_entries == 0 {
        0.0
    } else {
        (processed_count as f64 / total_entries as f64 * 1000.0).round() / 10.0
    };

    let window_start = now - Duration::days(RECENT_WINDOW_DAYS);
    let mut recent: Vec<&ContextEntry> = entries
        .iter()
        .filter(|e| e.created_at >= window_start)
        .collect();
    recent.sort_by_key(|e| Reverse(e.created_at));
    let recent_activity = recent
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|e| RecentActivity {
            id: e.id,
            content: clip_content(&e.content),
            source_type: e.source_type,
            processing_status: e.processing_status,
            created_at: e.created_at,
            insights_count: e.insights_count(),
        })
        .collect();

    ContextStats {
        total_entries,
        whatsapp_count: by_source(SourceType::Whatsapp),
        email_count: by_source(SourceType::Email),
        notes_count: by_source(SourceType::Notes),
        processed_count,
        failed_count: by_status(ProcessingStatus::Failed),
        processing_count: by_status(ProcessingStatus::Processing),
        total_insights,
        ai_success_rate,
        recent_activity,
    }
}
