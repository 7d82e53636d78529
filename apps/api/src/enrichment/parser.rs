//! Insight Parser: raw model text into a bounded, ordered list of tagged lines.
//!
//! Pure text transformation: no I/O, deterministic given its input.

use chrono::{DateTime, Utc};

use crate::enrichment::fallback::task_fallback;
use crate::enrichment::format::{InsightFormat, CONTEXT_FORMAT, TASK_FORMAT};
use crate::enrichment::TaskSnapshot;

/// Lines with fewer characters than this are treated as noise.
pub const MIN_LINE_CHARS: usize = 10;

/// Stored when a context response parsed to nothing usable.
pub const NO_STRUCTURED_INSIGHTS: &str =
    "ℹ️ Processing complete - no structured insights could be extracted";

/// Keeps every line that leads with a known glyph, glyphs the lines that lead
/// with a known `label:` prefix, drops the rest, and truncates to the
/// format's bound preserving source order. May return an empty list.
pub fn parse_insights(raw: &str, format: &InsightFormat) -> Vec<String> {
    raw.lines()
        .filter_map(|line| accept_line(line, format))
        .take(format.max_items)
        .collect()
}

/// Context path: never empty, at most 10 items.
pub fn parse_context_insights(raw: &str) -> Vec<String> {
    let insights = parse_insights(raw, &CONTEXT_FORMAT);
    if insights.is_empty() {
        return vec![NO_STRUCTURED_INSIGHTS.to_string()];
    }
    insights
}

/// Task path: an unusable response delegates to the fallback generator,
/// so the result is never empty and holds at most 8 items.
pub fn parse_task_suggestions(
    raw: &str,
    task: &TaskSnapshot<'_>,
    now: DateTime<Utc>,
) -> Vec<String> {
    let suggestions = parse_insights(raw, &TASK_FORMAT);
    if suggestions.is_empty() {
        return task_fallback(task, now);
    }
    suggestions
}

fn accept_line(line: &str, format: &InsightFormat) -> Option<String> {
    let line = strip_list_marker(line.trim());
    if line.chars().count() < MIN_LINE_CHARS {
        return None;
    }

    if format.slot_for(line).is_some() {
        return Some(line.to_string());
    }

    let lower = line.to_lowercase();
    format
        .slots
        .iter()
        .find(|slot| lower.starts_with(&slot.prefix()))
        .map(|slot| format!("{} {}", slot.glyph, line))
}

/// Strips a leading `-`, `*`, `•` or `1.`/`1)` list marker.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(&['-', '*', '•'][..]).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(&['.', ')'][..]) {
            return rest.trim_start();
        }
    }
    line
}
