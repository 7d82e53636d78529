//! Insight line formats: one lead glyph and one textual label per semantic slot.
//!
//! The same tables drive prompt construction, response parsing, fallback
//! synthesis and the `insight_type` tag on audit records.

use crate::models::context::MAX_CONTEXT_INSIGHTS;
use crate::models::task::MAX_TASK_SUGGESTIONS;

/// Suggestion-preview responses carry at most this many lines.
pub const MAX_PREVIEW_SUGGESTIONS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsightSlot {
    /// Stable machine tag, used as `insight_type`.
    pub key: &'static str,
    pub glyph: &'static str,
    pub label: &'static str,
    /// Placeholder shown to the model in the output-format block.
    pub hint: &'static str,
}

impl InsightSlot {
    /// Renders a complete insight line for this slot.
    pub fn line(&self, body: impl AsRef<str>) -> String {
        format!("{} {}: {}", self.glyph, self.label, body.as_ref())
    }

    /// Renders a glyph-only line (suggestion previews carry no labels).
    pub fn bare(&self, body: impl AsRef<str>) -> String {
        format!("{} {}", self.glyph, body.as_ref())
    }

    /// First scalar of the glyph. Models frequently drop the variation
    /// selector, so matching is done on this alone.
    pub fn lead_char(&self) -> Option<char> {
        self.glyph.chars().next()
    }

    /// Lowercased `label:` prefix recognised on unglyphed lines.
    pub fn prefix(&self) -> String {
        format!("{}:", self.label.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InsightFormat {
    pub slots: &'static [InsightSlot],
    pub max_items: usize,
}

impl InsightFormat {
    /// The slot whose glyph leads `line`, if any.
    pub fn slot_for(&self, line: &str) -> Option<&'static InsightSlot> {
        let first = line.chars().next()?;
        self.slots.iter().find(|s| s.lead_char() == Some(first))
    }

    /// Output-format block embedded in prompts, one `glyph label: hint` line per slot.
    pub fn instruction_block(&self) -> String {
        self.slots
            .iter()
            .map(|s| format!("{} {}: {}", s.glyph, s.label, s.hint))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub mod context_slots {
    use super::InsightSlot;

    pub const PRIORITY: InsightSlot = InsightSlot {
        key: "priority",
        glyph: "🎯",
        label: "Priority",
        hint: "[urgent/high/medium/low] - [specific reason why this priority level]",
    };
    pub const CATEGORY: InsightSlot = InsightSlot {
        key: "category",
        glyph: "📂",
        label: "Category",
        hint: "[Work/Personal/Health/Learning/Family/Finance/Travel/Shopping] - [reasoning for this category]",
    };
    pub const TIME_ESTIMATE: InsightSlot = InsightSlot {
        key: "time_estimate",
        glyph: "⏱️",
        label: "Time estimate",
        hint: "[X hours/minutes] - [complexity analysis and reasoning]",
    };
    pub const MAIN_TASK: InsightSlot = InsightSlot {
        key: "main_task",
        glyph: "📌",
        label: "Main task",
        hint: "[specific, actionable item that needs to be completed]",
    };
    pub const KEY_INSIGHT: InsightSlot = InsightSlot {
        key: "key_insight",
        glyph: "💡",
        label: "Key insight",
        hint: "[important observation or pattern identified in the content]",
    };
    pub const RECOMMENDATION: InsightSlot = InsightSlot {
        key: "recommendation",
        glyph: "⚡",
        label: "Recommendation",
        hint: "[specific next step or action to take]",
    };
    pub const DEADLINE: InsightSlot = InsightSlot {
        key: "deadline",
        glyph: "📅",
        label: "Suggested deadline",
        hint: "[realistic timeframe based on priority and complexity]",
    };
    pub const TIP: InsightSlot = InsightSlot {
        key: "tip",
        glyph: "✨",
        label: "Smart tip",
        hint: "[productivity enhancement or efficiency suggestion]",
    };

    pub const ALL: [InsightSlot; 8] = [
        PRIORITY,
        CATEGORY,
        TIME_ESTIMATE,
        MAIN_TASK,
        KEY_INSIGHT,
        RECOMMENDATION,
        DEADLINE,
        TIP,
    ];
}

pub mod task_slots {
    use super::InsightSlot;

    pub const BREAKDOWN: InsightSlot = InsightSlot {
        key: "breakdown",
        glyph: "🧩",
        label: "Task Breakdown",
        hint: "[How to break this into smaller actionable steps]",
    };
    pub const TIME_MANAGEMENT: InsightSlot = InsightSlot {
        key: "time_management",
        glyph: "⏰",
        label: "Time Management",
        hint: "[Realistic time estimate and scheduling suggestions]",
    };
    pub const PRIORITY_ANALYSIS: InsightSlot = InsightSlot {
        key: "priority_analysis",
        glyph: "📊",
        label: "Priority Analysis",
        hint: "[Why this priority level is appropriate or suggest changes]",
    };
    pub const CATEGORY_OPTIMIZATION: InsightSlot = InsightSlot {
        key: "category_optimization",
        glyph: "🗂️",
        label: "Category Optimization",
        hint: "[Best category placement and why]",
    };
    pub const DEADLINE_STRATEGY: InsightSlot = InsightSlot {
        key: "deadline_strategy",
        glyph: "📆",
        label: "Deadline Strategy",
        hint: "[Smart deadline recommendations based on complexity]",
    };
    pub const PRODUCTIVITY_TIP: InsightSlot = InsightSlot {
        key: "productivity_tip",
        glyph: "🚀",
        label: "Productivity Tips",
        hint: "[Specific techniques to complete this task efficiently]",
    };
    pub const SUCCESS_FACTOR: InsightSlot = InsightSlot {
        key: "success_factor",
        glyph: "🏆",
        label: "Success Factors",
        hint: "[Key elements that will determine success]",
    };
    pub const RECOMMENDATION: InsightSlot = InsightSlot {
        key: "recommendation",
        glyph: "🤖",
        label: "AI Recommendation",
        hint: "[One powerful insight to maximize task completion]",
    };

    pub const ALL: [InsightSlot; 8] = [
        BREAKDOWN,
        TIME_MANAGEMENT,
        PRIORITY_ANALYSIS,
        CATEGORY_OPTIMIZATION,
        DEADLINE_STRATEGY,
        PRODUCTIVITY_TIP,
        SUCCESS_FACTOR,
        RECOMMENDATION,
    ];

    /// Preview order; the deadline slot is reported separately there.
    pub const PREVIEW: [InsightSlot; 7] = [
        BREAKDOWN,
        TIME_MANAGEMENT,
        PRIORITY_ANALYSIS,
        CATEGORY_OPTIMIZATION,
        PRODUCTIVITY_TIP,
        SUCCESS_FACTOR,
        RECOMMENDATION,
    ];
}

pub const CONTEXT_FORMAT: InsightFormat = InsightFormat {
    slots: &context_slots::ALL,
    max_items: MAX_CONTEXT_INSIGHTS,
};

pub const TASK_FORMAT: InsightFormat = InsightFormat {
    slots: &task_slots::ALL,
    max_items: MAX_TASK_SUGGESTIONS,
};

pub const PREVIEW_FORMAT: InsightFormat = InsightFormat {
    slots: &task_slots::PREVIEW,
    max_items: MAX_PREVIEW_SUGGESTIONS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyphs_are_unique_within_each_format() {
        for format in [CONTEXT_FORMAT, TASK_FORMAT] {
            let mut leads: Vec<char> = format.slots.iter().filter_map(|s| s.lead_char()).collect();
            leads.sort();
            leads.dedup();
            assert_eq!(leads.len(), format.slots.len());
        }
    }

    #[test]
    fn test_slot_for_ignores_variation_selector() {
        // "⏱" without U+FE0F
        let slot = CONTEXT_FORMAT.slot_for("\u{23F1} Time estimate: 2 hours").unwrap();
        assert_eq!(slot.key, "time_estimate");
    }

    #[test]
    fn test_instruction_block_lists_every_slot() {
        let block = TASK_FORMAT.instruction_block();
        assert_eq!(block.lines().count(), 8);
        assert!(block.starts_with("🧩 Task Breakdown:"));
    }

    #[test]
    fn test_line_renders_glyph_and_label() {
        assert_eq!(
            context_slots::PRIORITY.line("High - urgent"),
            "🎯 Priority: High - urgent"
        );
    }
}
