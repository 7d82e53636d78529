//! Fallback Generator: deterministic, rule-based insights used whenever the
//! provider fails or returns nothing usable.
//!
//! Keyword tests are case-insensitive substring matches. Category buckets are
//! an ordered priority list: the first bucket with a hit wins.
//! The only clock dependence is the explicit `now` used for deadline math.

use chrono::{DateTime, Utc};

use crate::enrichment::format::{context_slots as cs, task_slots as ts};
use crate::enrichment::{contains_any, ContextSnapshot, TaskSnapshot};
use crate::models::context::SourceType;
use crate::models::task::Priority;

pub const URGENT_KEYWORDS: &[&str] = &["urgent", "asap", "immediately", "critical", "emergency"];
pub const TIME_SENSITIVE_KEYWORDS: &[&str] = &["deadline", "due", "tomorrow", "today", "soon"];
pub const IMPORTANCE_KEYWORDS: &[&str] = &["important", "priority", "focus"];

/// (category, keywords, reason) in evaluation order.
const CATEGORY_BUCKETS: &[(&str, &[&str], &str)] = &[
    (
        "Work",
        &["work", "office", "project", "client", "meeting", "presentation", "report"],
        "Professional context detected",
    ),
    (
        "Shopping",
        &["buy", "purchase", "shopping", "order", "store"],
        "Purchase-related content",
    ),
    (
        "Health",
        &["health", "doctor", "exercise", "medical", "fitness"],
        "Health and wellness context",
    ),
    (
        "Learning",
        &["learn", "study", "course", "book", "training"],
        "Educational content detected",
    ),
    (
        "Family",
        &["family", "mom", "dad", "brother", "sister", "parents"],
        "Family-related context",
    ),
    (
        "Finance",
        &["money", "bank", "payment", "finance", "investment"],
        "Financial context detected",
    ),
    (
        "Travel",
        &["travel", "trip", "vacation", "flight", "hotel"],
        "Travel-related content",
    ),
];

const DEFAULT_CATEGORY: (&str, &str) = ("Personal", "General personal task");

/// Words of the source text echoed back as the main task.
const MAIN_TASK_WORDS: usize = 8;

/// Titles with more words than this are considered complex.
const COMPLEX_TITLE_WORDS: usize = 5;

/// Rule-based insights for a context entry: 7 lines, one per slot except
/// key insight, ending with a generic tip.
pub fn context_fallback(entry: &ContextSnapshot<'_>) -> Vec<String> {
    let lower = entry.content.to_lowercase();
    let word_count = entry.content.split_whitespace().count();

    let mut insights = Vec::with_capacity(7);
    insights.push(cs::PRIORITY.line(priority_reason(&lower)));

    let (category, reason) = categorize(&lower);
    insights.push(cs::CATEGORY.line(format!("{category} - {reason}")));

    insights.push(cs::TIME_ESTIMATE.line(time_estimate(word_count)));

    let lead: Vec<&str> = entry.content.split_whitespace().take(MAIN_TASK_WORDS).collect();
    insights.push(cs::MAIN_TASK.line(format!("{}...", lead.join(" "))));

    insights.push(cs::RECOMMENDATION.line(match entry.source_type {
        SourceType::Whatsapp => "Quick action needed - WhatsApp messages are usually urgent",
        SourceType::Email => "Professional follow-up required - email context",
        SourceType::Notes => "Schedule dedicated time for completion",
    }));

    insights.push(cs::DEADLINE.line(suggested_deadline(&lower)));

    insights.push(cs::TIP.line(
        "Break the work into focused blocks and review progress at the end of each one",
    ));
    insights
}

/// The category bucket the text falls into, with its reason.
pub fn categorize(lower: &str) -> (&'static str, &'static str) {
    CATEGORY_BUCKETS
        .iter()
        .find(|(_, keywords, _)| contains_any(lower, keywords))
        .map(|(name, _, reason)| (*name, *reason))
        .unwrap_or(DEFAULT_CATEGORY)
}

fn priority_reason(lower: &str) -> &'static str {
    if contains_any(lower, URGENT_KEYWORDS) {
        "High - Urgent keywords detected in content"
    } else if contains_any(lower, TIME_SENSITIVE_KEYWORDS) {
        "Medium - Time-sensitive indicators found"
    } else if contains_any(lower, IMPORTANCE_KEYWORDS) {
        "Medium - Importance indicators present"
    } else {
        "Low - Standard task with no urgency indicators"
    }
}

fn time_estimate(word_count: usize) -> &'static str {
    match word_count {
        n if n > 150 => "3-5 hours - Complex task based on content length",
        n if n > 100 => "2-3 hours - Medium complexity task",
        n if n > 50 => "1-2 hours - Standard task",
        _ => "30-60 minutes - Quick task",
    }
}

/// Explicit day words beat generic urgency: "urgent ... by tomorrow" is tomorrow.
fn suggested_deadline(lower: &str) -> &'static str {
    if lower.contains("today") {
        "Today by end of day"
    } else if lower.contains("tomorrow") {
        "Tomorrow"
    } else if contains_any(lower, &["urgent", "asap"]) {
        "Today by end of day"
    } else if lower.contains("soon") {
        "Tomorrow"
    } else {
        "Within next 3-5 days"
    }
}

/// Rule-based suggestions for a task: exactly 8 lines, one per slot.
pub fn task_fallback(task: &TaskSnapshot<'_>, now: DateTime<Utc>) -> Vec<String> {
    let mut suggestions = Vec::with_capacity(8);

    suggestions.push(ts::BREAKDOWN.line(
        if task.title.split_whitespace().count() > COMPLEX_TITLE_WORDS {
            "Break this complex task into 3-4 smaller subtasks for better progress tracking"
        } else {
            "This task is well-defined - focus on clear execution steps"
        },
    ));

    suggestions.push(ts::TIME_MANAGEMENT.line(match task.estimated_time {
        Some(hours) if hours > 4.0 => format!(
            "Large task ({hours}h) - consider splitting across multiple work sessions"
        ),
        Some(hours) => {
            format!("Manageable duration ({hours}h) - perfect for focused completion")
        }
        None => "Estimate 2-4 hours based on task complexity".to_string(),
    }));

    suggestions.push(ts::PRIORITY_ANALYSIS.line(match task.priority {
        Priority::Urgent => "Urgent priority confirmed - tackle immediately for best results",
        Priority::High => "High priority justified - schedule in your peak energy hours",
        Priority::Medium => "Medium priority appropriate - balance with other commitments",
        Priority::Low => "Low priority - perfect for filling gaps between important tasks",
    }));

    suggestions.push(ts::CATEGORY_OPTIMIZATION.line(match task.category {
        Some(name) => format!("{name} category fits well - group with similar tasks"),
        None => "Consider adding a category for better organization".to_string(),
    }));

    suggestions.push(ts::DEADLINE_STRATEGY.line(match task.deadline {
        Some(deadline) => match (deadline - now).num_days() {
            d if d <= 1 => {
                "Urgent deadline - prioritize immediately and focus on core deliverables"
            }
            d if d <= 7 => "Good timeline - plan checkpoint at 50% completion",
            _ => "Comfortable timeline - break into weekly milestones",
        },
        None => "Set a realistic deadline to maintain momentum and accountability",
    }));

    suggestions.push(ts::PRODUCTIVITY_TIP.line(
        "Use the Pomodoro technique (25-min focus blocks) for sustained concentration",
    ));
    suggestions.push(ts::SUCCESS_FACTOR.line(
        "Clear outcome definition and progress tracking will ensure completion",
    ));
    suggestions.push(ts::RECOMMENDATION.line(
        "Start with the most challenging aspect when your energy is highest",
    ));
    suggestions
}

/// Fixed preview suggestions used when the provider cannot help.
pub fn preview_fallback(title: &str, priority: Priority, category: Option<&str>) -> Vec<String> {
    vec![
        ts::BREAKDOWN.bare(format!(
            "Break '{title}' into smaller, manageable steps for better execution"
        )),
        ts::TIME_MANAGEMENT.bare(format!(
            "Consider allocating 2-3 hours for completion based on {} priority",
            priority.as_str()
        )),
        ts::PRIORITY_ANALYSIS.bare(format!(
            "{} priority level seems appropriate for this task",
            priority.label()
        )),
        ts::CATEGORY_OPTIMIZATION.bare(match category {
            Some(name) => format!("{name} category would be ideal for organizing this task"),
            None => "Choose a category that groups similar tasks for better organization"
                .to_string(),
        }),
        ts::PRODUCTIVITY_TIP.bare("Schedule this task during your peak energy hours for best results"),
        ts::SUCCESS_FACTOR.bare("Define success criteria clearly before starting"),
        ts::RECOMMENDATION.bare("Focus on progress over perfection to maintain momentum"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ctx(content: &str, source_type: SourceType) -> ContextSnapshot<'_> {
        ContextSnapshot {
            content,
            source_type,
        }
    }

    fn task(title: &str) -> TaskSnapshot<'_> {
        TaskSnapshot {
            title,
            description: None,
            category: None,
            priority: Priority::Medium,
            deadline: None,
            estimated_time: None,
        }
    }

    #[test]
    fn test_urgent_client_email_scenario() {
        let insights = context_fallback(&ctx(
            "URGENT: submit report to client by tomorrow",
            SourceType::Email,
        ));
        assert!(insights[0].starts_with("🎯 Priority: High"));
        assert!(insights[1].starts_with("📂 Category: Work"));
        assert!(insights[4].contains("email context"));
        assert_eq!(insights[5], "📅 Suggested deadline: Tomorrow");
    }

    #[test]
    fn test_context_fallback_length_in_range() {
        let long = "word ".repeat(200);
        for content in ["hello there", "buy milk today", long.as_str()] {
            let n = context_fallback(&ctx(content, SourceType::Notes)).len();
            assert!((6..=8).contains(&n));
        }
    }

    #[test]
    fn test_context_fallback_is_deterministic() {
        let snap = ctx("Call mom about the family trip soon", SourceType::Whatsapp);
        assert_eq!(context_fallback(&snap), context_fallback(&snap));
    }

    #[test]
    fn test_priority_cascade() {
        assert!(priority_reason("fix this asap").starts_with("High"));
        assert!(priority_reason("due friday").starts_with("Medium - Time"));
        assert!(priority_reason("this is important").starts_with("Medium - Importance"));
        assert!(priority_reason("water the plants").starts_with("Low"));
    }

    #[test]
    fn test_category_order_matters() {
        // "meeting" (Work) and "doctor" (Health): Work comes first.
        assert_eq!(categorize("doctor meeting at noon").0, "Work");
        assert_eq!(categorize("see the doctor").0, "Health");
        assert_eq!(categorize("book flights").0, "Learning");
        assert_eq!(categorize("water the plants").0, "Personal");
    }

    #[test]
    fn test_time_estimate_buckets() {
        assert!(time_estimate(151).starts_with("3-5 hours"));
        assert!(time_estimate(150).starts_with("2-3 hours"));
        assert!(time_estimate(51).starts_with("1-2 hours"));
        assert!(time_estimate(50).starts_with("30-60 minutes"));
    }

    #[test]
    fn test_main_task_uses_first_eight_words() {
        let insights = context_fallback(&ctx(
            "one two three four five six seven eight nine ten",
            SourceType::Notes,
        ));
        assert_eq!(
            insights[3],
            "📌 Main task: one two three four five six seven eight..."
        );
    }

    #[test]
    fn test_deadline_suggestion_branches() {
        assert_eq!(suggested_deadline("finish today"), "Today by end of day");
        assert_eq!(suggested_deadline("urgent fix"), "Today by end of day");
        assert_eq!(suggested_deadline("whenever soon"), "Tomorrow");
        assert_eq!(suggested_deadline("no rush"), "Within next 3-5 days");
    }

    #[test]
    fn test_recommendation_by_source() {
        let wa = context_fallback(&ctx("ping the team", SourceType::Whatsapp));
        assert!(wa[4].contains("WhatsApp"));
        let notes = context_fallback(&ctx("ping the team", SourceType::Notes));
        assert!(notes[4].contains("Schedule dedicated time"));
    }

    #[test]
    fn test_task_fallback_is_exactly_eight() {
        let now = Utc::now();
        let mut snap = task("Plan the offsite agenda and logistics for everyone");
        assert_eq!(task_fallback(&snap, now).len(), 8);
        snap.deadline = Some(now + Duration::days(30));
        snap.estimated_time = Some(6.0);
        snap.category = Some("Work");
        assert_eq!(task_fallback(&snap, now).len(), 8);
    }

    #[test]
    fn test_task_breakdown_threshold() {
        let now = Utc::now();
        assert!(task_fallback(&task("one two three four five six"), now)[0].contains("3-4 smaller"));
        assert!(task_fallback(&task("one two three four five"), now)[0].contains("well-defined"));
    }

    #[test]
    fn test_task_deadline_proximity() {
        let now = Utc::now();
        let mut snap = task("Ship release");
        snap.deadline = Some(now + Duration::hours(12));
        assert!(task_fallback(&snap, now)[4].contains("Urgent deadline"));
        snap.deadline = Some(now + Duration::days(5));
        assert!(task_fallback(&snap, now)[4].contains("Good timeline"));
        snap.deadline = Some(now + Duration::days(20));
        assert!(task_fallback(&snap, now)[4].contains("Comfortable timeline"));
        snap.deadline = None;
        assert!(task_fallback(&snap, now)[4].contains("Set a realistic deadline"));
    }

    #[test]
    fn test_task_fallback_is_deterministic_for_fixed_now() {
        let now = Utc::now();
        let mut snap = task("Renew passport");
        snap.deadline = Some(now + Duration::days(3));
        assert_eq!(task_fallback(&snap, now), task_fallback(&snap, now));
    }

    #[test]
    fn test_preview_fallback_has_seven_lines() {
        let lines = preview_fallback("Write blog post", Priority::High, Some("Learning"));
        assert_eq!(lines.len(), 7);
        assert!(lines[2].starts_with("📊 High priority"));
        assert!(lines[3].contains("Learning"));
    }
}
