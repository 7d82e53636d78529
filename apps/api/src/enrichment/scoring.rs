//! Priority Scorer: pure, additive, clamped once at the end.

use chrono::{DateTime, Utc};

use crate::enrichment::contains_any;
use crate::enrichment::fallback::URGENT_KEYWORDS;
use crate::models::task::{Priority, Task};

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// Categories that earn the importance bonus. Matched ignoring ASCII case,
/// so a user-typed "work" scores the same as "Work".
pub const IMPORTANT_CATEGORIES: &[&str] = &["Work", "Health", "Finance"];

/// Preview keywords worth the smaller bonus.
pub const IMPORTANT_KEYWORDS: &[&str] = &["important", "priority", "deadline", "client", "meeting"];

pub fn base_score(priority: Priority) -> i32 {
    match priority {
        Priority::Low => 25,
        Priority::Medium => 50,
        Priority::High => 75,
        Priority::Urgent => 100,
    }
}

/// Whole days remaining; a past deadline is negative and lands in the top bucket.
fn deadline_bonus(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    match (deadline - now).num_days() {
        d if d <= 1 => 20,
        d if d <= 3 => 10,
        d if d <= 7 => 5,
        _ => 0,
    }
}

fn effort_bonus(hours: f64) -> i32 {
    if hours >= 8.0 {
        10
    } else if hours >= 4.0 {
        5
    } else {
        0
    }
}

/// Task-enhancement score in `[0, 100]`.
pub fn compute_priority_score(
    priority: Priority,
    deadline: Option<DateTime<Utc>>,
    estimated_time: Option<f64>,
    category: Option<&str>,
    now: DateTime<Utc>,
) -> i32 {
    let mut score = base_score(priority);
    if let Some(deadline) = deadline {
        score += deadline_bonus(deadline, now);
    }
    if let Some(hours) = estimated_time {
        score += effort_bonus(hours);
    }
    if category.is_some_and(|name| IMPORTANT_CATEGORIES.iter().any(|c| c.eq_ignore_ascii_case(name))) {
        score += 10;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Score from a task's own fields.
pub fn score_task(task: &Task, now: DateTime<Utc>) -> i32 {
    compute_priority_score(
        task.priority,
        task.deadline,
        task.estimated_time,
        task.category_name.as_deref(),
        now,
    )
}

/// Suggestion-preview score: base plus a keyword bonus over title and description.
pub fn compute_preview_score(priority: Priority, title: &str, description: Option<&str>) -> i32 {
    let text = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();
    let bonus = if contains_any(&text, URGENT_KEYWORDS) {
        15
    } else if contains_any(&text, IMPORTANT_KEYWORDS) {
        10
    } else {
        0
    };
    (base_score(priority) + bonus).clamp(MIN_SCORE, MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const LADDER: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    #[test]
    fn test_urgent_health_example_clamps_to_100() {
        let now = Utc::now();
        let score = compute_priority_score(
            Priority::Urgent,
            Some(now + Duration::hours(12)),
            Some(10.0),
            Some("Health"),
            now,
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn test_bases() {
        let now = Utc::now();
        let scores: Vec<i32> = LADDER
            .iter()
            .map(|p| compute_priority_score(*p, None, None, None, now))
            .collect();
        assert_eq!(scores, vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_monotonic_in_priority() {
        let now = Utc::now();
        let deadlines = [None, Some(now + Duration::days(2)), Some(now - Duration::days(3))];
        for deadline in deadlines {
            for hours in [None, Some(1.0), Some(5.0), Some(9.0)] {
                for category in [None, Some("Work"), Some("Shopping")] {
                    let scores: Vec<i32> = LADDER
                        .iter()
                        .map(|p| compute_priority_score(*p, deadline, hours, category, now))
                        .collect();
                    assert!(scores.windows(2).all(|w| w[0] <= w[1]));
                    assert!(scores.iter().all(|s| (0..=100).contains(s)));
                }
            }
        }
    }

    #[test]
    fn test_deadline_buckets() {
        let now = Utc::now();
        let at = |d: Duration| compute_priority_score(Priority::Low, Some(now + d), None, None, now);
        assert_eq!(at(Duration::hours(20)), 45);
        assert_eq!(at(Duration::days(3)), 35);
        assert_eq!(at(Duration::days(6)), 30);
        assert_eq!(at(Duration::days(30)), 25);
        assert_eq!(at(Duration::days(-4)), 45);
    }

    #[test]
    fn test_effort_and_category_bonus() {
        let now = Utc::now();
        assert_eq!(compute_priority_score(Priority::Low, None, Some(4.0), None, now), 30);
        assert_eq!(compute_priority_score(Priority::Low, None, Some(8.0), None, now), 35);
        assert_eq!(compute_priority_score(Priority::Low, None, None, Some("Finance"), now), 35);
        assert_eq!(compute_priority_score(Priority::Low, None, None, Some("Travel"), now), 25);
    }

    #[test]
    fn test_preview_keyword_bonus() {
        assert_eq!(compute_preview_score(Priority::Medium, "Fix bug ASAP", None), 65);
        assert_eq!(
            compute_preview_score(Priority::Medium, "Prepare", Some("client meeting")),
            60
        );
        assert_eq!(compute_preview_score(Priority::Medium, "Water plants", None), 50);
        assert_eq!(compute_preview_score(Priority::Urgent, "critical outage", None), 100);
    }

    #[test]
    fn test_important_category_ignores_case() {
        let now = Utc::now();
        let exact = compute_priority_score(Priority::Medium, None, None, Some("Work"), now);
        let lower = compute_priority_score(Priority::Medium, None, None, Some("work"), now);
        assert_eq!(exact, 60);
        assert_eq!(lower, exact);
        assert_eq!(compute_priority_score(Priority::Medium, None, None, Some("Workshop"), now), 50);
    }
}
