// Enrichment prompts. Pure functions of entity state: same snapshot, same prompt.
// Templates use `{placeholder}` substitution like the rest of the service.

use crate::enrichment::format::{CONTEXT_FORMAT, PREVIEW_FORMAT, TASK_FORMAT};
use crate::enrichment::{ContextSnapshot, TaskSnapshot};
use crate::llm_client::prompts::{ACTIONABLE_INSTRUCTION, LINE_FORMAT_INSTRUCTION};
use crate::models::task::Priority;

/// Replace `{source_type}`, `{content}`, `{format}`, `{actionable}`, `{line_format}`.
const CONTEXT_PROMPT_TEMPLATE: &str = r#"You are an expert AI task management assistant analyzing {source_type} content.

TASK: Analyze the provided content and generate exactly 6-8 actionable insights in the specified format.

REQUIRED FORMAT (use these exact emojis and structure):
{format}

CONTENT TO ANALYZE:
Source Type: {source_type}
Content: "{content}"

INSTRUCTIONS:
- Provide exactly 6-8 insights following the format above
- Consider the source type (WhatsApp vs Email vs Notes) in your analysis
{actionable}
{line_format}"#;

/// Replace `{title}`, `{description}`, `{category}`, `{priority}`, `{deadline}`,
/// `{estimated_time}`, `{format}`, `{actionable}`, `{line_format}`.
const TASK_PROMPT_TEMPLATE: &str = r#"You are an expert productivity and task management assistant. Analyze this task and provide intelligent insights.

TASK DETAILS:
Title: "{title}"
Description: "{description}"
Category: "{category}"
Priority: "{priority}"
Deadline: "{deadline}"
Estimated Time: "{estimated_time}"

ANALYSIS REQUIRED:
Provide exactly 6-8 actionable insights in this specific format:

{format}

INSTRUCTIONS:
- Consider the task complexity and context
{actionable}
{line_format}"#;

/// Replace `{title}`, `{description}`, `{category}`, `{priority}`, `{format}`.
const PREVIEW_PROMPT_TEMPLATE: &str = r#"You are an expert productivity assistant. Analyze this potential task and provide actionable insights.

TASK PREVIEW:
Title: "{title}"
Description: "{description}"
Category: "{category}"
Priority: "{priority}"

Provide exactly 6-7 quick suggestions in this format:
{format}

Keep each suggestion to 1-2 sentences and make them highly actionable."#;

pub fn context_prompt(entry: &ContextSnapshot<'_>) -> String {
    CONTEXT_PROMPT_TEMPLATE
        .replace("{format}", &CONTEXT_FORMAT.instruction_block())
        .replace("{actionable}", ACTIONABLE_INSTRUCTION)
        .replace("{line_format}", LINE_FORMAT_INSTRUCTION)
        .replace("{source_type}", entry.source_type.display_name())
        // Content last so user text containing `{...}` is never re-substituted.
        .replace("{content}", entry.content)
}

pub fn task_prompt(task: &TaskSnapshot<'_>) -> String {
    let deadline = task
        .deadline
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "No deadline set".to_string());
    let estimated_time = task
        .estimated_time
        .map(|h| format!("{h} hours"))
        .unwrap_or_else(|| "No time estimate".to_string());

    TASK_PROMPT_TEMPLATE
        .replace("{format}", &TASK_FORMAT.instruction_block())
        .replace("{actionable}", ACTIONABLE_INSTRUCTION)
        .replace("{line_format}", LINE_FORMAT_INSTRUCTION)
        .replace("{priority}", task.priority.label())
        .replace("{deadline}", &deadline)
        .replace("{estimated_time}", &estimated_time)
        .replace("{category}", task.category.unwrap_or("No category"))
        .replace(
            "{description}",
            task.description.unwrap_or("No description provided"),
        )
        .replace("{title}", task.title)
}

pub fn preview_prompt(
    title: &str,
    description: Option<&str>,
    category: Option<&str>,
    priority: Priority,
) -> String {
    PREVIEW_PROMPT_TEMPLATE
        .replace("{format}", &PREVIEW_FORMAT.instruction_block())
        .replace("{priority}", priority.as_str())
        .replace("{category}", category.unwrap_or("No category"))
        .replace("{description}", description.unwrap_or("No description"))
        .replace("{title}", title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::context::SourceType;

    #[test]
    fn test_context_prompt_embeds_fields_and_format() {
        let prompt = context_prompt(&ContextSnapshot {
            content: "Dinner with the team on Friday",
            source_type: SourceType::Whatsapp,
        });
        assert!(prompt.contains("analyzing WhatsApp content"));
        assert!(prompt.contains("Content: \"Dinner with the team on Friday\""));
        assert!(prompt.contains("🎯 Priority:"));
        assert!(prompt.contains("✨ Smart tip:"));
        assert!(!prompt.contains("{format}"));
    }

    #[test]
    fn test_user_braces_survive_substitution() {
        let prompt = context_prompt(&ContextSnapshot {
            content: "literal {format} in my note",
            source_type: SourceType::Notes,
        });
        assert!(prompt.contains("literal {format} in my note"));
    }

    #[test]
    fn test_task_prompt_placeholders_for_missing_fields() {
        let prompt = task_prompt(&TaskSnapshot {
            title: "Renew passport",
            description: None,
            category: None,
            priority: Priority::High,
            deadline: None,
            estimated_time: None,
        });
        assert!(prompt.contains("Title: \"Renew passport\""));
        assert!(prompt.contains("No description provided"));
        assert!(prompt.contains("No category"));
        assert!(prompt.contains("Priority: \"High\""));
        assert!(prompt.contains("No deadline set"));
        assert!(prompt.contains("No time estimate"));
    }

    #[test]
    fn test_task_prompt_is_reproducible() {
        let snap = TaskSnapshot {
            title: "Quarterly review",
            description: Some("Prepare slides"),
            category: Some("Work"),
            priority: Priority::Medium,
            deadline: None,
            estimated_time: Some(3.5),
        };
        assert_eq!(task_prompt(&snap), task_prompt(&snap));
        assert!(task_prompt(&snap).contains("3.5 hours"));
    }

    #[test]
    fn test_preview_prompt_lists_seven_slots() {
        let prompt = preview_prompt("Plan trip", None, Some("Travel"), Priority::Low);
        assert!(prompt.contains("Priority: \"low\""));
        assert!(prompt.contains("🤖 AI Recommendation:"));
        assert!(!prompt.contains("📆"));
    }
}
