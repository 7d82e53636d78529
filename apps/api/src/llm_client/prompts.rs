// Shared prompt fragments.
// Each feature that calls the model keeps its own prompts alongside it;
// this file only holds the cross-cutting instructions.

/// Appended to every enrichment prompt so the line parser can recover slots.
pub const LINE_FORMAT_INSTRUCTION: &str = "\
- Put each insight on its own line\n\
- Each insight MUST start with the emoji shown for its slot, followed by the slot label\n\
- Do NOT use markdown headings, tables or code fences\n\
- Keep insights concise but meaningful (1-2 sentences each)";

/// Keeps the model on practical, actionable advice.
pub const ACTIONABLE_INSTRUCTION: &str = "\
- Be specific and actionable\n\
- Focus on practical task management advice\n\
- Provide realistic time estimates";

/// Liveness check sent by the AI status endpoints.
pub const HEALTH_CHECK_PROMPT: &str = "Respond with 'OK' if you receive this.";
