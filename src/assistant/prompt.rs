use std::fmt::Write;

use crate::core::db::{Milestone, Phase};

/// Characters of document text sent to the model.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 12_000;

pub const EXTRACTION_SYSTEM: &str = "You are an assistant for a construction project manager. \
Read the document and list the project milestones it describes. \
Reply with JSON only, shaped as {\"milestones\": [{\"title\": string, \"startDate\": \"YYYY-MM-DD\", \
\"endDate\": \"YYYY-MM-DD\", \"notes\": string, \"phase\": string}]}. \
Use one of the listed phase names for \"phase\" when one fits. \
Skip milestones that are already on the timeline.";

pub const CHAT_SYSTEM: &str = "You are an assistant for a construction project manager. \
Answer questions about the project using the phases and milestones provided. \
Be concise and practical.";

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn write_context(out: &mut String, phases: &[Phase], milestones: &[Milestone]) {
    out.push_str("Project phases:\n");
    if phases.is_empty() {
        out.push_str("- (none defined)\n");
    }
    for phase in phases {
        let _ = writeln!(out, "- {}", phase.name);
    }
    out.push_str("\nMilestones already on the timeline:\n");
    if milestones.is_empty() {
        out.push_str("- (none)\n");
    }
    for milestone in milestones {
        let _ = writeln!(
            out,
            "- {} ({} to {}){}",
            milestone.title,
            milestone.start_date,
            milestone.end_date,
            if milestone.completed { " [done]" } else { "" }
        );
    }
}

pub fn extraction_prompt(
    document: &str,
    phases: &[Phase],
    milestones: &[Milestone],
    max_chars: usize,
) -> String {
    let excerpt = truncate_chars(document, max_chars);
    let mut prompt = String::with_capacity(excerpt.len() + 512);
    write_context(&mut prompt, phases, milestones);
    prompt.push_str("\nDocument:\n");
    prompt.push_str(excerpt);
    if excerpt.len() < document.len() {
        prompt.push_str("\n[document truncated]");
    }
    prompt
}

pub fn chat_prompt(question: &str, phases: &[Phase], milestones: &[Milestone]) -> String {
    let mut prompt = String::new();
    write_context(&mut prompt, phases, milestones);
    prompt.push_str("\nQuestion:\n");
    prompt.push_str(question.trim());
    prompt
}
