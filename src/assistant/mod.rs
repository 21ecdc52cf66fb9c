//! AI assistant: milestone extraction from documents and free-text chat.

mod client;
mod parse;
mod prompt;

pub use client::{ChatError, ChatModel, ChatRequest, DEFAULT_BASE_URL, DEFAULT_MODEL, Message, OpenAiClient};
pub use parse::{CandidateMilestone, ParseError, ParseOutcome, parse_response};
pub use prompt::{DEFAULT_MAX_INPUT_CHARS, truncate_chars};

use serde::Serialize;
use thiserror::Error;

use crate::core::date::{format_iso_date, normalize_date};
use crate::core::db::{Milestone, NewMilestone, Phase, Schedule};
use crate::inference::{MilestoneText, infer_phase};

const EXTRACTION_MAX_TOKENS: u32 = 4096;
const CHAT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("could not read milestones from the assistant's reply ({reason}); try again or shorten the document")]
    Malformed { raw: String, reason: String },
}

/// A candidate that did not make it onto the timeline, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub accepted: Vec<NewMilestone>,
    pub rejected: Vec<Rejection>,
}

/// Validate candidates into new milestones.
///
/// Dates are normalized to calendar dates; a single readable date is used
/// for both ends; an end before the start is clamped. Each accepted
/// milestone gets a phase via [`infer_phase`].
pub fn normalize_candidates(candidates: Vec<CandidateMilestone>, phases: &[Phase]) -> ExtractionReport {
    let mut report = ExtractionReport::default();
    for candidate in candidates {
        let title = candidate.title.trim().to_string();
        if title.is_empty() {
            report.rejected.push(Rejection {
                title: "(untitled)".to_string(),
                reason: "missing title".to_string(),
            });
            continue;
        }

        let start = candidate.start_date.as_deref().and_then(normalize_date);
        let end = candidate.end_date.as_deref().and_then(normalize_date);
        let schedule = match (start, end) {
            (Some(start), Some(end)) => Schedule::new(start, end),
            (Some(date), None) | (None, Some(date)) => Schedule::new(date, date),
            (None, None) => {
                let reason = format!(
                    "no readable date (start: {:?}, end: {:?})",
                    candidate.start_date.as_deref().unwrap_or(""),
                    candidate.end_date.as_deref().unwrap_or("")
                );
                tracing::warn!(%title, %reason, "Rejecting extracted milestone");
                report.rejected.push(Rejection { title, reason });
                continue;
            }
        };

        let text = MilestoneText::new(&title, &candidate.notes).with_suggestion(candidate.phase.as_deref());
        let phase_id = infer_phase(&text, phases);
        tracing::debug!(
            %title,
            start = %format_iso_date(schedule.start),
            end = %format_iso_date(schedule.end),
            ?phase_id,
            "Accepted extracted milestone"
        );
        report.accepted.push(NewMilestone {
            title,
            schedule,
            phase_id,
            notes: candidate.notes,
        });
    }
    report
}

/// Project assistant backed by a chat model.
#[derive(Debug, Clone)]
pub struct Assistant<M> {
    model: M,
    max_input_chars: usize,
}

impl<M: ChatModel> Assistant<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Ask the model for the milestones in `document`.
    ///
    /// Existing phases and milestones are sent along so the model can reuse
    /// phase names and skip duplicates.
    pub async fn extract_milestones(
        &self,
        document: &str,
        phases: &[Phase],
        milestones: &[Milestone],
    ) -> Result<ExtractionReport, ExtractError> {
        let user = prompt::extraction_prompt(document, phases, milestones, self.max_input_chars);
        let reply = self
            .model
            .complete(ChatRequest {
                system: prompt::EXTRACTION_SYSTEM,
                user: &user,
                json: true,
                max_tokens: EXTRACTION_MAX_TOKENS,
            })
            .await?;

        match parse_response(&reply) {
            ParseOutcome::Parsed(candidates) => Ok(normalize_candidates(candidates, phases)),
            ParseOutcome::Malformed { raw, reason } => {
                tracing::error!(
                    %reason,
                    response_preview = %raw.chars().take(500).collect::<String>(),
                    "Failed to parse milestone extraction response"
                );
                Err(ExtractError::Malformed { raw, reason })
            }
        }
    }

    pub async fn ask(&self, question: &str, phases: &[Phase], milestones: &[Milestone]) -> Result<String, ChatError> {
        let user = prompt::chat_prompt(question, phases, milestones);
        self.model
            .complete(ChatRequest {
                system: prompt::CHAT_SYSTEM,
                user: &user,
                json: false,
                max_tokens: CHAT_MAX_TOKENS,
            })
            .await
    }
}
