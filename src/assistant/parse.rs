//! Recovering a milestone list from a model reply.
//!
//! Models wrap JSON in prose or markdown fences often enough that a strict
//! parse is only the first of three attempts.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// A milestone as proposed by the model, before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateMilestone {
    pub title: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: String,
    pub phase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(Vec<CandidateMilestone>),
    Malformed { raw: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no fenced code block")]
    NoCodeFence,
    #[error("no balanced JSON object or array")]
    NoJson,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    #[serde(default, alias = "name", deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, alias = "start_date", alias = "start", deserialize_with = "lenient_string")]
    start_date: Option<String>,
    #[serde(default, alias = "end_date", alias = "end", deserialize_with = "lenient_string")]
    end_date: Option<String>,
    #[serde(default, alias = "description", deserialize_with = "lenient_string")]
    notes: Option<String>,
    #[serde(default, alias = "phaseName", alias = "phase_name", deserialize_with = "lenient_string")]
    phase: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    List(Vec<RawCandidate>),
    Wrapped { milestones: Vec<RawCandidate> },
}

/// Accept strings and numbers; anything else (null included) is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl From<RawCandidate> for CandidateMilestone {
    fn from(raw: RawCandidate) -> Self {
        Self {
            title: raw.title.unwrap_or_default(),
            start_date: raw.start_date,
            end_date: raw.end_date,
            notes: raw.notes.unwrap_or_default(),
            phase: raw.phase,
        }
    }
}

fn decode(json: &str) -> Result<Vec<CandidateMilestone>, ParseError> {
    let candidates = match serde_json::from_str::<Envelope>(json)? {
        Envelope::List(list) => list,
        Envelope::Wrapped { milestones } => milestones,
    };
    Ok(candidates.into_iter().map(CandidateMilestone::from).collect())
}

fn parse_strict(text: &str) -> Result<Vec<CandidateMilestone>, ParseError> {
    decode(text.trim())
}

fn parse_code_fence(text: &str) -> Result<Vec<CandidateMilestone>, ParseError> {
    decode(extract_code_fence(text).ok_or(ParseError::NoCodeFence)?)
}

fn parse_brace_matched(text: &str) -> Result<Vec<CandidateMilestone>, ParseError> {
    let mut last_error = ParseError::NoJson;
    for (start, _) in text.match_indices(['{', '[']) {
        let Some(json) = balanced_from(&text[start..]) else {
            continue;
        };
        match decode(json) {
            Ok(candidates) => return Ok(candidates),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

/// Content of the first ```json (or bare ```) fenced block.
fn extract_code_fence(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let content_start = start + "```json".len();
        if let Some(end) = text[content_start..].find("```") {
            return Some(text[content_start..content_start + end].trim());
        }
    }

    let start = text.find("```")? + 3;
    // Skip a language tag on the opening line.
    let content_start = text[start..].find('\n').map(|i| start + i + 1).unwrap_or(start);
    let end = text[content_start..].find("```")?;
    Some(text[content_start..content_start + end].trim())
}

/// The balanced `{...}` or `[...]` that `text` starts with, skipping brackets
/// inside string literals.
fn balanced_from(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

type Stage = fn(&str) -> Result<Vec<CandidateMilestone>, ParseError>;

const STAGES: [(&str, Stage); 3] = [
    ("strict", parse_strict),
    ("code fence", parse_code_fence),
    ("brace matching", parse_brace_matched),
];

/// Run the fallback chain: strict parse, fenced block, brace matching.
pub fn parse_response(raw: &str) -> ParseOutcome {
    let mut failures = Vec::with_capacity(STAGES.len());
    for (name, stage) in STAGES {
        match stage(raw) {
            Ok(candidates) => {
                tracing::debug!(stage = name, count = candidates.len(), "Parsed model response");
                return ParseOutcome::Parsed(candidates);
            }
            Err(e) => failures.push(format!("{name}: {e}")),
        }
    }
    ParseOutcome::Malformed {
        raw: raw.to_string(),
        reason: failures.join("; "),
    }
}
