//! Phase inference: pick the construction phase a free-text milestone belongs to.

use crate::core::db::Phase;

/// Keywords for common construction phase names.
const PHASE_KEYWORDS: &[(&str, &[&str])] = &[
    ("pre-construction", &["permit", "survey", "design", "approval", "planning", "bid", "contract", "zoning"]),
    ("planning", &["permit", "survey", "design", "approval", "planning", "drawings", "budget"]),
    ("site preparation", &["clearing", "demolition", "grading", "site prep", "survey", "staking", "erosion"]),
    ("demolition", &["demolition", "demo", "tear down", "removal", "strip out"]),
    ("foundation", &["foundation", "excavation", "concrete", "footing", "slab", "base", "groundwork"]),
    ("framing", &["framing", "frame", "studs", "joists", "trusses", "sheathing", "structural"]),
    ("roofing", &["roof", "roofing", "shingles", "flashing", "gutters", "underlayment"]),
    ("plumbing", &["plumbing", "pipes", "drain", "water line", "sewer", "fixtures", "water heater"]),
    ("electrical", &["electrical", "wiring", "panel", "outlets", "lighting", "circuit", "conduit"]),
    ("hvac", &["hvac", "heating", "ventilation", "air conditioning", "ductwork", "furnace"]),
    ("mechanical", &["mechanical", "plumbing", "electrical", "hvac", "rough-in", "rough in"]),
    ("insulation", &["insulation", "insulate", "vapor barrier", "spray foam"]),
    ("drywall", &["drywall", "sheetrock", "plaster", "taping", "mudding"]),
    ("exterior", &["siding", "windows", "doors", "exterior", "facade", "brick", "stucco"]),
    ("interior", &["interior", "cabinets", "flooring", "trim", "painting", "tile", "countertops"]),
    ("finishing", &["finish", "finishing", "paint", "flooring", "trim", "fixtures", "punch list"]),
    ("landscaping", &["landscaping", "landscape", "lawn", "planting", "driveway", "paving", "fence"]),
    ("inspection", &["inspection", "inspect", "certificate", "occupancy", "final walkthrough", "sign-off"]),
    ("closeout", &["handover", "closeout", "punch list", "walkthrough", "occupancy", "warranty"]),
];

/// Text describing a milestone, as seen by phase inference.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilestoneText<'a> {
    pub title: &'a str,
    pub notes: &'a str,
    /// Phase name proposed by the assistant, if any.
    pub suggested_phase: Option<&'a str>,
}

impl<'a> MilestoneText<'a> {
    pub fn new(title: &'a str, notes: &'a str) -> Self {
        Self {
            title,
            notes,
            suggested_phase: None,
        }
    }

    pub fn with_suggestion(mut self, suggested_phase: Option<&'a str>) -> Self {
        self.suggested_phase = suggested_phase;
        self
    }
}

/// Keywords used to score `phase_name`.
///
/// Exact table match first, then a substring match against table keys in
/// either direction, then the phase name itself.
pub fn keywords_for(phase_name: &str) -> Vec<String> {
    let name = phase_name.trim().to_lowercase();
    let table_entry = PHASE_KEYWORDS
        .iter()
        .find(|(key, _)| *key == name)
        .or_else(|| {
            PHASE_KEYWORDS
                .iter()
                .find(|(key, _)| !name.is_empty() && (name.contains(key) || key.contains(name.as_str())))
        });
    match table_entry {
        Some((_, keywords)) => keywords.iter().map(|k| k.to_string()).collect(),
        None if name.is_empty() => Vec::new(),
        None => vec![name],
    }
}

/// Score of one phase against lower-cased milestone text.
pub fn score_phase(phase_name: &str, text: &str) -> u32 {
    let keyword_hits = keywords_for(phase_name)
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .count() as u32;
    let name = phase_name.trim().to_lowercase();
    let name_bonus = if !name.is_empty() && text.contains(&name) { 3 } else { 0 };
    keyword_hits * 2 + name_bonus
}

/// Id of the phase that best matches `milestone`.
///
/// Returns `None` only when there are no phases. When nothing scores, the
/// first phase is the default.
pub fn infer_phase(milestone: &MilestoneText<'_>, phases: &[Phase]) -> Option<i64> {
    let first = phases.first()?;

    if let Some(suggested) = milestone.suggested_phase.map(str::trim).filter(|s| !s.is_empty()) {
        let suggested = suggested.to_lowercase();
        if let Some(phase) = phases.iter().find(|p| p.name.trim().to_lowercase() == suggested) {
            return Some(phase.id);
        }
    }

    let text = format!("{} {}", milestone.title, milestone.notes).to_lowercase();
    let mut best: Option<(&Phase, u32)> = None;
    for phase in phases {
        let score = score_phase(&phase.name, &text);
        // Strictly greater keeps the earlier phase on ties.
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((phase, score));
        }
    }

    match best {
        Some((phase, score)) if score > 0 => {
            tracing::debug!(phase = %phase.name, score, "Inferred milestone phase");
            Some(phase.id)
        }
        _ => Some(first.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{Color, SyncStatus};

    fn phases(names: &[&str]) -> Vec<Phase> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Phase {
                id: i as i64 + 1,
                name: name.to_string(),
                color: Color { r: 0, g: 0, b: 0 },
                sync_status: SyncStatus::LocalOnly,
            })
            .collect()
    }

    #[test]
    fn test_concrete_slab_goes_to_foundation() {
        let phases = phases(&["Foundation", "Roof"]);
        let text = MilestoneText::new("Pour concrete foundation slab", "");
        assert_eq!(infer_phase(&text, &phases), Some(1));
        assert_eq!(score_phase("Foundation", "pour concrete foundation slab"), 9);
    }

    #[test]
    fn test_notes_contribute_to_score() {
        let phases = phases(&["Foundation", "Roofing"]);
        let text = MilestoneText::new("Week 12 work", "install shingles and flashing");
        assert_eq!(infer_phase(&text, &phases), Some(2));
    }

    #[test]
    fn test_suggestion_short_circuits() {
        let phases = phases(&["Foundation", "Roof"]);
        let text = MilestoneText::new("Pour concrete foundation slab", "").with_suggestion(Some("ROOF"));
        assert_eq!(infer_phase(&text, &phases), Some(2));

        // Unknown suggestion falls back to scoring.
        let text = MilestoneText::new("Pour concrete foundation slab", "").with_suggestion(Some("Garden"));
        assert_eq!(infer_phase(&text, &phases), Some(1));
    }

    #[test]
    fn test_suggestion_ignores_non_ascii_case() {
        let phases = phases(&["Fondations", "Électricité"]);
        let text = MilestoneText::new("Coulage dalle", "").with_suggestion(Some("ÉLECTRICITÉ"));
        assert_eq!(infer_phase(&text, &phases), Some(2));
    }

    #[test]
    fn test_no_match_defaults_to_first_phase() {
        let phases = phases(&["Framing", "Drywall"]);
        let text = MilestoneText::new("Team lunch", "");
        assert_eq!(infer_phase(&text, &phases), Some(1));
    }

    #[test]
    fn test_no_phases() {
        assert_eq!(infer_phase(&MilestoneText::new("Anything", ""), &[]), None);
    }

    #[test]
    fn test_ties_keep_phase_order() {
        let phases = phases(&["Electrical", "Plumbing"]);
        let text = MilestoneText::new("Rough-in wiring and pipes", "");
        // One keyword hit each.
        assert_eq!(infer_phase(&text, &phases), Some(1));
        let reversed = {
            let mut p = phases.clone();
            p.reverse();
            p
        };
        assert_eq!(infer_phase(&text, &reversed), Some(2));
    }

    #[test]
    fn test_keyword_lookup_fallbacks() {
        assert!(keywords_for("Foundation").contains(&"footing".to_string()));
        // Substring match against table keys.
        assert!(keywords_for("Foundation & Basement").contains(&"excavation".to_string()));
        assert!(keywords_for("Roof").contains(&"shingles".to_string()));
        // Unknown phases use their own name.
        assert_eq!(keywords_for("Solar Array"), vec!["solar array".to_string()]);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let phases = phases(&["Site Preparation", "Foundation", "Framing", "Roofing"]);
        let text = MilestoneText::new("Excavate and grade lot", "clearing trees");
        let first = infer_phase(&text, &phases);
        for _ in 0..10 {
            assert_eq!(infer_phase(&text, &phases), first);
        }
        assert_eq!(first, Some(1));
    }
}
