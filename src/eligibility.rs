//! Eligibility classification of a candidate set.
//!
//! One LLM judgment splits the candidates into `eligible` and `uncertain`;
//! anything in neither list is excluded. An unusable judgment excludes
//! everything.

use crate::domain::{CandidateTrial, Partition, PatientProfile, StructuredTranscript};
use crate::llm::{log_degraded, string_array, Judgment, JudgmentCaller};
use crate::prompts::eligibility::build_eligibility_prompt;
use crate::prompts::format_patient_profile;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Criteria text longer than this is cut before it reaches the prompt
const MAX_CRITERIA_CHARS: usize = 4000;

const STAGE: &str = "classify";

/// Trial data shown to the classifier: id, title and criteria only
#[derive(Debug, Serialize)]
struct TrialForEligibility {
    id: String,
    title: String,
    eligibility_criteria: String,
}

impl From<&CandidateTrial> for TrialForEligibility {
    fn from(t: &CandidateTrial) -> Self {
        Self {
            id: t.external_id.clone(),
            title: t.brief_title.clone(),
            eligibility_criteria: truncate_chars(t.eligibility_criteria.as_deref().unwrap_or(""), MAX_CRITERIA_CHARS),
        }
    }
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub struct EligibilityClassifier {
    caller: JudgmentCaller,
    temperature: f32,
}

impl EligibilityClassifier {
    pub fn new(caller: JudgmentCaller, temperature: f32) -> Self {
        Self { caller, temperature }
    }

    /// Split `candidates` into eligible and uncertain ids.
    ///
    /// Never fails: a failed call, non-JSON output, or an object with neither
    /// list yields an empty partition. The returned lists only contain
    /// candidate ids, each at most once across both lists.
    pub async fn classify(
        &self,
        patient: &PatientProfile,
        transcript: &StructuredTranscript,
        candidates: &[CandidateTrial],
    ) -> Partition {
        let trials: Vec<TrialForEligibility> = candidates.iter().map(TrialForEligibility::from).collect();
        let trials_json = match serde_json::to_string_pretty(&trials) {
            Ok(json) => json,
            Err(e) => {
                warn!(stage = STAGE, error = %e, "Failed to serialize trials, using empty partition");
                return Partition::default();
            }
        };

        let profile = format_patient_profile(patient, transcript);
        let prompt = build_eligibility_prompt(&profile, &trials_json);
        debug!(stage = STAGE, candidates = candidates.len(), prompt_chars = prompt.len(), "Classifying eligibility");

        let judgment = self.caller.judge(&prompt, self.temperature).await;
        let (eligible, uncertain) = match &judgment {
            Judgment::Parsed(value) => (
                string_array(value, "eligible_trial_ids"),
                string_array(value, "uncertain_trial_ids"),
            ),
            _ => (None, None),
        };

        if eligible.is_none() && uncertain.is_none() {
            log_degraded(STAGE, &judgment);
            return Partition::default();
        }

        let partition = repair(eligible.unwrap_or_default(), uncertain.unwrap_or_default(), candidates);
        info!(
            candidates = candidates.len(),
            eligible = partition.eligible.len(),
            uncertain = partition.uncertain.len(),
            excluded = partition.excluded(candidates).len(),
            "Eligibility classified"
        );
        partition
    }
}

/// Keep candidate ids only, first occurrence wins, and an id listed as both
/// eligible and uncertain stays eligible.
fn repair(eligible: Vec<String>, uncertain: Vec<String>, candidates: &[CandidateTrial]) -> Partition {
    let known: HashSet<&str> = candidates.iter().map(|t| t.external_id.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut unknown = Vec::new();
    let mut duplicates = 0usize;

    let mut keep = |ids: Vec<String>| -> Vec<String> {
        let mut kept = Vec::with_capacity(ids.len());
        for id in ids {
            if !known.contains(id.as_str()) {
                unknown.push(id);
            } else if seen.insert(id.clone()) {
                kept.push(id);
            } else {
                duplicates += 1;
            }
        }
        kept
    };

    let eligible = keep(eligible);
    let uncertain = keep(uncertain);

    if !unknown.is_empty() {
        warn!(stage = STAGE, ids = ?unknown, "Dropped trial ids not in the candidate set");
    }
    if duplicates > 0 {
        warn!(stage = STAGE, duplicates, "Dropped repeated trial ids from classifier output");
    }

    Partition::new(eligible, uncertain)
}
