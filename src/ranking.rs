//! Relevance ranking of one partition.

use crate::domain::{CandidateTrial, PatientProfile, StructuredTranscript};
use crate::eligibility::truncate_chars;
use crate::llm::{log_degraded, string_array, Judgment, JudgmentCaller};
use crate::prompts::format_patient_profile;
use crate::prompts::ranking::build_ranking_prompt;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

const MAX_SUMMARY_CHARS: usize = 1500;
const MAX_CRITERIA_CHARS: usize = 3000;

/// Which partition is being ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionLabel {
    Eligible,
    Uncertain,
}

impl PartitionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionLabel::Eligible => "eligible",
            PartitionLabel::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for PartitionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trial data shown to the ranker
#[derive(Debug, Serialize)]
struct TrialForRanking {
    id: String,
    brief_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    official_title: Option<String>,
    conditions: Vec<String>,
    brief_summary: String,
    eligibility_criteria: String,
}

impl From<&CandidateTrial> for TrialForRanking {
    fn from(t: &CandidateTrial) -> Self {
        Self {
            id: t.external_id.clone(),
            brief_title: t.brief_title.clone(),
            official_title: t.official_title.clone(),
            conditions: t.conditions.clone(),
            brief_summary: truncate_chars(t.brief_summary.as_deref().unwrap_or(""), MAX_SUMMARY_CHARS),
            eligibility_criteria: truncate_chars(t.eligibility_criteria.as_deref().unwrap_or(""), MAX_CRITERIA_CHARS),
        }
    }
}

pub struct RelevanceRanker {
    caller: JudgmentCaller,
    temperature: f32,
}

impl RelevanceRanker {
    pub fn new(caller: JudgmentCaller, temperature: f32) -> Self {
        Self { caller, temperature }
    }

    /// Order `subset_ids` by relevance, most relevant first.
    ///
    /// Only the candidates in `subset_ids` are shown to the model. The model may
    /// return a subset. Any unusable judgment returns `subset_ids` unchanged.
    /// An empty subset returns immediately without a call.
    ///
    /// The output is not filtered against `subset_ids`; callers resolve it.
    pub async fn rank(
        &self,
        patient: &PatientProfile,
        transcript: &StructuredTranscript,
        candidates: &[CandidateTrial],
        subset_ids: &[String],
        label: PartitionLabel,
    ) -> Vec<String> {
        if subset_ids.is_empty() {
            return Vec::new();
        }

        let trials: Vec<TrialForRanking> = candidates
            .iter()
            .filter(|t| subset_ids.contains(&t.external_id))
            .map(TrialForRanking::from)
            .collect();
        let trials_json = match serde_json::to_string_pretty(&trials) {
            Ok(json) => json,
            Err(e) => {
                warn!(stage = "rank", label = %label, error = %e, "Failed to serialize trials, keeping input order");
                return subset_ids.to_vec();
            }
        };

        let profile = format_patient_profile(patient, transcript);
        let prompt = build_ranking_prompt(label.as_str(), &profile, &trials_json);
        debug!(label = %label, trials = trials.len(), prompt_chars = prompt.len(), "Ranking partition");

        let judgment = self.caller.judge(&prompt, self.temperature).await;
        let ranked = match &judgment {
            Judgment::Parsed(value) => string_array(value, "ranked_trial_ids"),
            _ => None,
        };

        match ranked {
            Some(ranked) => {
                info!(label = %label, given = subset_ids.len(), ranked = ranked.len(), "Partition ranked");
                ranked
            }
            None => {
                log_degraded(if label == PartitionLabel::Eligible { "rank_eligible" } else { "rank_uncertain" }, &judgment);
                subset_ids.to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JudgmentError;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;
    use std::time::Duration;

    fn candidates() -> Vec<CandidateTrial> {
        let mut first = CandidateTrial::new("NCT1", "First");
        first.brief_summary = Some("Metformin add-on therapy".to_string());
        first.conditions = vec!["Type 2 Diabetes".to_string()];
        vec![first, CandidateTrial::new("NCT2", "Second"), CandidateTrial::new("NCT3", "Third")]
    }

    fn ranker(llm: Arc<ScriptedLlm>) -> RelevanceRanker {
        RelevanceRanker::new(JudgmentCaller::new(llm, 1024, Duration::from_secs(5)), 0.3)
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_rank_returns_model_order() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"{"ranked_trial_ids": ["NCT3", "NCT1"]}"#.to_string())]));
        let ranked = ranker(llm.clone())
            .rank(
                &PatientProfile::default(),
                &StructuredTranscript::default(),
                &candidates(),
                &ids(&["NCT1", "NCT3"]),
                PartitionLabel::Eligible,
            )
            .await;

        assert_eq!(ranked, ids(&["NCT3", "NCT1"]));
        assert_eq!(llm.temperatures(), vec![0.3]);
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Metformin add-on therapy"));
        assert!(prompt.contains("\"NCT3\""));
        assert!(!prompt.contains("\"NCT2\""));
    }

    #[tokio::test]
    async fn test_empty_subset_makes_no_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let ranked = ranker(llm.clone())
            .rank(
                &PatientProfile::default(),
                &StructuredTranscript::default(),
                &candidates(),
                &[],
                PartitionLabel::Uncertain,
            )
            .await;

        assert!(ranked.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unusable_output_keeps_input_order() {
        let outputs = vec![
            Ok("not json at all".to_string()),
            Ok(r#"{"order": ["NCT2"]}"#.to_string()),
            Ok(r#"["NCT2", "NCT1"]"#.to_string()),
            Err(JudgmentError::CallFailed("timeout".to_string())),
        ];
        for output in outputs {
            let llm = Arc::new(ScriptedLlm::new(vec![output]));
            let ranked = ranker(llm)
                .rank(
                    &PatientProfile::default(),
                    &StructuredTranscript::default(),
                    &candidates(),
                    &ids(&["NCT2", "NCT1", "NCT3"]),
                    PartitionLabel::Eligible,
                )
                .await;
            assert_eq!(ranked, ids(&["NCT2", "NCT1", "NCT3"]));
        }
    }

    #[test]
    fn test_label_display() {
        assert_eq!(PartitionLabel::Eligible.to_string(), "eligible");
        assert_eq!(PartitionLabel::Uncertain.as_str(), "uncertain");
    }
}
