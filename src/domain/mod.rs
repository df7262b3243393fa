//! Domain model shared by the pipeline stages and the collaborators.

pub mod patient;
pub mod transcript;
pub mod trial;

pub use patient::{Address, PatientProfile};
pub use transcript::StructuredTranscript;
pub use trial::{CandidateTrial, Intervention, SourceRegistry, TrialLocation, TrialPreview};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Eligibility split of a candidate set. Trials in neither list are excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub eligible: Vec<String>,
    pub uncertain: Vec<String>,
}

impl Partition {
    pub fn new(eligible: Vec<String>, uncertain: Vec<String>) -> Self {
        Self { eligible, uncertain }
    }

    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty() && self.uncertain.is_empty()
    }

    /// Candidate ids that landed in neither list, in candidate order.
    pub fn excluded<'a>(&self, candidates: &'a [CandidateTrial]) -> Vec<&'a str> {
        candidates
            .iter()
            .map(|t| t.external_id.as_str())
            .filter(|id| !self.eligible.iter().any(|e| e == id) && !self.uncertain.iter().any(|u| u == id))
            .collect()
    }
}

/// Persisted outcome of one pipeline run, keyed by transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: String,
    pub transcript_id: String,
    pub eligible_trial_ids: Vec<String>,
    pub uncertain_trial_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecommendationRecord {
    pub fn new(transcript_id: &str, eligible_trial_ids: Vec<String>, uncertain_trial_ids: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transcript_id: transcript_id.to_string(),
            eligible_trial_ids,
            uncertain_trial_ids,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn partition(&self) -> Partition {
        Partition::new(self.eligible_trial_ids.clone(), self.uncertain_trial_ids.clone())
    }
}

/// Stored recommendation lists resolved back to trial records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendedTrials {
    pub eligible: Vec<CandidateTrial>,
    pub uncertain: Vec<CandidateTrial>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_is_the_complement() {
        let candidates = vec![
            CandidateTrial::new("NCT1", "a"),
            CandidateTrial::new("NCT2", "b"),
            CandidateTrial::new("NCT3", "c"),
        ];
        let partition = Partition::new(vec!["NCT1".to_string()], vec!["NCT2".to_string()]);
        assert_eq!(partition.excluded(&candidates), vec!["NCT3"]);
        assert!(!partition.is_empty());
        assert!(Partition::default().is_empty());
    }
}
