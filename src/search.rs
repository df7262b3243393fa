//! Trial registry search collaborator.

use crate::domain::{CandidateTrial, PatientProfile, StructuredTranscript};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TrialSearch: Send + Sync {
    /// Candidate trials for this patient and transcript. An empty list is a
    /// valid answer.
    async fn search(&self, patient: &PatientProfile, transcript: &StructuredTranscript) -> Result<Vec<CandidateTrial>>;

    /// One trial by external id; `TrialNotFound` if the registry has none.
    async fn get_by_id(&self, external_id: &str) -> Result<CandidateTrial>;
}
