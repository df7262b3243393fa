//! Trial recommendation pipeline.
//!
//! One run per (patient, transcript):
//!
//! ```text
//! FETCH_INPUTS -> FETCH_CANDIDATES -> CLASSIFY -> RANK_ELIGIBLE / RANK_UNCERTAIN -> PERSIST
//!                        |
//!                        +-- no candidates -> PERSIST (empty lists)
//! ```
//!
//! Missing patient or transcript aborts the run. A failed classifier or ranker
//! judgment degrades (empty partition, input order). Persist tolerates
//! per-trial write failures and an unreadable prior record.

use crate::config::PipelineConfig;
use crate::domain::{CandidateTrial, RecommendedTrials};
use crate::eligibility::EligibilityClassifier;
use crate::error::{Result, TrialMatchError};
use crate::llm::{CompletionClient, JudgmentCaller, TokenUsage};
use crate::ranking::{PartitionLabel, RelevanceRanker};
use crate::search::TrialSearch;
use crate::storage::Storage;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrates the pipeline and the read side over the same collaborators.
pub struct RecommendationService {
    storage: Arc<dyn Storage>,
    search: Arc<dyn TrialSearch>,
    caller: JudgmentCaller,
    classifier: EligibilityClassifier,
    ranker: RelevanceRanker,
    config: PipelineConfig,
}

impl RecommendationService {
    pub fn new(
        storage: Arc<dyn Storage>,
        search: Arc<dyn TrialSearch>,
        llm: Arc<dyn CompletionClient>,
        config: PipelineConfig,
    ) -> Self {
        let caller = JudgmentCaller::new(llm, config.max_tokens, config.judgment_timeout);
        Self {
            storage,
            search,
            classifier: EligibilityClassifier::new(caller.clone(), config.classifier_temperature),
            ranker: RelevanceRanker::new(caller.clone(), config.ranker_temperature),
            caller,
            config,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn caller(&self) -> &JudgmentCaller {
        &self.caller
    }

    /// Run the pipeline and store the ranked eligible and uncertain ids for
    /// the transcript. Re-running replaces the previous result.
    pub async fn create_recommended_trials(&self, patient_id: &str, transcript_id: &str) -> Result<()> {
        let started = Instant::now();
        let usage_before = self.caller.token_usage();

        let patient = self.storage.get_patient(patient_id).await?;
        let transcript = self.storage.get_transcript(transcript_id).await?;

        let search = self.search.search(&patient, &transcript);
        let candidates = tokio::time::timeout(self.config.search_timeout, search)
            .await
            .map_err(|_| TrialMatchError::Timeout {
                stage: "trial search",
                secs: self.config.search_timeout.as_secs(),
            })??;

        info!(
            patient_id = %patient_id,
            transcript_id = %transcript_id,
            candidates = candidates.len(),
            "Fetched candidate trials"
        );

        if candidates.is_empty() {
            self.save_recommendations(transcript_id, &[], &[]).await?;
            info!(transcript_id = %transcript_id, "No candidate trials, stored empty recommendations");
            return Ok(());
        }

        let partition = self.classifier.classify(&patient, &transcript, &candidates).await;

        let rank_eligible = self.ranker.rank(
            &patient,
            &transcript,
            &candidates,
            &partition.eligible,
            PartitionLabel::Eligible,
        );
        let rank_uncertain = self.ranker.rank(
            &patient,
            &transcript,
            &candidates,
            &partition.uncertain,
            PartitionLabel::Uncertain,
        );
        let (ranked_eligible, ranked_uncertain) = if self.config.concurrent_ranking {
            futures::join!(rank_eligible, rank_uncertain)
        } else {
            (rank_eligible.await, rank_uncertain.await)
        };

        let eligible = resolve(&ranked_eligible, &partition.eligible, &candidates, PartitionLabel::Eligible);
        let uncertain = resolve(&ranked_uncertain, &partition.uncertain, &candidates, PartitionLabel::Uncertain);
        let eligible_ids: Vec<String> = eligible.iter().map(|t| t.external_id.clone()).collect();
        let uncertain_ids: Vec<String> = uncertain.iter().map(|t| t.external_id.clone()).collect();

        match self.storage.upsert_trials(&candidates).await {
            Ok(stored) => debug!(stored, total = candidates.len(), "Persisted candidate trials"),
            Err(e) => warn!(error = %e, "Failed to persist candidate trials"),
        }
        self.save_recommendations(transcript_id, &eligible_ids, &uncertain_ids).await?;

        let usage = self.caller.token_usage().since(&usage_before);
        info!(
            transcript_id = %transcript_id,
            eligible = eligible_ids.len(),
            uncertain = uncertain_ids.len(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recommendations stored"
        );
        Ok(())
    }

    /// Create the record, or update it in place when one exists. A prior record
    /// that cannot be read counts as absent; if the create then collides with a
    /// record that does exist, that record is updated instead.
    async fn save_recommendations(&self, transcript_id: &str, eligible: &[String], uncertain: &[String]) -> Result<()> {
        let (existing, read_failed) = match self.storage.get_recommendations(transcript_id).await {
            Ok(record) => (record, false),
            Err(e) => {
                warn!(transcript_id = %transcript_id, error = %e, "Could not read prior recommendations, creating");
                (None, true)
            }
        };

        if existing.is_some() {
            return self.storage.update_recommendations(transcript_id, eligible, uncertain).await;
        }

        match self.storage.create_recommendations(transcript_id, eligible, uncertain).await {
            Ok(_) => Ok(()),
            Err(e) if read_failed => {
                warn!(transcript_id = %transcript_id, error = %e, "Create failed after unreadable prior record, updating");
                self.storage
                    .update_recommendations(transcript_id, eligible, uncertain)
                    .await
                    .map_err(|_| e)
            }
            Err(e) => Err(e),
        }
    }

    /// Trial details, see [`lookup_trial`].
    pub async fn get_clinical_trial(&self, external_id: &str) -> Result<CandidateTrial> {
        lookup_trial(self.storage.as_ref(), self.search.as_ref(), external_id).await
    }

    /// Stored recommendations resolved to trial records, in stored order. Ids
    /// whose trial is no longer stored are skipped.
    pub async fn get_recommended_trials(&self, transcript_id: &str) -> Result<RecommendedTrials> {
        let record = match self.storage.get_recommendations(transcript_id).await? {
            Some(record) => record,
            None => {
                // distinguish "unknown transcript" from "not yet recommended"
                self.storage.get_transcript(transcript_id).await?;
                return Ok(RecommendedTrials::default());
            }
        };

        Ok(RecommendedTrials {
            eligible: self.load_trials(&record.eligible_trial_ids).await?,
            uncertain: self.load_trials(&record.uncertain_trial_ids).await?,
        })
    }

    async fn load_trials(&self, ids: &[String]) -> Result<Vec<CandidateTrial>> {
        let mut trials = Vec::with_capacity(ids.len());
        for id in ids {
            match self.storage.get_trial(id).await? {
                Some(trial) => trials.push(trial),
                None => debug!(trial_id = %id, "Recommended trial no longer stored"),
            }
        }
        Ok(trials)
    }

    /// Tokens consumed by this service's LLM client so far.
    pub fn token_usage(&self) -> TokenUsage {
        self.caller.token_usage()
    }
}

/// Trial details: stored copy first, then the registry (cached on success).
pub async fn lookup_trial(storage: &dyn Storage, search: &dyn TrialSearch, external_id: &str) -> Result<CandidateTrial> {
    if let Some(trial) = storage.get_trial(external_id).await? {
        return Ok(trial);
    }

    let trial = search.get_by_id(external_id).await?;
    if let Err(e) = storage.upsert_trial(&trial).await {
        warn!(trial_id = %trial.external_id, error = %e, "Failed to cache trial");
    }
    Ok(trial)
}

/// Map ranked ids back to candidates. Ids outside `subset` or the candidate
/// set are dropped, repeats keep the first position.
fn resolve<'a>(
    ranked: &[String],
    subset: &[String],
    candidates: &'a [CandidateTrial],
    label: PartitionLabel,
) -> Vec<&'a CandidateTrial> {
    let allowed: HashSet<&str> = subset.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    let mut resolved = Vec::with_capacity(ranked.len());

    for id in ranked {
        let trial = allowed
            .contains(id.as_str())
            .then(|| candidates.iter().find(|t| &t.external_id == id))
            .flatten();
        match trial {
            Some(trial) if seen.insert(id.as_str()) => resolved.push(trial),
            Some(_) => {}
            None => dropped.push(id.as_str()),
        }
    }

    if !dropped.is_empty() {
        warn!(label = %label, ids = ?dropped, "Dropped ranked ids outside the partition");
    }
    resolved
}
