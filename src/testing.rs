//! Scripted collaborators for unit tests.

use crate::domain::{CandidateTrial, PatientProfile, RecommendationRecord, StructuredTranscript};
use crate::error::{JudgmentError, Result, TrialMatchError};
use crate::llm::CompletionClient;
use crate::search::TrialSearch;
use crate::storage::{MemoryStore, Storage};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Scripted = std::result::Result<String, JudgmentError>;

/// Completion client that replays canned answers.
///
/// Routed answers are matched by a substring of the prompt and can be used any
/// number of times; otherwise answers are taken from the queue in order. When
/// neither yields an answer the call fails.
#[derive(Default)]
pub struct ScriptedLlm {
    queue: Mutex<VecDeque<Scripted>>,
    routes: Vec<(String, Scripted)>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, f32)>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    /// Answer any prompt containing `needle` with `response`.
    pub fn route(mut self, needle: &str, response: Scripted) -> Self {
        self.routes.push((needle.to_string(), response));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn temperatures(&self) -> Vec<f32> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(_, t)| *t).collect())
            .unwrap_or_default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, prompt: &str, temperature: f32, _max_tokens: u32) -> Scripted {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((prompt.to_string(), temperature));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((_, response)) = self.routes.iter().find(|(needle, _)| prompt.contains(needle.as_str())) {
            return response.clone();
        }
        self.queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Err(JudgmentError::CallFailed("no scripted response left".to_string())))
    }
}

/// Search collaborator over a fixed trial list
pub struct StubSearch {
    trials: Vec<CandidateTrial>,
    fail_with: Option<String>,
    delay: Option<Duration>,
    searches: AtomicUsize,
}

impl StubSearch {
    pub fn new(trials: Vec<CandidateTrial>) -> Self {
        Self {
            trials,
            fail_with: None,
            delay: None,
            searches: AtomicUsize::new(0),
        }
    }

    /// Every search fails with an `Api` error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrialSearch for StubSearch {
    async fn search(&self, _patient: &PatientProfile, _transcript: &StructuredTranscript) -> Result<Vec<CandidateTrial>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(message) => Err(TrialMatchError::Api {
                code: 503,
                message: message.clone(),
            }),
            None => Ok(self.trials.clone()),
        }
    }

    async fn get_by_id(&self, external_id: &str) -> Result<CandidateTrial> {
        self.trials
            .iter()
            .find(|t| t.external_id == external_id)
            .cloned()
            .ok_or_else(|| TrialMatchError::TrialNotFound(external_id.to_string()))
    }
}

/// In-memory store that fails on demand
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_trials: HashSet<String>,
    fail_record_reads: bool,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    /// Upserting this trial id fails.
    pub fn fail_trial(mut self, external_id: &str) -> Self {
        self.failing_trials.insert(external_id.to_string());
        self
    }

    /// Reading an existing recommendation record fails.
    pub fn fail_record_reads(mut self) -> Self {
        self.fail_record_reads = true;
        self
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for FlakyStore {
    async fn get_patient(&self, patient_id: &str) -> Result<PatientProfile> {
        self.inner.get_patient(patient_id).await
    }

    async fn put_patient(&self, patient: PatientProfile) -> Result<String> {
        self.inner.put_patient(patient).await
    }

    async fn get_transcript(&self, transcript_id: &str) -> Result<StructuredTranscript> {
        self.inner.get_transcript(transcript_id).await
    }

    async fn put_transcript(&self, patient_id: &str, transcript: StructuredTranscript) -> Result<String> {
        self.inner.put_transcript(patient_id, transcript).await
    }

    async fn upsert_trial(&self, trial: &CandidateTrial) -> Result<String> {
        if self.failing_trials.contains(&trial.external_id) {
            return Err(TrialMatchError::Storage(format!("write rejected for {}", trial.external_id)));
        }
        self.inner.upsert_trial(trial).await
    }

    async fn get_trial(&self, external_id: &str) -> Result<Option<CandidateTrial>> {
        self.inner.get_trial(external_id).await
    }

    async fn get_recommendations(&self, transcript_id: &str) -> Result<Option<RecommendationRecord>> {
        if self.fail_record_reads {
            return Err(TrialMatchError::Storage("record unreadable".to_string()));
        }
        self.inner.get_recommendations(transcript_id).await
    }

    async fn create_recommendations(
        &self,
        transcript_id: &str,
        eligible_ids: &[String],
        uncertain_ids: &[String],
    ) -> Result<String> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner
            .create_recommendations(transcript_id, eligible_ids, uncertain_ids)
            .await
    }

    async fn update_recommendations(
        &self,
        transcript_id: &str,
        eligible_ids: &[String],
        uncertain_ids: &[String],
    ) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner
            .update_recommendations(transcript_id, eligible_ids, uncertain_ids)
            .await
    }
}
