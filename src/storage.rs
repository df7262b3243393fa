//! Storage collaborator and its two backends.
//!
//! [`MemoryStore`] keeps everything in process. [`JsonFileStore`] keeps the
//! same snapshot in a JSON file, rewritten (temp file + rename) after every
//! mutation; a missing file is an empty store.

use crate::domain::{CandidateTrial, PatientProfile, RecommendationRecord, StructuredTranscript};
use crate::error::{Result, TrialMatchError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_patient(&self, patient_id: &str) -> Result<PatientProfile>;

    /// Insert or replace a patient; a blank id gets a fresh one. Returns the id.
    async fn put_patient(&self, patient: PatientProfile) -> Result<String>;

    async fn get_transcript(&self, transcript_id: &str) -> Result<StructuredTranscript>;

    /// Store a transcript for an existing patient. Returns the new transcript id.
    async fn put_transcript(&self, patient_id: &str, transcript: StructuredTranscript) -> Result<String>;

    /// Insert or replace a trial by external id. Returns the external id.
    async fn upsert_trial(&self, trial: &CandidateTrial) -> Result<String>;

    /// Upsert each trial; a failing trial is logged and skipped. Returns how
    /// many were stored.
    async fn upsert_trials(&self, trials: &[CandidateTrial]) -> Result<usize> {
        let mut stored = 0;
        for trial in trials {
            match self.upsert_trial(trial).await {
                Ok(_) => stored += 1,
                Err(e) => warn!(trial_id = %trial.external_id, error = %e, "Failed to persist trial, skipping"),
            }
        }
        Ok(stored)
    }

    async fn get_trial(&self, external_id: &str) -> Result<Option<CandidateTrial>>;

    async fn get_recommendations(&self, transcript_id: &str) -> Result<Option<RecommendationRecord>>;

    /// Fails if a record already exists for the transcript. Returns the record id.
    async fn create_recommendations(
        &self,
        transcript_id: &str,
        eligible_ids: &[String],
        uncertain_ids: &[String],
    ) -> Result<String>;

    /// Fails if no record exists for the transcript.
    async fn update_recommendations(
        &self,
        transcript_id: &str,
        eligible_ids: &[String],
        uncertain_ids: &[String],
    ) -> Result<()>;
}

/// Transcript row: the structured data plus its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTranscript {
    pub patient_id: String,
    pub transcript: StructuredTranscript,
    pub created_at: DateTime<Utc>,
}

/// Everything a store holds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub patients: BTreeMap<String, PatientProfile>,
    #[serde(default)]
    pub transcripts: BTreeMap<String, StoredTranscript>,
    #[serde(default)]
    pub trials: BTreeMap<String, CandidateTrial>,
    /// Keyed by transcript id
    #[serde(default)]
    pub recommendations: BTreeMap<String, RecommendationRecord>,
}

impl StoreSnapshot {
    fn get_patient(&self, patient_id: &str) -> Result<PatientProfile> {
        self.patients
            .get(patient_id)
            .cloned()
            .ok_or_else(|| TrialMatchError::PatientNotFound(patient_id.to_string()))
    }

    fn put_patient(&mut self, mut patient: PatientProfile) -> String {
        if patient.id.trim().is_empty() {
            patient.id = uuid::Uuid::new_v4().to_string();
        }
        let id = patient.id.clone();
        self.patients.insert(id.clone(), patient);
        id
    }

    fn get_transcript(&self, transcript_id: &str) -> Result<StructuredTranscript> {
        self.transcripts
            .get(transcript_id)
            .map(|t| t.transcript.clone())
            .ok_or_else(|| TrialMatchError::TranscriptNotFound(transcript_id.to_string()))
    }

    fn put_transcript(&mut self, patient_id: &str, transcript: StructuredTranscript) -> Result<String> {
        if !self.patients.contains_key(patient_id) {
            return Err(TrialMatchError::PatientNotFound(patient_id.to_string()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.transcripts.insert(
            id.clone(),
            StoredTranscript {
                patient_id: patient_id.to_string(),
                transcript,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn upsert_trial(&mut self, trial: &CandidateTrial) -> Result<String> {
        if trial.external_id.trim().is_empty() {
            return Err(TrialMatchError::Validation("trial has no external id".to_string()));
        }
        self.trials.insert(trial.external_id.clone(), trial.clone());
        Ok(trial.external_id.clone())
    }

    fn create_recommendations(&mut self, transcript_id: &str, eligible: &[String], uncertain: &[String]) -> Result<String> {
        if self.recommendations.contains_key(transcript_id) {
            return Err(TrialMatchError::Storage(format!(
                "recommendations already exist for transcript {}",
                transcript_id
            )));
        }
        let record = RecommendationRecord::new(transcript_id, eligible.to_vec(), uncertain.to_vec());
        let id = record.id.clone();
        self.recommendations.insert(transcript_id.to_string(), record);
        Ok(id)
    }

    fn update_recommendations(&mut self, transcript_id: &str, eligible: &[String], uncertain: &[String]) -> Result<()> {
        let record = self.recommendations.get_mut(transcript_id).ok_or_else(|| {
            TrialMatchError::Storage(format!("no recommendations for transcript {}", transcript_id))
        })?;
        record.eligible_trial_ids = eligible.to_vec();
        record.uncertain_trial_ids = uncertain.to_vec();
        record.updated_at = Utc::now();
        Ok(())
    }
}

fn poisoned() -> TrialMatchError {
    TrialMatchError::Storage("store lock poisoned".to_string())
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&StoreSnapshot) -> Result<T>) -> Result<T> {
        let data = self.data.read().map_err(|_| poisoned())?;
        f(&data)
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreSnapshot) -> Result<T>) -> Result<T> {
        let mut data = self.data.write().map_err(|_| poisoned())?;
        f(&mut data)
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get_patient(&self, patient_id: &str) -> Result<PatientProfile> {
        self.read(|d| d.get_patient(patient_id))
    }

    async fn put_patient(&self, patient: PatientProfile) -> Result<String> {
        self.write(|d| Ok(d.put_patient(patient)))
    }

    async fn get_transcript(&self, transcript_id: &str) -> Result<StructuredTranscript> {
        self.read(|d| d.get_transcript(transcript_id))
    }

    async fn put_transcript(&self, patient_id: &str, transcript: StructuredTranscript) -> Result<String> {
        self.write(|d| d.put_transcript(patient_id, transcript))
    }

    async fn upsert_trial(&self, trial: &CandidateTrial) -> Result<String> {
        self.write(|d| d.upsert_trial(trial))
    }

    async fn get_trial(&self, external_id: &str) -> Result<Option<CandidateTrial>> {
        self.read(|d| Ok(d.trials.get(external_id).cloned()))
    }

    async fn get_recommendations(&self, transcript_id: &str) -> Result<Option<RecommendationRecord>> {
        self.read(|d| Ok(d.recommendations.get(transcript_id).cloned()))
    }

    async fn create_recommendations(
        &self,
        transcript_id: &str,
        eligible_ids: &[String],
        uncertain_ids: &[String],
    ) -> Result<String> {
        self.write(|d| d.create_recommendations(transcript_id, eligible_ids, uncertain_ids))
    }

    async fn update_recommendations(
        &self,
        transcript_id: &str,
        eligible_ids: &[String],
        uncertain_ids: &[String],
    ) -> Result<()> {
        self.write(|d| d.update_recommendations(transcript_id, eligible_ids, uncertain_ids))
    }
}

/// Store persisted as one JSON document
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreSnapshot>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading it if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = load_snapshot(&path)?;
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Open the store at the default location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::default_store_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the backing file and empty the store.
    pub async fn clear(&self) -> Result<()> {
        let mut data = self.data.lock().await;
        *data = StoreSnapshot::default();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!("Cleared store at {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn read<T>(&self, f: impl FnOnce(&StoreSnapshot) -> Result<T>) -> Result<T> {
        let data = self.data.lock().await;
        f(&data)
    }

    /// Apply a mutation and persist it on the blocking pool. The in-memory
    /// state only changes if the write reaches disk; the lock is held until
    /// then so writes land in order.
    async fn write<T>(&self, f: impl FnOnce(&mut StoreSnapshot) -> Result<T>) -> Result<T> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let out = f(&mut next)?;

        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || save_snapshot(&path, &next).map(|()| next))
            .await
            .map_err(|e| TrialMatchError::Storage(format!("store write task failed: {}", e)))??;
        *data = next;
        Ok(out)
    }
}

fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    if !path.exists() {
        debug!("Store file not found, starting empty: {:?}", path);
        return Ok(StoreSnapshot::default());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(StoreSnapshot::default());
    }
    let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
    info!(
        patients = snapshot.patients.len(),
        transcripts = snapshot.transcripts.len(),
        trials = snapshot.trials.len(),
        "Loaded store from {:?}",
        path
    );
    Ok(snapshot)
}

fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl Storage for JsonFileStore {
    async fn get_patient(&self, patient_id: &str) -> Result<PatientProfile> {
        self.read(|d| d.get_patient(patient_id)).await
    }

    async fn put_patient(&self, patient: PatientProfile) -> Result<String> {
        self.write(|d| Ok(d.put_patient(patient))).await
    }

    async fn get_transcript(&self, transcript_id: &str) -> Result<StructuredTranscript> {
        self.read(|d| d.get_transcript(transcript_id)).await
    }

    async fn put_transcript(&self, patient_id: &str, transcript: StructuredTranscript) -> Result<String> {
        self.write(|d| d.put_transcript(patient_id, transcript)).await
    }

    async fn upsert_trial(&self, trial: &CandidateTrial) -> Result<String> {
        self.write(|d| d.upsert_trial(trial)).await
    }

    /// One file write for the whole batch.
    async fn upsert_trials(&self, trials: &[CandidateTrial]) -> Result<usize> {
        self.write(|d| {
            let mut stored = 0;
            for trial in trials {
                match d.upsert_trial(trial) {
                    Ok(_) => stored += 1,
                    Err(e) => warn!(trial_id = %trial.external_id, error = %e, "Failed to persist trial, skipping"),
                }
            }
            Ok(stored)
        })
        .await
    }

    async fn get_trial(&self, external_id: &str) -> Result<Option<CandidateTrial>> {
        self.read(|d| Ok(d.trials.get(external_id).cloned())).await
    }

    async fn get_recommendations(&self, transcript_id: &str) -> Result<Option<RecommendationRecord>> {
        self.read(|d| Ok(d.recommendations.get(transcript_id).cloned())).await
    }

    async fn create_recommendations(
        &self,
        transcript_id: &str,
        eligible_ids: &[String],
        uncertain_ids: &[String],
    ) -> Result<String> {
        self.write(|d| d.create_recommendations(transcript_id, eligible_ids, uncertain_ids)).await
    }

    async fn update_recommendations(
        &self,
        transcript_id: &str,
        eligible_ids: &[String],
        uncertain_ids: &[String],
    ) -> Result<()> {
        self.write(|d| d.update_recommendations(transcript_id, eligible_ids, uncertain_ids)).await
    }
}
