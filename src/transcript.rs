//! Raw clinical transcript to [`StructuredTranscript`].

use crate::domain::StructuredTranscript;
use crate::error::{Result, TrialMatchError};
use crate::llm::{log_degraded, Judgment, JudgmentCaller};
use crate::prompts::transcript::build_transcript_prompt;
use crate::storage::Storage;
use tracing::{debug, info};

/// Extraction is a factual task, keep it near-deterministic
pub const TRANSCRIPT_TEMPERATURE: f32 = 0.1;

pub struct TranscriptAnalyzer {
    caller: JudgmentCaller,
}

impl TranscriptAnalyzer {
    pub fn new(caller: JudgmentCaller) -> Self {
        Self { caller }
    }

    /// Extract structured medical data. An unusable judgment gives an empty
    /// transcript.
    pub async fn analyze(&self, raw_transcript: &str) -> StructuredTranscript {
        let prompt = build_transcript_prompt(raw_transcript);
        debug!(transcript_chars = raw_transcript.len(), "Analyzing transcript");

        match self.caller.judge(&prompt, TRANSCRIPT_TEMPERATURE).await {
            Judgment::Parsed(value) if value.is_object() => {
                let transcript = StructuredTranscript::from_value(&value);
                info!(
                    conditions = transcript.conditions.len(),
                    medications = transcript.medications.len(),
                    procedures = transcript.procedures.len(),
                    "Transcript analyzed"
                );
                transcript
            }
            judgment => {
                log_degraded("analyze_transcript", &judgment);
                StructuredTranscript::default()
            }
        }
    }

    /// Analyze and store a transcript for an existing patient. Returns the new
    /// transcript id.
    pub async fn ingest(&self, storage: &dyn Storage, patient_id: &str, raw_transcript: &str) -> Result<String> {
        if raw_transcript.trim().is_empty() {
            return Err(TrialMatchError::Validation("transcript text is empty".to_string()));
        }
        storage.get_patient(patient_id).await?;

        let transcript = self.analyze(raw_transcript).await;
        let transcript_id = storage.put_transcript(patient_id, transcript).await?;
        info!(patient_id = %patient_id, transcript_id = %transcript_id, "Transcript stored");
        Ok(transcript_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JudgmentError;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;
    use std::time::Duration;

    fn analyzer(llm: Arc<ScriptedLlm>) -> TranscriptAnalyzer {
        TranscriptAnalyzer::new(JudgmentCaller::new(llm, 2048, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn test_analyze_parses_lenient_output() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"```json
{
  "conditions": ["Diabetes", "Hypertension"],
  "medications": ["Metformin", null],
  "procedures": null,
  "age": 45,
  "sex": "MALE"
}
```"#
        .to_string())]));
        let transcript = analyzer(llm.clone()).analyze("Doctor: how is the diabetes?").await;

        assert_eq!(transcript.conditions, vec!["Diabetes".to_string(), "Hypertension".to_string()]);
        assert_eq!(transcript.medications, vec!["Metformin".to_string()]);
        assert!(transcript.procedures.is_empty());
        assert_eq!(transcript.age, Some(45));
        assert_eq!(llm.temperatures(), vec![TRANSCRIPT_TEMPERATURE]);
        assert!(llm.prompts()[0].contains("how is the diabetes?"));
    }

    #[tokio::test]
    async fn test_ingest_stores_for_known_patient() -> Result<()> {
        use crate::domain::PatientProfile;
        use crate::storage::MemoryStore;

        let store = MemoryStore::new();
        let patient_id = store.put_patient(PatientProfile::default()).await?;
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(r#"{"conditions": ["Asthma"]}"#.to_string())]));
        let analyzer = analyzer(llm.clone());

        let transcript_id = analyzer.ingest(&store, &patient_id, "Patient has asthma.").await?;
        assert_eq!(store.get_transcript(&transcript_id).await?.conditions, vec!["Asthma".to_string()]);

        assert!(matches!(
            analyzer.ingest(&store, "nobody", "text").await,
            Err(TrialMatchError::PatientNotFound(_))
        ));
        assert!(matches!(
            analyzer.ingest(&store, &patient_id, "   ").await,
            Err(TrialMatchError::Validation(_))
        ));
        // neither rejected call reached the model
        assert_eq!(llm.call_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_analyze_falls_back_to_empty() {
        for output in [
            Ok("no idea".to_string()),
            Ok("[]".to_string()),
            Err(JudgmentError::CallFailed("down".to_string())),
        ] {
            let llm = Arc::new(ScriptedLlm::new(vec![output]));
            assert_eq!(analyzer(llm).analyze("text").await, StructuredTranscript::default());
        }
    }
}
