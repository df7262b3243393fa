//! Runtime configuration for the LLM client, the registry client and the
//! recommendation pipeline.

use crate::error::{Result, TrialMatchError};
use std::path::PathBuf;
use std::time::Duration;

/// Default chat model name
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default store file name under the home directory
const STORE_FILE_NAME: &str = ".trialscribe_store.json";

/// LLM configuration (OpenAI-compatible endpoint)
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }

    /// Reject configurations that can never produce a successful call.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(TrialMatchError::Config("LLM API key is required".to_string()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| TrialMatchError::Config(format!("Invalid LLM base URL {:?}: {}", self.base_url, e)))?;
        if self.model.trim().is_empty() {
            return Err(TrialMatchError::Config("LLM model name is required".to_string()));
        }
        Ok(())
    }
}

/// Knobs for the classify/rank stages
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub classifier_temperature: f32,
    pub ranker_temperature: f32,
    pub max_tokens: u32,
    /// Upper bound for one classifier or ranker call
    pub judgment_timeout: Duration,
    /// Upper bound for the candidate search
    pub search_timeout: Duration,
    /// Rank the eligible and uncertain partitions at the same time
    pub concurrent_ranking: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier_temperature: 0.1,
            ranker_temperature: 0.3,
            max_tokens: 4096,
            judgment_timeout: Duration::from_secs(120),
            search_timeout: Duration::from_secs(60),
            concurrent_ranking: true,
        }
    }
}

/// ClinicalTrials.gov client settings
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub page_size: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: crate::ctgov::CTGOV_API_BASE.to_string(),
            page_size: 50,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Default store path: `~/.trialscribe_store.json`
pub fn default_store_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(STORE_FILE_NAME))
        .ok_or_else(|| TrialMatchError::Config("Cannot determine home directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::default();
        assert!(config.classifier_temperature < config.ranker_temperature);
        assert_eq!(config.search_timeout, Duration::from_secs(60));
        assert!(config.concurrent_ranking);
    }

    #[test]
    fn test_llm_config_validation() {
        let ok = LlmConfig::new("https://api.example.com/v1", "key", DEFAULT_MODEL);
        assert!(ok.validate().is_ok());

        let no_key = LlmConfig::new("https://api.example.com/v1", " ", DEFAULT_MODEL);
        assert!(matches!(no_key.validate(), Err(TrialMatchError::Config(_))));

        let bad_url = LlmConfig::new("not a url", "key", DEFAULT_MODEL);
        assert!(matches!(bad_url.validate(), Err(TrialMatchError::Config(_))));
    }
}
