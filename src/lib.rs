//! # trialscribe
//!
//! Transcript-driven clinical trial matching.
//!
//! A clinical transcript is turned into structured medical data by an LLM,
//! candidate trials are fetched from ClinicalTrials.gov, and two further LLM
//! judgments classify the candidates by eligibility and rank each partition by
//! relevance.
//!
//! ## Modules
//!
//! - [`recommendation`] - the recommendation pipeline and read-side lookups
//! - [`eligibility`] - eligible/uncertain classification
//! - [`ranking`] - relevance ranking per partition
//! - [`transcript`] - raw transcript analysis
//! - [`llm`] - chat-completions client and structured JSON judgments
//! - [`ctgov`] - ClinicalTrials.gov API v2 client
//! - [`storage`] - in-memory and JSON-file stores
//! - [`api`] - HTTP routes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trialscribe::config::{LlmConfig, PipelineConfig, RegistryConfig};
//! use trialscribe::ctgov::ClinicalTrialsGovClient;
//! use trialscribe::llm::OpenAiClient;
//! use trialscribe::recommendation::RecommendationService;
//! use trialscribe::storage::JsonFileStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let llm = OpenAiClient::new(LlmConfig::new("https://api.openai.com/v1", "sk-...", "gpt-4o-mini"))?;
//!     let service = RecommendationService::new(
//!         Arc::new(JsonFileStore::open_default()?),
//!         Arc::new(ClinicalTrialsGovClient::new(RegistryConfig::default())?),
//!         Arc::new(llm),
//!         PipelineConfig::default(),
//!     );
//!     service.create_recommended_trials("patient-id", "transcript-id").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod ctgov;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod ranking;
pub mod recommendation;
pub mod search;
pub mod storage;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, TrialMatchError};
