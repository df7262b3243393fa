//! Error types for trialscribe.
//!
//! Library functions return `Result<T, TrialMatchError>`. Failures of a single
//! LLM judgment are a separate type, [`JudgmentError`], because the classifier
//! and ranker absorb them instead of propagating.

use thiserror::Error;

/// Main error type for trialscribe operations.
#[derive(Debug, Error)]
pub enum TrialMatchError {
    /// No patient stored under this id
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    /// No structured transcript stored under this id
    #[error("Transcript not found: {0}")]
    TranscriptNotFound(String),

    /// Registry or storage has no trial with this external id
    #[error("Clinical trial not found: {0}")]
    TrialNotFound(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message from API
        message: String,
    },

    /// Response body could not be mapped
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// An external call exceeded its time budget
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },
}

/// Result type alias using `TrialMatchError`
pub type Result<T> = std::result::Result<T, TrialMatchError>;

/// Failure of one structured LLM judgment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JudgmentError {
    /// The completion request itself failed (network, auth, quota, timeout)
    #[error("LLM call failed: {0}")]
    CallFailed(String),

    /// The model answered, but not with parseable JSON
    #[error("Malformed LLM output: {reason}")]
    Malformed { raw: String, reason: String },
}

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| TrialMatchError::Parse(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        let err = TrialMatchError::PatientNotFound("p-1".to_string());
        assert_eq!(err.to_string(), "Patient not found: p-1");

        let err = TrialMatchError::Timeout { stage: "trial search", secs: 60 };
        assert_eq!(err.to_string(), "trial search timed out after 60s");
    }

    #[test]
    fn test_ok_or_parse() {
        let missing: Option<u32> = None;
        assert!(matches!(missing.ok_or_parse("no value"), Err(TrialMatchError::Parse(_))));
        assert_eq!(Some(3).ok_or_parse("no value").ok(), Some(3));
    }
}
