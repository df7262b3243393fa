//! Structured LLM judgments.
//!
//! [`OpenAiClient`] talks to any OpenAI-compatible chat-completions endpoint.
//! [`JudgmentCaller`] sits on top of a [`CompletionClient`]: one attempt per
//! call, bounded by a timeout, with the completion parsed as JSON after
//! stripping a single ```` ```json ```` fence. The outcome is a [`Judgment`],
//! so callers match on it instead of catching errors.

use crate::config::LlmConfig;
use crate::error::{JudgmentError, OptionExt, Result, TrialMatchError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// System prompt sent with every structured judgment
pub const JSON_SYSTEM_PROMPT: &str =
    "You are a careful clinical research assistant. Respond with a single valid JSON object only, no prose and no markdown.";

/// Characters of raw output kept in log previews
const PREVIEW_CHARS: usize = 200;

/// Token usage tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Usage accumulated since `earlier`.
    pub fn since(&self, earlier: &TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.saturating_sub(earlier.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_sub(earlier.completion_tokens),
            total_tokens: self.total_tokens.saturating_sub(earlier.total_tokens),
        }
    }
}

/// Accumulated token usage with atomic counters
#[derive(Debug, Default)]
struct AtomicTokenUsage {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl AtomicTokenUsage {
    fn add(&self, usage: &TokenUsage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
    }

    fn get(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Raw text completion. Any failure to obtain text is a `CallFailed`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> std::result::Result<String, JudgmentError>;

    /// Tokens consumed so far, for clients that track it.
    fn token_usage(&self) -> TokenUsage {
        TokenUsage::default()
    }
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Chat-completions client
pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
    usage: AtomicTokenUsage,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrialMatchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            usage: AtomicTokenUsage::default(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Chat request; `max_tokens` is capped at the configured ceiling.
    fn request_body(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": JSON_SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "temperature": temperature,
            "max_tokens": max_tokens.min(self.config.max_tokens)
        })
    }

    async fn send(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let request_body = self.request_body(prompt, temperature, max_tokens);

        let api_url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "Sending LLM request");

        let response = self
            .client
            .post(&api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TrialMatchError::Api {
                code: status.as_u16() as i32,
                message: format!("LLM API error: {} - {}", status, preview(&error_text)),
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TrialMatchError::Parse(format!("Failed to parse LLM response: {}", e)))?;

        if let Some(u) = api_response.usage {
            self.usage.add(&TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
        }

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_parse("LLM response has no message content")
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> std::result::Result<String, JudgmentError> {
        self.send(prompt, temperature, max_tokens)
            .await
            .map_err(|e| JudgmentError::CallFailed(e.to_string()))
    }

    fn token_usage(&self) -> TokenUsage {
        self.usage.get()
    }
}

/// Outcome of one structured judgment
#[derive(Debug, Clone, PartialEq)]
pub enum Judgment {
    /// The completion parsed as JSON
    Parsed(Value),
    /// The model answered with something that is not JSON
    Malformed { raw: String, reason: String },
    /// No completion was obtained
    CallFailed { error: String },
}

impl Judgment {
    pub fn into_result(self) -> std::result::Result<Value, JudgmentError> {
        match self {
            Judgment::Parsed(value) => Ok(value),
            Judgment::Malformed { raw, reason } => Err(JudgmentError::Malformed { raw, reason }),
            Judgment::CallFailed { error } => Err(JudgmentError::CallFailed(error)),
        }
    }
}

/// Single-attempt JSON judgment over a completion client
#[derive(Clone)]
pub struct JudgmentCaller {
    client: Arc<dyn CompletionClient>,
    max_tokens: u32,
    timeout: Duration,
}

impl JudgmentCaller {
    pub fn new(client: Arc<dyn CompletionClient>, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            client,
            max_tokens,
            timeout,
        }
    }

    pub fn token_usage(&self) -> TokenUsage {
        self.client.token_usage()
    }

    /// Run one judgment. Never retries.
    pub async fn judge(&self, prompt: &str, temperature: f32) -> Judgment {
        let call = self.client.complete(prompt, temperature, self.max_tokens);
        let text = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                return Judgment::CallFailed { error: e.to_string() };
            }
            Err(_) => {
                return Judgment::CallFailed {
                    error: format!("no completion within {}s", self.timeout.as_secs()),
                };
            }
        };

        let cleaned = strip_json_fences(&text);
        match serde_json::from_str::<Value>(cleaned) {
            Ok(value) => Judgment::Parsed(value),
            Err(e) => {
                debug!(error = %e, content_preview = %preview(&text), "LLM output is not JSON");
                Judgment::Malformed {
                    raw: text,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// [`judge`](Self::judge) in `Result` form.
    pub async fn call_json(&self, prompt: &str, temperature: f32) -> std::result::Result<Value, JudgmentError> {
        self.judge(prompt, temperature).await.into_result()
    }
}

/// Strip one leading ```` ```json ```` and one trailing ```` ``` ````.
pub fn strip_json_fences(content: &str) -> &str {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// First characters of `text`, for logs.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Read a JSON array of strings under `key`. `None` when the key is missing or
/// is not an array; non-string entries are skipped.
pub fn string_array(value: &Value, key: &str) -> Option<Vec<String>> {
    let items = value.as_object()?.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Log a degraded judgment with the fields every stage reports.
pub(crate) fn log_degraded(stage: &str, judgment: &Judgment) {
    match judgment {
        Judgment::Malformed { raw, reason } => warn!(
            stage,
            reason = %reason,
            content_preview = %preview(raw),
            "Malformed LLM output, using fallback"
        ),
        Judgment::CallFailed { error } => warn!(stage, error = %error, "LLM call failed, using fallback"),
        Judgment::Parsed(_) => warn!(stage, "Unexpected LLM output shape, using fallback"),
    }
}
