//! OpenAI-compatible chat completion client
//!
//! Drafts the reasoning chain and answer for an annotation. One request per call,
//! no retries; [`LlmClient::generate`] never fails and instead returns a placeholder
//! answer describing what went wrong.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use vmark_common::config::ApiConfig;

const USER_AGENT: &str = concat!("vmark-an/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 120;
const THINKING_FENCE: &str = "```thinking";
const FENCE: &str = "```";

/// LLM client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Response contained no choices")]
    EmptyResponse,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Drafted reasoning and answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LlmAnswer {
    pub reasoning: String,
    pub answer: String,
    /// True when this is a placeholder standing in for a failed call
    pub failed: bool,
}

impl LlmAnswer {
    fn placeholder(reasoning: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            answer: answer.into(),
            failed: true,
        }
    }
}

pub struct LlmClient {
    http_client: reqwest::Client,
    config: ApiConfig,
}

impl LlmClient {
    pub fn new(config: ApiConfig) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// `{api_base}/chat/completions`
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    /// Send one chat completion request for the composed description
    pub async fn complete(
        &self,
        description: &str,
        final_diagnosis: &str,
    ) -> Result<LlmAnswer, LlmError> {
        let keys: Vec<&String> = self
            .config
            .api_keys
            .iter()
            .filter(|k| !k.trim().is_empty())
            .collect();
        let api_key = keys
            .choose(&mut rand::thread_rng())
            .ok_or(LlmError::MissingApiKey)?;

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.config.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: self.config.user_prompt(description, final_diagnosis),
                },
            ],
        };

        tracing::debug!(
            endpoint = %self.endpoint(),
            model = %self.config.model,
            "Requesting chat completion"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(api_key.trim())
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let message = chat
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?
            .message;

        let (reasoning, answer) = extract_answer(message);

        tracing::info!(
            reasoning_chars = reasoning.chars().count(),
            answer_chars = answer.chars().count(),
            "Chat completion received"
        );

        Ok(LlmAnswer {
            reasoning,
            answer,
            failed: false,
        })
    }

    /// Like [`complete`](Self::complete), but failures become a placeholder answer
    pub async fn generate(&self, description: &str, final_diagnosis: &str) -> LlmAnswer {
        match self.complete(description, final_diagnosis).await {
            Ok(answer) => answer,
            Err(LlmError::MissingApiKey) => {
                tracing::warn!("LLM call skipped: no API key configured");
                LlmAnswer::placeholder(
                    "No API key configured",
                    "Could not obtain an analysis: add an API key in the API settings.",
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "LLM call failed");
                LlmAnswer::placeholder(
                    format!("API call failed: {}", e),
                    "Could not obtain an analysis. Check the API settings and try again.",
                )
            }
        }
    }
}

/// Reasoning and answer from a response message
///
/// A non-empty `reasoning_content` wins; otherwise the content is checked for a
/// fenced thinking block.
pub fn extract_answer(message: ChatResponseMessage) -> (String, String) {
    let content = message.content.unwrap_or_default();
    match message.reasoning_content {
        Some(reasoning) if !reasoning.trim().is_empty() => (reasoning, content),
        _ => split_thinking_fence(&content),
    }
}

/// Split a body that opens a fenced `thinking` block into reasoning and answer
///
/// The reasoning runs to the next fence and the answer is everything after it.
/// Without a terminated thinking block the whole body is the answer.
pub fn split_thinking_fence(body: &str) -> (String, String) {
    let Some(marker) = body.find(THINKING_FENCE) else {
        return (String::new(), body.to_string());
    };
    let start = marker + THINKING_FENCE.len();
    let Some(len) = body[start..].find(FENCE) else {
        return (String::new(), body.to_string());
    };
    let end = start + len;
    (
        body[start..end].trim().to_string(),
        body[end + FENCE.len()..].trim().to_string(),
    )
}
