//! Gemini `generateContent` provider.
//!
//! Calls `POST {endpoint}` with the API key in the `x-goog-api-key`
//! header. A single prompt goes out as one user content part; the
//! first text part of the first candidate comes back.
//!
//! - Generation parameters come from `LlmConfig` and are identical
//!   for every call.
//! - Errors carry an `{"error": {"message": ...}}` envelope.
//! - Token usage is reported in `usageMetadata` (may be absent).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::client::{LlmClient, RemoteError};
use crate::config::LlmConfig;

/// Used when a failed response has no readable error envelope.
const GENERIC_API_FAILURE: &str = "Failed to fetch response from the generation API";

// ── Gemini API request types ─────────────────────────────

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Fixed sampling parameters sent with every request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

// ── Gemini API response types ────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    /// Some proxies flatten the answer into a top-level field.
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ── GeminiClient ─────────────────────────────────────────

/// Client for the Gemini `generateContent` API.
pub struct GeminiClient {
    client: Client,
    config: LlmConfig,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn build_request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, RemoteError> {
        let request = self.build_request(prompt);

        debug!(
            "Calling generation API ({}) with a {}-char prompt",
            self.config.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let resp: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;

        if let Some(usage) = &resp.usage_metadata {
            info!(
                "LLM response: {} in / {} out tokens",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(extract_text(resp))
    }

    fn description(&self) -> String {
        format!("gemini ({})", self.config.model)
    }
}

/// Pulls `candidates[0].content.parts[0].text`, falling back to a
/// top-level `text` field. Empty strings count as absent.
fn extract_text(resp: GenerateResponse) -> Option<String> {
    let candidate_text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text);

    candidate_text
        .filter(|t| !t.is_empty())
        .or(resp.text.filter(|t| !t.is_empty()))
}

/// Reads `error.message` from a failure body, or a generic description.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .and_then(|err| err.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| GENERIC_API_FAILURE.to_string())
}
