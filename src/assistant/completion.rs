//! Completion client: one question in, one displayable answer out.
//!
//! Wraps the user's question in the teaching prompt, makes exactly one
//! call to the `LlmClient`, formats the answer, and turns every kind of
//! failure into text that can be shown to the user.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::format::format;
use crate::config::{AssistantConfig, FallbackPolicy};
use crate::llm::{LlmClient, RemoteError};

/// Shown when the API answered but produced no text.
pub const CLARIFICATION_PLACEHOLDER: &str =
    "I'm not sure how to respond to that. Could you rephrase your question?";

/// Used when nothing better is available for an undecodable response.
pub const SERVICE_UNAVAILABLE: &str = "I'm having trouble connecting to the AI service. \
     Please check your internet connection and try again later.";

/// Prompt sent by [`CompletionClient::probe`].
pub const PROBE_PROMPT: &str = "Hello, are you working?";

/// Canned answers keyed by the lowercased, trimmed question.
const CANNED_ANSWERS: &[(&str, &str)] = &[
    (
        "hello",
        "Hello! I'm your quantum computing assistant. How can I help you today?",
    ),
    ("hi", "Hi there! Ready to explore the quantum realm?"),
    (
        "what is quantum computing",
        "Quantum computing is a type of computation that harnesses quantum phenomena like \
         superposition and entanglement to perform calculations. Unlike classical computers \
         that use bits (0s and 1s), quantum computers use quantum bits or qubits that can \
         exist in multiple states simultaneously.",
    ),
];

/// Coarse classification of a failed completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidCredential,
    QuotaExceeded,
    NetworkUnavailable,
    Unknown,
}

impl ErrorKind {
    /// Classifies a raw error description. First match wins.
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("api key") || lower.contains("api_key_invalid") {
            ErrorKind::InvalidCredential
        } else if lower.contains("quota") {
            ErrorKind::QuotaExceeded
        } else if lower.contains("network") {
            ErrorKind::NetworkUnavailable
        } else {
            ErrorKind::Unknown
        }
    }

    /// What the user can do about it.
    pub fn guidance(&self) -> &'static str {
        match self {
            ErrorKind::InvalidCredential => {
                "The API key appears to be invalid or doesn't have the correct permissions. \
                 Please check the api_key in your configuration."
            }
            ErrorKind::QuotaExceeded => {
                "The API quota might be exceeded. Please check the quota settings of your API project."
            }
            ErrorKind::NetworkUnavailable => {
                "There seems to be a network issue. Please check your internet connection."
            }
            ErrorKind::Unknown => {
                "Please try again later or contact support if the issue persists."
            }
        }
    }
}

/// A failed completion. `message` is ready to show to the user.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct CompletionError {
    pub kind: ErrorKind,
    pub message: String,
}

pub type CompletionResult = Result<String, CompletionError>;

/// Looks up a canned answer for `question`.
pub fn canned_answer(question: &str) -> Option<&'static str> {
    let key = question.trim().to_lowercase();
    CANNED_ANSWERS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, answer)| *answer)
}

/// Turns a classified remote failure into the user-facing diagnostic.
fn diagnose(err: &RemoteError) -> CompletionError {
    let raw = err.to_string();
    let kind = ErrorKind::classify(&raw);
    CompletionError {
        kind,
        message: format!(
            "I encountered an error: {}. {}",
            raw.trim_end_matches('.'),
            kind.guidance()
        ),
    }
}

pub struct CompletionClient {
    llm: Box<dyn LlmClient>,
    subject: String,
    fallback_policy: FallbackPolicy,
}

impl CompletionClient {
    pub fn new(llm: Box<dyn LlmClient>, config: &AssistantConfig) -> Self {
        Self {
            llm,
            subject: config.subject.clone(),
            fallback_policy: config.fallback_policy,
        }
    }

    pub fn description(&self) -> String {
        self.llm.description()
    }

    /// Wraps the question in the teaching instructions.
    ///
    /// The word limit is only a hint to the model.
    fn build_prompt(&self, question: &str) -> String {
        format!(
            "You are a helpful {subject} teaching assistant.\n\
             Answer the following question in a clear and educational way.\n\
             If the response is long, use markdown formatting with headers, lists, \
             and paragraphs for better readability.\n\
             Keep the response under 2000 words.\n\
             \n\
             Question: {question}",
            subject = self.subject,
        )
    }

    /// Asks one question. Never retries.
    pub async fn complete(&self, user_message: &str) -> CompletionResult {
        if user_message.trim().is_empty() {
            return Err(CompletionError {
                kind: ErrorKind::Unknown,
                message: "Please enter a question.".to_string(),
            });
        }

        let prompt = self.build_prompt(user_message);
        debug!("Sending completion request via {}", self.llm.description());

        match self.llm.generate(&prompt).await {
            Ok(Some(text)) => Ok(format(&text)),
            Ok(None) => {
                warn!("Completion response carried no text, asking for clarification");
                Ok(CLARIFICATION_PLACEHOLDER.to_string())
            }
            Err(RemoteError::Decode(reason)) => {
                warn!("Could not decode completion response: {reason}");
                Err(CompletionError {
                    kind: ErrorKind::Unknown,
                    message: canned_answer(user_message)
                        .unwrap_or(SERVICE_UNAVAILABLE)
                        .to_string(),
                })
            }
            Err(err) => {
                if let RemoteError::Api { status, .. } = &err {
                    debug!("Generation API answered HTTP {status}");
                }
                let mut failure = diagnose(&err);
                warn!("Completion failed ({:?}): {err}", failure.kind);

                if self.fallback_policy == FallbackPolicy::CannedFirst {
                    if let Some(answer) = canned_answer(user_message) {
                        debug!("Replacing diagnostic with canned answer");
                        failure.message = answer.to_string();
                    }
                }
                Err(failure)
            }
        }
    }

    /// Sends a short fixed prompt to check the key and endpoint.
    pub async fn probe(&self) -> CompletionResult {
        match self.llm.generate(PROBE_PROMPT).await {
            Ok(text) => {
                info!("Generation API probe succeeded");
                Ok(text.unwrap_or_default())
            }
            Err(err) => {
                let failure = diagnose(&err);
                warn!("Generation API probe failed ({:?}): {err}", failure.kind);
                Err(failure)
            }
        }
    }
}
