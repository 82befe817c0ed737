//! `LlmClient` trait: abstraction over the text-generation backend.
//!
//! Providers translate a single prompt into their own wire format and
//! hand back the first generated text. Tests plug in a scripted client.

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single remote generation call.
///
/// The `Display` text is the raw error description that gets
/// classified into an `ErrorKind` by the completion layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RemoteError {
    /// The API answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },
    /// The request never got an answer (connect, TLS, timeout).
    #[error("network error: {0}")]
    Transport(String),
    /// The API answered successfully but the body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Abstraction over text-generation backends.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one prompt and returns the first generated text.
    ///
    /// `Ok(None)` means the response was well-formed but carried no
    /// generated text.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, RemoteError>;

    /// Human-readable description of the backend and model.
    fn description(&self) -> String;
}
