pub mod client;
pub mod gemini;

pub use client::{LlmClient, RemoteError};
pub use gemini::GeminiClient;
