//! Response generation
//!
//! Narrow request/response contract with the language-generation service:
//! the conversation branch hands over the history snapshot and receives
//! utterances to speak. Provider internals stay behind the trait.

pub mod gemini;

use async_trait::async_trait;

use crate::core::session::Message;

pub use gemini::GeminiGenerator;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected generator response: {0}")]
    InvalidResponse(String),
    #[error("Generator returned no candidates")]
    Empty,
}

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate the next agent utterances from the conversation history.
    async fn generate(&self, history: &[Message]) -> Result<Vec<String>, GeneratorError>;

    fn provider_info(&self) -> &'static str;
}
