//! Error types shared across the agent server.

use thiserror::Error;

use crate::core::classifier::ClassifierError;
use crate::core::generator::GeneratorError;

/// Top-level agent error.
///
/// Content-loading problems (missing flow prompt, malformed catalog) are
/// deliberately not represented here: those degrade to defaults at load
/// time instead of failing the server.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
