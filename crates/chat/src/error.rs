//! Error types for the chat layer.

use thiserror::Error;

/// An envelope that is missing fields every caller relies on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid response format: missing fields {}", .missing.join(", "))]
pub struct ResponseFormatError {
    pub missing: Vec<&'static str>,
}

/// Unexpected failure anywhere in the request pipeline.
///
/// Never reaches the caller as an `Err`; the orchestrator turns it into a
/// fallback envelope.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    InvalidEnvelope(#[from] ResponseFormatError),
}
