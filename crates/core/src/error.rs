//! Error types for the dirflow domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Collaborator failures
//! are described by [`ProviderError`]; [`ErrorType`] is the coarse taxonomy
//! surfaced to callers in a response envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for dirflow operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Collaborator errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// A failure reported by an external collaborator (generation or search).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("{env_var} is not configured for provider {provider}")]
    MissingApiKey { provider: String, env_var: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed provider payload: {0}")]
    InvalidResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Free-form failure text from a collaborator that has no structured code.
    #[error("{0}")]
    Other(String),
}

/// Coarse error classification returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    ApiKeyMissing,
    RateLimit,
    NetworkError,
    ServerError,
    Unknown,
}

impl ErrorType {
    pub const ALL: [ErrorType; 5] = [
        ErrorType::ApiKeyMissing,
        ErrorType::RateLimit,
        ErrorType::NetworkError,
        ErrorType::ServerError,
        ErrorType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ApiKeyMissing => "api_key_missing",
            ErrorType::RateLimit => "rate_limit",
            ErrorType::NetworkError => "network_error",
            ErrorType::ServerError => "server_error",
            ErrorType::Unknown => "unknown",
        }
    }

    /// Best-effort classification of free-form error text.
    ///
    /// Categories are checked in a fixed order and the first match wins.
    pub fn from_text(text: &str) -> Self {
        let text = text.to_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

        if any(&["api_key", "api key", "authentication"]) {
            ErrorType::ApiKeyMissing
        } else if any(&["rate limit", "429"]) {
            ErrorType::RateLimit
        } else if any(&["network", "connection", "fetch"]) {
            ErrorType::NetworkError
        } else if any(&["500", "502", "503"]) {
            ErrorType::ServerError
        } else {
            ErrorType::Unknown
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderError {
    /// Classify this failure, preferring structured data over message text.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ProviderError::MissingApiKey { .. } | ProviderError::AuthenticationFailed(_) => {
                ErrorType::ApiKeyMissing
            }
            ProviderError::RateLimited { .. } => ErrorType::RateLimit,
            ProviderError::ApiError { status_code, .. } => match status_code {
                401 | 403 => ErrorType::ApiKeyMissing,
                429 => ErrorType::RateLimit,
                500..=599 => ErrorType::ServerError,
                _ => ErrorType::from_text(&self.to_string()),
            },
            ProviderError::Network(_) | ProviderError::Timeout(_) => ErrorType::NetworkError,
            _ => ErrorType::from_text(&self.to_string()),
        }
    }
}

impl Error {
    /// Classify any pipeline error into the caller-facing taxonomy.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Error::Provider(e) => e.error_type(),
            other => ErrorType::from_text(&other.to_string()),
        }
    }
}
