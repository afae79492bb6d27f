//! GenerationClient trait: the abstraction over text-generation services.
//!
//! The pipeline only needs "prompt in, completion text out". Vendor payload
//! shapes, signing and retries belong to the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The full prompt text
    pub prompt: String,

    /// Provider key (e.g. "claude", "gemini")
    pub provider: String,

    /// Model identifier for that provider
    pub model: String,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Extra hints for the transport (serialized context, etc.)
    #[serde(default)]
    pub hints: serde_json::Map<String, serde_json::Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            provider: provider.into(),
            model: model.into(),
            max_tokens: None,
            hints: serde_json::Map::new(),
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_hint(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.hints.insert(key.into(), value);
        self
    }
}

/// The external text-generation collaborator.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// A human-readable name for this client.
    fn name(&self) -> &str;

    /// Return the full raw completion text for the request.
    async fn complete(&self, request: GenerationRequest) -> Result<String, ProviderError>;
}
