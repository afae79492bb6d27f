//! Conversation context: supplied by the caller on every request.
//!
//! The pipeline never persists a [`Context`]; it is normalized, used for one
//! request, and handed back inside the response if the caller wants it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default working directory shown to the model when the caller sends none.
pub const DEFAULT_CURRENT_PATH: &str = "/workspace";

/// One user-message/assistant-reply pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,

    #[serde(default)]
    pub ai: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Exchange {
    pub fn new(user: impl Into<String>, ai: Option<String>) -> Self {
        Self {
            user: user.into(),
            ai,
            timestamp: None,
        }
    }

    /// The assistant text, or `""` when there was no reply.
    pub fn ai_text(&self) -> &str {
        self.ai.as_deref().unwrap_or("")
    }

    /// Character count of the user and assistant text together.
    pub fn char_len(&self) -> usize {
        self.user.chars().count() + self.ai_text().chars().count()
    }
}

/// Total character count across a history slice.
pub fn history_chars(history: &[Exchange]) -> usize {
    history.iter().map(Exchange::char_len).sum()
}

/// A user-defined system prompt that replaces or augments an agent's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPrompt {
    pub enabled: bool,
    pub name: String,
    pub content: String,
    pub description: String,
}

impl Default for CustomPrompt {
    fn default() -> Self {
        Self {
            enabled: false,
            name: "Unknown".into(),
            content: String::new(),
            description: String::new(),
        }
    }
}

/// Derived facts about a prepared context, for logs and envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    pub timestamp: DateTime<Utc>,
    pub history_count: usize,
    pub file_count: usize,
    pub has_custom_prompt: bool,
    pub has_open_file: bool,
    /// Approximate size of the context in characters.
    pub context_size: usize,
}

/// The request context, after normalization by the context manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub current_path: String,

    #[serde(default)]
    pub file_list: Vec<String>,

    #[serde(default)]
    pub current_file: Option<String>,

    #[serde(default)]
    pub open_file_info: Option<String>,

    #[serde(default)]
    pub conversation_history: Vec<Exchange>,

    #[serde(default)]
    pub custom_prompt: Option<CustomPrompt>,

    /// Caller's provider preference when none is given explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// A cheaper model to use for agent selection only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_selection_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ContextMetadata>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            current_path: DEFAULT_CURRENT_PATH.into(),
            file_list: Vec::new(),
            current_file: None,
            open_file_info: None,
            conversation_history: Vec::new(),
            custom_prompt: None,
            provider: None,
            model: None,
            agent_selection_model: None,
            metadata: None,
        }
    }
}

impl Context {
    /// The custom prompt, only when the caller has switched it on.
    pub fn active_custom_prompt(&self) -> Option<&CustomPrompt> {
        self.custom_prompt.as_ref().filter(|p| p.enabled)
    }

    pub fn history_chars(&self) -> usize {
        history_chars(&self.conversation_history)
    }

    /// The most recent user message in the history, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.conversation_history.last().map(|e| e.user.as_str())
    }
}
