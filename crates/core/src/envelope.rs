//! The canonical response envelope.
//!
//! Every request ends in exactly one [`ResponseEnvelope`], whether it
//! succeeded, partially failed, or fell back to the offline responder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::{ActionName, Command};
use crate::error::ErrorType;
use crate::search::SearchHit;

/// Per-path metadata. The `kind` tag tells callers which path produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvelopeMetadata {
    #[serde(rename_all = "camelCase")]
    Success {
        request_id: Uuid,
        command_count: usize,
        has_warning: bool,
        response_source: String,
        /// Rough payload size: message, raw completion and commands.
        payload_size: usize,
        custom_prompt_used: bool,
        fallback_mode: bool,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        request_id: Uuid,
        error_type: ErrorType,
        error_message: String,
        context_present: bool,
        custom_prompt_used: bool,
        recovery: String,
    },
    #[serde(rename_all = "camelCase")]
    Fallback {
        request_id: Uuid,
        fallback_reason: String,
        context_present: bool,
        custom_prompt_used: bool,
        recovery: String,
    },
}

impl EnvelopeMetadata {
    pub fn request_id(&self) -> Uuid {
        match self {
            EnvelopeMetadata::Success { request_id, .. }
            | EnvelopeMetadata::Error { request_id, .. }
            | EnvelopeMetadata::Fallback { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Executed,
    Failed,
    /// Left for the caller to execute.
    Skipped,
}

/// What happened to one validated command on the server side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub action: ActionName,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub result_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub message: String,

    /// Commands for the caller to execute.
    pub commands: Vec<Command>,

    pub provider: String,

    pub model: String,

    pub timestamp: DateTime<Utc>,

    pub parse_succeeded: bool,

    pub warning: Option<String>,

    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,

    pub metadata: EnvelopeMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_mode: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_suggest_new_chat: Option<bool>,

    /// Key of the agent that produced the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_used: Option<String>,

    #[serde(default)]
    pub custom_prompt_used: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchHit>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executed_command_results: Vec<ExecutionReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_completion: Option<String>,
}

impl ResponseEnvelope {
    pub fn is_fallback(&self) -> bool {
        self.fallback_mode.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_tagged_by_kind() {
        let meta = EnvelopeMetadata::Fallback {
            request_id: Uuid::new_v4(),
            fallback_reason: "dispatcher returned nothing".into(),
            context_present: false,
            custom_prompt_used: false,
            recovery: "offline_response".into(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["kind"], "fallback");
        assert_eq!(json["fallbackReason"], "dispatcher returned nothing");
    }

    #[test]
    fn execution_report_serializes_action_name() {
        let report = ExecutionReport {
            action: ActionName::WebSearch,
            status: ExecutionStatus::Executed,
            message: None,
            result_count: 2,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["action"], "web_search");
        assert_eq!(json["status"], "executed");
        assert_eq!(json["resultCount"], 2);
    }
}
