//! Response builder: every outcome ends up as one [`ResponseEnvelope`].
//!
//! Three paths:
//! - **success**: dispatch finished, possibly with warnings or a parse failure
//! - **error**: the generation service failed; classified, offline reply, remediation hint
//! - **fallback**: the pipeline itself failed; offline reply annotated with the reason

use chrono::Utc;
use dirflow_config::ResponseConfig;
use dirflow_core::command::Command;
use dirflow_core::context::Context;
use dirflow_core::dispatch::DispatchResult;
use dirflow_core::envelope::{EnvelopeMetadata, ExecutionReport, ResponseEnvelope};
use dirflow_core::error::{Error, ErrorType};
use dirflow_core::search::SearchHit;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ResponseFormatError;
use crate::fallback::offline_reply;

const DEFAULT_MESSAGE: &str = "Request processed.";
const ERROR_WARNING: &str = "There is a problem connecting to the generation service. Check your settings.";
const NEW_CHAT_MARKER: &str = "new chat";
const OFFLINE_RECOVERY: &str = "offline_response";

/// Everything a success envelope is built from.
#[derive(Debug, Clone, Default)]
pub struct SuccessData {
    pub message: Option<String>,
    pub commands: Vec<Command>,
    pub provider: String,
    pub model: String,
    pub parse_succeeded: bool,
    pub warning: Option<String>,
    pub error: Option<String>,
    pub agent_key: Option<String>,
    pub agent_name: Option<String>,
    pub raw_completion: Option<String>,
    pub should_suggest_new_chat: bool,
    /// Name of the custom prompt, when one was active.
    pub custom_prompt: Option<String>,
    pub search_results: Option<Vec<SearchHit>>,
    pub executed_command_results: Vec<ExecutionReport>,
    pub fallback_mode: bool,
}

impl From<DispatchResult> for SuccessData {
    fn from(result: DispatchResult) -> Self {
        Self {
            message: result.message,
            commands: result.commands,
            provider: result.provider,
            model: result.model,
            parse_succeeded: result.parse_succeeded,
            warning: result.warning,
            error: result.error,
            agent_key: Some(result.agent),
            agent_name: Some(result.agent_name),
            raw_completion: Some(result.raw_completion),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBuilderStats {
    pub required_fields: Vec<&'static str>,
    pub supported_error_types: Vec<&'static str>,
    pub enhancement_features: Vec<&'static str>,
    pub announce_agent: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ResponseBuilder {
    announce_agent: bool,
}

impl ResponseBuilder {
    pub fn new(config: &ResponseConfig) -> Self {
        Self {
            announce_agent: config.announce_agent,
        }
    }

    pub fn build_success(&self, data: SuccessData) -> ResponseEnvelope {
        let base = data
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
        let message = self.enhance_message(base, &data);

        let payload_size = payload_size(&message, data.raw_completion.as_deref(), &data.commands);
        let metadata = EnvelopeMetadata::Success {
            request_id: Uuid::new_v4(),
            command_count: data.commands.len(),
            has_warning: data.warning.is_some(),
            response_source: data.agent_key.clone().unwrap_or_else(|| "unknown".into()),
            payload_size,
            custom_prompt_used: data.custom_prompt.is_some(),
            fallback_mode: data.fallback_mode,
        };

        let envelope = ResponseEnvelope {
            message,
            commands: data.commands,
            provider: or_unknown(Some(&data.provider)),
            model: or_unknown(Some(&data.model)),
            timestamp: Utc::now(),
            parse_succeeded: data.parse_succeeded,
            warning: data.warning,
            error: data.error,
            error_type: None,
            metadata,
            fallback_mode: data.fallback_mode.then_some(true),
            fallback_reason: None,
            should_suggest_new_chat: Some(data.should_suggest_new_chat),
            agent_used: data.agent_key,
            custom_prompt_used: data.custom_prompt.is_some(),
            search_results: data.search_results,
            executed_command_results: data.executed_command_results,
            raw_completion: data.raw_completion,
        };

        info!(
            provider = %envelope.provider,
            model = %envelope.model,
            agent = envelope.agent_used.as_deref().unwrap_or("unknown"),
            commands = envelope.commands.len(),
            parse_succeeded = envelope.parse_succeeded,
            "Response built"
        );
        if let Some(warning) = &envelope.warning {
            warn!(warning = %warning, "Response carries a warning");
        }
        envelope
    }

    /// Envelope for a failed generation call. Never fails itself.
    pub fn build_error(
        &self,
        error: &Error,
        provider: Option<&str>,
        model: Option<&str>,
        original_message: &str,
        context: Option<&Context>,
    ) -> ResponseEnvelope {
        let error_type = error.error_type();
        let offline = offline_reply(original_message, context);
        let custom_prompt_used = context.is_some_and(|c| c.active_custom_prompt().is_some());

        let mut message = offline.message;
        message.push_str("\n\n");
        message.push_str(&remediation_hint(error_type, error));
        message.push_str("\n\n(Offline reply: the generation service could not be reached)");

        let envelope = ResponseEnvelope {
            message,
            commands: offline.commands,
            provider: or_unknown(provider),
            model: or_unknown(model),
            timestamp: Utc::now(),
            parse_succeeded: false,
            warning: Some(ERROR_WARNING.into()),
            error: Some(error.to_string()),
            error_type: Some(error_type),
            metadata: EnvelopeMetadata::Error {
                request_id: Uuid::new_v4(),
                error_type,
                error_message: error.to_string(),
                context_present: context.is_some(),
                custom_prompt_used,
                recovery: OFFLINE_RECOVERY.into(),
            },
            fallback_mode: Some(true),
            fallback_reason: None,
            should_suggest_new_chat: Some(false),
            agent_used: None,
            custom_prompt_used,
            search_results: None,
            executed_command_results: Vec::new(),
            raw_completion: None,
        };

        warn!(
            provider = %envelope.provider,
            error_type = %error_type,
            error = %error,
            "Error response built"
        );
        envelope
    }

    /// Degraded but successful reply when the pipeline itself gave up.
    pub fn build_fallback(
        &self,
        original_message: &str,
        context: Option<&Context>,
        reason: &str,
    ) -> ResponseEnvelope {
        let offline = offline_reply(original_message, context);
        let custom_prompt_used = context.is_some_and(|c| c.active_custom_prompt().is_some());

        warn!(reason, "Fallback response built");
        ResponseEnvelope {
            message: format!("{}\n\n(Fallback reply: {reason})", offline.message),
            commands: offline.commands,
            provider: "fallback".into(),
            model: "offline".into(),
            timestamp: Utc::now(),
            parse_succeeded: true,
            warning: Some(format!("Fallback reply used: {reason}")),
            error: None,
            error_type: None,
            metadata: EnvelopeMetadata::Fallback {
                request_id: Uuid::new_v4(),
                fallback_reason: reason.into(),
                context_present: context.is_some(),
                custom_prompt_used,
                recovery: OFFLINE_RECOVERY.into(),
            },
            fallback_mode: Some(true),
            fallback_reason: Some(reason.into()),
            should_suggest_new_chat: Some(false),
            agent_used: None,
            custom_prompt_used,
            search_results: None,
            executed_command_results: Vec::new(),
            raw_completion: None,
        }
    }

    /// Check that the fields every caller reads are populated.
    pub fn validate_format(&self, envelope: &ResponseEnvelope) -> Result<(), ResponseFormatError> {
        let missing: Vec<&'static str> = [
            ("message", envelope.message.trim().is_empty()),
            ("provider", envelope.provider.trim().is_empty()),
            ("model", envelope.model.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ResponseFormatError { missing })
        }
    }

    pub fn stats(&self) -> ResponseBuilderStats {
        ResponseBuilderStats {
            required_fields: vec!["message", "commands", "provider", "model", "timestamp"],
            supported_error_types: ErrorType::ALL.iter().map(ErrorType::as_str).collect(),
            enhancement_features: vec!["newChatSuggestion", "customPromptInfo", "agentInfo"],
            announce_agent: self.announce_agent,
        }
    }

    /// Append soft notices. Commands are never touched.
    fn enhance_message(&self, mut message: String, data: &SuccessData) -> String {
        if data.should_suggest_new_chat && !message.to_lowercase().contains(NEW_CHAT_MARKER) {
            message.push_str(
                "\n\nThis conversation is getting long. If you are moving on to a new topic, \
                 consider starting a new chat.",
            );
        }

        if let Some(name) = &data.custom_prompt {
            message.push_str(&format!("\n\nAnswered using the custom prompt \"{name}\"."));
        }

        if self.announce_agent
            && let Some(agent) = &data.agent_name
        {
            message.push_str(&format!("\n\nHandled by {agent}."));
        }

        message
    }
}

fn remediation_hint(error_type: ErrorType, error: &Error) -> String {
    match error_type {
        ErrorType::ApiKeyMissing => {
            "No API key is configured for this provider. Check your environment settings.".into()
        }
        ErrorType::RateLimit => "The provider's rate limit was reached. Wait a moment and try again.".into(),
        ErrorType::NetworkError => "A network error occurred. Check your connection.".into(),
        ErrorType::ServerError => "The provider reported a server error. Wait a moment and try again.".into(),
        ErrorType::Unknown => {
            let text = error.to_string();
            if text.is_empty() {
                "An unknown error occurred.".into()
            } else {
                text
            }
        }
    }
}

fn or_unknown(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn payload_size(message: &str, raw: Option<&str>, commands: &[Command]) -> usize {
    let commands = if commands.is_empty() {
        0
    } else {
        serde_json::to_string(commands).map_or(0, |s| s.chars().count())
    };
    message.chars().count() + raw.map_or(0, |r| r.chars().count()) + commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirflow_core::context::CustomPrompt;
    use dirflow_core::error::ProviderError;

    fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    fn data() -> SuccessData {
        SuccessData {
            message: Some("Created t.txt".into()),
            commands: vec![Command::CreateFile {
                path: "t.txt".into(),
                content: None,
            }],
            provider: "gemini".into(),
            model: "gemini-2.5-flash".into(),
            parse_succeeded: true,
            agent_key: Some("file_expert".into()),
            agent_name: Some("File Operations Expert".into()),
            ..SuccessData::default()
        }
    }

    #[test]
    fn success_keeps_commands_and_counts_them() {
        let env = builder().build_success(data());
        assert_eq!(env.message, "Created t.txt");
        assert_eq!(env.commands.len(), 1);
        assert!(env.parse_succeeded);
        assert!(!env.is_fallback());
        match env.metadata {
            EnvelopeMetadata::Success {
                command_count,
                has_warning,
                response_source,
                payload_size,
                ..
            } => {
                assert_eq!(command_count, 1);
                assert!(!has_warning);
                assert_eq!(response_source, "file_expert");
                assert!(payload_size > "Created t.txt".len());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn success_without_message_gets_default() {
        let env = builder().build_success(SuccessData {
            message: None,
            ..data()
        });
        assert_eq!(env.message, DEFAULT_MESSAGE);
    }

    #[test]
    fn notices_are_appended() {
        let builder = ResponseBuilder::new(&ResponseConfig { announce_agent: true });
        let env = builder.build_success(SuccessData {
            should_suggest_new_chat: true,
            custom_prompt: Some("Terse".into()),
            ..data()
        });
        assert!(env.message.starts_with("Created t.txt\n\n"));
        assert!(env.message.contains("starting a new chat"));
        assert!(env.message.contains("custom prompt \"Terse\""));
        assert!(env.message.ends_with("Handled by File Operations Expert."));
        assert_eq!(env.commands.len(), 1);
        assert!(env.custom_prompt_used);
    }

    #[test]
    fn new_chat_notice_not_repeated() {
        let env = builder().build_success(SuccessData {
            message: Some("You may want a New Chat for this.".into()),
            should_suggest_new_chat: true,
            ..data()
        });
        assert_eq!(env.message, "You may want a New Chat for this.");
    }

    #[test]
    fn agent_notice_off_by_default() {
        let env = builder().build_success(data());
        assert!(!env.message.contains("Handled by"));
    }

    #[test]
    fn error_envelope_for_missing_key() {
        let error = Error::Provider(ProviderError::MissingApiKey {
            provider: "claude".into(),
            env_var: "ANTHROPIC_API_KEY".into(),
        });
        let env = builder().build_error(&error, Some("claude"), None, "hello", None);

        assert_eq!(env.error_type, Some(ErrorType::ApiKeyMissing));
        assert!(!env.parse_succeeded);
        assert!(env.is_fallback());
        assert_eq!(env.model, "unknown");
        assert!(env.message.contains("No API key is configured"));
        assert!(env.error.unwrap().contains("ANTHROPIC_API_KEY"));
        assert!(matches!(env.metadata, EnvelopeMetadata::Error { context_present: false, .. }));
    }

    #[test]
    fn error_classified_from_text() {
        let error = Error::Internal("upstream returned 429 Too Many Requests".into());
        let env = builder().build_error(&error, Some("openai"), Some("gpt-4"), "list", None);
        assert_eq!(env.error_type, Some(ErrorType::RateLimit));
        assert!(env.message.starts_with("Current directory: /workspace"));
    }

    #[test]
    fn unknown_error_hint_echoes_error() {
        let error = Error::Internal("something odd".into());
        let env = builder().build_error(&error, None, None, "good morning", None);
        assert_eq!(env.error_type, Some(ErrorType::Unknown));
        assert!(env.message.contains("Internal error: something odd"));
        assert_eq!(env.provider, "unknown");
    }

    #[test]
    fn error_notes_custom_prompt() {
        let ctx = Context {
            custom_prompt: Some(CustomPrompt {
                enabled: true,
                ..CustomPrompt::default()
            }),
            ..Context::default()
        };
        let error = Error::Internal("network down".into());
        let env = builder().build_error(&error, None, None, "x", Some(&ctx));
        assert!(env.custom_prompt_used);
        assert_eq!(env.error_type, Some(ErrorType::NetworkError));
    }

    #[test]
    fn fallback_envelope() {
        let env = builder().build_fallback("help", None, "dispatcher returned nothing");
        assert!(env.parse_succeeded);
        assert!(env.is_fallback());
        assert_eq!(env.fallback_reason.as_deref(), Some("dispatcher returned nothing"));
        assert!(env.message.ends_with("(Fallback reply: dispatcher returned nothing)"));
        assert_eq!(env.provider, "fallback");
        assert!(builder().validate_format(&env).is_ok());
    }

    #[test]
    fn validate_format_reports_missing_fields() {
        let mut env = builder().build_success(data());
        env.provider.clear();
        env.model = "  ".into();
        let err = builder().validate_format(&env).unwrap_err();
        assert_eq!(err.missing, vec!["provider", "model"]);
    }

    #[test]
    fn blank_route_is_reported_as_unknown() {
        let env = builder().build_success(SuccessData {
            provider: "mistral".into(),
            model: String::new(),
            ..data()
        });
        assert_eq!(env.provider, "mistral");
        assert_eq!(env.model, "unknown");
        assert!(builder().validate_format(&env).is_ok());
    }

    #[test]
    fn stats_list_error_types() {
        let stats = builder().stats();
        assert_eq!(stats.supported_error_types.len(), 5);
        assert!(stats.supported_error_types.contains(&"api_key_missing"));
    }

    #[test]
    fn from_dispatch_result() {
        let result = DispatchResult {
            agent: "general_assistant".into(),
            agent_name: "General Assistant".into(),
            commands: vec![],
            raw_completion: "hi".into(),
            parse_succeeded: true,
            warning: None,
            error: None,
            message: Some("hi".into()),
            provider: "local".into(),
            model: "phi3:latest".into(),
            provider_error: None,
        };
        let env = builder().build_success(result.into());
        assert_eq!(env.agent_used.as_deref(), Some("general_assistant"));
        assert_eq!(env.raw_completion.as_deref(), Some("hi"));
    }
}
