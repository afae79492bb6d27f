//! Chat orchestrator: one request from raw input to envelope.
//!
//! ```text
//! raw context ─▶ ContextManager ─▶ AgentDispatcher ─▶ web_search execution ─▶ ResponseBuilder
//! ```
//!
//! Validated `web_search` commands run here through the [`SearchClient`];
//! every other command goes back to the caller to execute.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dirflow_agent::{
    AgentDescriptor, AgentDispatcher, ContextManager, ContextManagerStatus, DispatcherStatus,
};
use dirflow_config::AppConfig;
use dirflow_core::command::Command;
use dirflow_core::context::Context;
use dirflow_core::dispatch::DispatchResult;
use dirflow_core::envelope::{ExecutionReport, ExecutionStatus, ResponseEnvelope};
use dirflow_core::error::Error;
use dirflow_core::generation::GenerationClient;
use dirflow_core::search::{self, SearchClient, SearchHit};
use dirflow_security::ValidatorStats;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::OrchestrationError;
use crate::response::{ResponseBuilder, ResponseBuilderStats, SuccessData};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub dispatcher: DispatcherStatus,
    pub context_manager: ContextManagerStatus,
    pub validator: ValidatorStats,
    pub response_builder: ResponseBuilderStats,
    pub search_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of running the server-side commands of one dispatch.
#[derive(Debug, Default)]
struct Execution {
    caller_commands: Vec<Command>,
    reports: Vec<ExecutionReport>,
    search_results: Option<Vec<SearchHit>>,
    summaries: Vec<String>,
    warnings: Vec<String>,
}

pub struct ChatOrchestrator {
    dispatcher: Arc<AgentDispatcher>,
    contexts: ContextManager,
    responses: ResponseBuilder,
    search: Option<Arc<dyn SearchClient>>,
}

impl ChatOrchestrator {
    pub fn new(
        dispatcher: Arc<AgentDispatcher>,
        contexts: ContextManager,
        responses: ResponseBuilder,
    ) -> Self {
        Self {
            dispatcher,
            contexts,
            responses,
            search: None,
        }
    }

    /// Wire every component from `config` around one generation client.
    pub fn from_config(client: Arc<dyn GenerationClient>, config: Arc<AppConfig>) -> Self {
        let contexts = ContextManager::new(&config.context);
        let responses = ResponseBuilder::new(&config.response);
        let dispatcher = Arc::new(AgentDispatcher::from_config(client, config));
        Self::new(dispatcher, contexts, responses)
    }

    /// Execute validated web searches through `client`.
    pub fn with_search(mut self, client: Arc<dyn SearchClient>) -> Self {
        self.search = Some(client);
        self
    }

    pub fn context_manager(&self) -> &ContextManager {
        &self.contexts
    }

    pub fn response_builder(&self) -> &ResponseBuilder {
        &self.responses
    }

    /// Process one chat request. Always returns a well-formed envelope.
    pub async fn process_chat(
        &self,
        message: &str,
        provider: Option<&str>,
        model: Option<&str>,
        raw_context: &Value,
    ) -> ResponseEnvelope {
        let context = self.contexts.prepare_context(raw_context);
        match self.run(message, provider, model, &context).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Request failed, using offline fallback");
                self.responses
                    .build_fallback(message, Some(&context), &e.to_string())
            }
        }
    }

    async fn run(
        &self,
        message: &str,
        provider: Option<&str>,
        model: Option<&str>,
        context: &Context,
    ) -> Result<ResponseEnvelope, OrchestrationError> {
        if message.trim().is_empty() {
            return Err(OrchestrationError::InvalidInput(
                "message must not be empty".into(),
            ));
        }

        let result = self
            .dispatcher
            .dispatch(message, context, provider, model)
            .await;

        if result.is_error() {
            let error = dispatch_error(&result);
            return Ok(self.responses.build_error(
                &error,
                Some(&result.provider),
                Some(&result.model),
                message,
                Some(context),
            ));
        }

        let should_suggest_new_chat = self.contexts.should_suggest_new_chat(context);
        let custom_prompt = context.active_custom_prompt().map(|p| p.name.clone());

        let mut data = SuccessData::from(result);
        let execution = self.execute(std::mem::take(&mut data.commands)).await;

        if !execution.summaries.is_empty() {
            let mut text = data.message.take().unwrap_or_default();
            for summary in &execution.summaries {
                if !text.is_empty() {
                    text.push_str("\n\n");
                }
                text.push_str(summary);
            }
            data.message = Some(text);
        }
        for warning in execution.warnings {
            data.warning = Some(match data.warning.take() {
                Some(existing) => format!("{existing}; {warning}"),
                None => warning,
            });
        }

        data.commands = execution.caller_commands;
        data.executed_command_results = execution.reports;
        data.search_results = execution.search_results;
        data.should_suggest_new_chat = should_suggest_new_chat;
        data.custom_prompt = custom_prompt;

        let envelope = self.responses.build_success(data);
        self.responses.validate_format(&envelope)?;

        info!(
            commands = envelope.commands.len(),
            executed = envelope.executed_command_results.len(),
            "Chat request processed"
        );
        Ok(envelope)
    }

    /// Run `web_search` commands here; hand everything else to the caller.
    async fn execute(&self, commands: Vec<Command>) -> Execution {
        let mut execution = Execution::default();

        for command in commands {
            let Command::WebSearch { query, options } = &command else {
                execution.reports.push(ExecutionReport {
                    action: command.action(),
                    status: ExecutionStatus::Skipped,
                    message: Some("Returned to the caller for execution".into()),
                    result_count: 0,
                });
                execution.caller_commands.push(command);
                continue;
            };

            let Some(client) = &self.search else {
                warn!(query = %query, "Web search requested but no search client is configured");
                execution.reports.push(failed_search("No search client is configured"));
                execution
                    .warnings
                    .push("Web search is not available".into());
                continue;
            };

            let options = options.clone().unwrap_or_default();
            match client.search(query, &options).await {
                Ok(outcome) if outcome.success => {
                    info!(query = %query, results = outcome.results.len(), "Web search executed");
                    execution
                        .summaries
                        .push(search::summarize(query, &outcome.results));
                    execution.reports.push(ExecutionReport {
                        action: command.action(),
                        status: ExecutionStatus::Executed,
                        message: None,
                        result_count: outcome.results.len(),
                    });
                    execution
                        .search_results
                        .get_or_insert_with(Vec::new)
                        .extend(outcome.results);
                }
                Ok(outcome) => {
                    let reason = outcome.error.unwrap_or_else(|| "unknown error".into());
                    warn!(query = %query, reason = %reason, "Web search reported failure");
                    execution
                        .warnings
                        .push(format!("Web search failed: {reason}"));
                    execution.reports.push(failed_search(&reason));
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "Web search call failed");
                    execution.warnings.push(format!("Web search failed: {e}"));
                    execution.reports.push(failed_search(&e.to_string()));
                }
            }
        }

        execution
    }

    pub fn agents(&self) -> Vec<Arc<AgentDescriptor>> {
        self.dispatcher.agents()
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            dispatcher: self.dispatcher.status(),
            context_manager: self.contexts.status(),
            validator: self.dispatcher.validator().stats(),
            response_builder: self.responses.stats(),
            search_enabled: self.search.is_some(),
            timestamp: Utc::now(),
        }
    }

    /// Prepare a raw context without dispatching, e.g. for a caller preview.
    pub fn prepare_context(&self, raw_context: &Value) -> Context {
        self.contexts.prepare_context(raw_context)
    }
}

/// The structured failure behind a dispatch error, or its text when the
/// dispatcher kept none.
fn dispatch_error(result: &DispatchResult) -> Error {
    match &result.provider_error {
        Some(e) => Error::Provider(e.clone()),
        None => Error::Internal(result.error.clone().unwrap_or_default()),
    }
}

fn failed_search(reason: &str) -> ExecutionReport {
    ExecutionReport {
        action: dirflow_core::command::ActionName::WebSearch,
        status: ExecutionStatus::Failed,
        message: Some(reason.to_string()),
        result_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dirflow_core::command::SearchOptions;
    use dirflow_core::envelope::EnvelopeMetadata;
    use dirflow_core::error::{ErrorType, ProviderError};
    use dirflow_core::generation::GenerationRequest;
    use dirflow_core::search::SearchOutcome;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, ProviderError>>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            let mut replies = replies;
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
            })
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: GenerationRequest) -> Result<String, ProviderError> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::Other("script exhausted".into())))
        }
    }

    struct CannedSearch(Result<SearchOutcome, ProviderError>);

    #[async_trait]
    impl SearchClient for CannedSearch {
        async fn search(
            &self,
            _query: &str,
            _options: &SearchOptions,
        ) -> Result<SearchOutcome, ProviderError> {
            self.0.clone()
        }
    }

    fn hit() -> SearchHit {
        SearchHit {
            title: "Rust 1.90 released".into(),
            url: "https://blog.rust-lang.org".into(),
            snippet: "Announcing Rust 1.90".into(),
            source: "rust-lang.org".into(),
            score: Some(0.9),
            published_date: None,
        }
    }

    fn orchestrator(client: Arc<ScriptedClient>) -> ChatOrchestrator {
        ChatOrchestrator::from_config(client, Arc::new(AppConfig::default()))
    }

    #[tokio::test]
    async fn file_commands_returned_to_caller() {
        let client = ScriptedClient::new(vec![
            Ok("file_expert".into()),
            Ok(r#"{"action":"create_directory","path":"notes","message":"Making notes/"}"#.into()),
        ]);
        let env = orchestrator(client)
            .process_chat("make a notes folder", None, None, &json!({}))
            .await;

        assert_eq!(env.message, "Making notes/");
        assert_eq!(env.commands, vec![Command::CreateDirectory { path: "notes".into() }]);
        assert_eq!(env.executed_command_results[0].status, ExecutionStatus::Skipped);
        assert!(env.search_results.is_none());
        assert_eq!(env.agent_used.as_deref(), Some("file_expert"));
    }

    #[tokio::test]
    async fn search_failure_becomes_warning() {
        let client = ScriptedClient::new(vec![
            Ok("web_search_expert".into()),
            Ok(r#"{"action":"web_search","query":"rust"}"#.into()),
        ]);
        let env = orchestrator(client)
            .with_search(Arc::new(CannedSearch(Ok(SearchOutcome::failed("quota exceeded")))))
            .process_chat("search rust", None, None, &json!({}))
            .await;

        assert!(env.commands.is_empty());
        assert!(env.warning.unwrap().contains("quota exceeded"));
        assert_eq!(env.executed_command_results[0].status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn search_without_client_is_reported() {
        let client = ScriptedClient::new(vec![
            Ok("web_search_expert".into()),
            Ok(r#"{"action":"web_search","query":"rust"}"#.into()),
        ]);
        let env = orchestrator(client)
            .process_chat("search rust", None, None, &json!({}))
            .await;
        assert!(env.commands.is_empty());
        assert!(env.warning.is_some());
    }

    #[tokio::test]
    async fn search_results_attached_with_summary() {
        let client = ScriptedClient::new(vec![
            Ok("web_search_expert".into()),
            Ok(r#"{"action":"web_search","query":"rust release"}"#.into()),
        ]);
        let env = orchestrator(client)
            .with_search(Arc::new(CannedSearch(Ok(SearchOutcome::ok(vec![hit()])))))
            .process_chat("search rust release", None, None, &json!({}))
            .await;

        assert_eq!(env.search_results, Some(vec![hit()]));
        assert!(env.message.contains("Found 1 result"));
        assert_eq!(env.executed_command_results[0].result_count, 1);
    }

    #[tokio::test]
    async fn provider_failure_gives_error_envelope() {
        let client = ScriptedClient::new(vec![
            Ok("file_expert".into()),
            Err(ProviderError::RateLimited { retry_after_secs: 30 }),
        ]);
        let env = orchestrator(client)
            .process_chat("create a.txt", Some("openai"), None, &json!({}))
            .await;

        assert_eq!(env.error_type, Some(ErrorType::RateLimit));
        assert!(!env.parse_succeeded);
        assert!(env.is_fallback());
        assert_eq!(env.provider, "openai");
        assert_eq!(env.model, "gpt-4");
    }

    #[tokio::test]
    async fn empty_message_falls_back() {
        let client = ScriptedClient::new(vec![]);
        let env = orchestrator(client)
            .process_chat("   ", None, None, &json!({}))
            .await;
        assert!(env.is_fallback());
        assert!(env.parse_succeeded);
        assert!(env.fallback_reason.unwrap().contains("message must not be empty"));
    }

    #[tokio::test]
    async fn fallback_keeps_prepared_context() {
        let client = ScriptedClient::new(vec![]);
        let env = orchestrator(client)
            .process_chat(
                " ",
                None,
                None,
                &json!({
                    "fileList": ["a.txt"],
                    "customPrompt": {"enabled": true, "name": "Terse", "content": "Be brief."}
                }),
            )
            .await;

        assert!(env.is_fallback());
        assert!(env.custom_prompt_used);
        assert!(matches!(
            env.metadata,
            EnvelopeMetadata::Fallback {
                context_present: true,
                custom_prompt_used: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_provider_keeps_dispatched_commands() {
        let client = ScriptedClient::new(vec![
            Ok("file_expert".into()),
            Ok(r#"{"action":"create_directory","path":"notes"}"#.into()),
        ]);
        let env = orchestrator(client)
            .process_chat("make notes", Some("mistral"), None, &json!({}))
            .await;

        assert!(!env.is_fallback());
        assert_eq!(env.commands, vec![Command::CreateDirectory { path: "notes".into() }]);
        assert_eq!(env.provider, "mistral");
        assert_eq!(env.model, "unknown");
        assert!(matches!(env.metadata, EnvelopeMetadata::Success { .. }));
    }

    #[tokio::test]
    async fn long_history_suggests_new_chat() {
        let history: Vec<Value> = (0..15)
            .map(|i| json!({"user": format!("q{i}"), "ai": format!("answer {i}")}))
            .collect();
        let client = ScriptedClient::new(vec![
            Ok("general_assistant".into()),
            Ok("Sure.".into()),
        ]);
        let env = orchestrator(client)
            .process_chat("thanks", None, None, &json!({"conversationHistory": history}))
            .await;
        assert_eq!(env.should_suggest_new_chat, Some(true));
        assert!(env.message.starts_with("Sure."));
    }

    #[test]
    fn status_reports_components() {
        let status = orchestrator(ScriptedClient::new(vec![])).status();
        assert!(!status.search_enabled);
        assert_eq!(status.dispatcher.agents.len(), 3);
        assert_eq!(status.validator.total_allowed_actions, 12);
    }
}
