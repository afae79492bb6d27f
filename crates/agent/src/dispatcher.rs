//! Agent dispatcher: routes a user message to one agent and turns its
//! reply into validated commands.
//!
//! Neither [`AgentDispatcher::select_agent`] nor [`AgentDispatcher::dispatch`]
//! can fail: collaborator errors become a fallback agent or an `error`
//! field on the [`DispatchResult`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dirflow_config::AppConfig;
use dirflow_core::context::Context;
use dirflow_core::dispatch::DispatchResult;
use dirflow_core::error::ProviderError;
use dirflow_core::generation::{GenerationClient, GenerationRequest};
use dirflow_security::{CommandValidator, ValidatorStats};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::parser::{ParsedCompletion, parse_completion};
use crate::prompt;
use crate::registry::{AgentDescriptor, AgentRegistry};

/// Provider and model a request will actually use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStatus {
    pub agents: Vec<String>,
    pub generation_client: String,
    pub default_provider: String,
    pub validator: ValidatorStats,
    pub timestamp: DateTime<Utc>,
}

pub struct AgentDispatcher {
    client: Arc<dyn GenerationClient>,
    validator: Arc<CommandValidator>,
    registry: Arc<AgentRegistry>,
    config: Arc<AppConfig>,
}

impl AgentDispatcher {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        validator: Arc<CommandValidator>,
        registry: Arc<AgentRegistry>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            client,
            validator,
            registry,
            config,
        }
    }

    /// Built-in agents and a validator derived from `config`.
    pub fn from_config(client: Arc<dyn GenerationClient>, config: Arc<AppConfig>) -> Self {
        let validator = Arc::new(CommandValidator::new(&config.validator));
        Self::new(client, validator, Arc::new(AgentRegistry::builtin()), config)
    }

    /// Resolve provider (argument, then context, then configured default)
    /// and model (argument, then context, then the provider's default).
    pub fn resolve_route(
        &self,
        context: &Context,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Route {
        let provider = non_empty(provider)
            .or_else(|| non_empty(context.provider.as_deref()))
            .unwrap_or(self.config.default_provider.as_str())
            .to_string();

        let model = non_empty(model)
            .or_else(|| non_empty(context.model.as_deref()))
            .or_else(|| self.config.default_model_for(&provider))
            .unwrap_or_default()
            .to_string();

        Route { provider, model }
    }

    /// Pick the agent for `user_message`. Never fails; any problem routes to
    /// the general agent.
    pub async fn select_agent(
        &self,
        user_message: &str,
        context: &Context,
    ) -> Arc<AgentDescriptor> {
        let route = self.resolve_route(context, None, None);
        self.select_with_route(user_message, context, &route).await
    }

    async fn select_with_route(
        &self,
        user_message: &str,
        context: &Context,
        route: &Route,
    ) -> Arc<AgentDescriptor> {
        let model = non_empty(context.agent_selection_model.as_deref())
            .or_else(|| non_empty(self.config.dispatcher.selection_model.as_deref()))
            .unwrap_or(route.model.as_str());

        let request = GenerationRequest::new(
            prompt::selection_prompt(&self.registry, user_message),
            &route.provider,
            model,
        )
        .with_max_tokens(self.config.dispatcher.selection_max_tokens)
        .with_hint("purpose", "agent_selection".into());

        match self.client.complete(request).await {
            Ok(reply) => {
                let agent = self.registry.resolve(&reply);
                debug!(reply = reply.trim(), agent = %agent.key, "Agent selection reply");
                Arc::clone(agent)
            }
            Err(e) => {
                warn!(error = %e, "Agent selection failed, using general agent");
                Arc::clone(self.registry.general())
            }
        }
    }

    /// Handle one user message end to end. Never fails.
    pub async fn dispatch(
        &self,
        user_message: &str,
        context: &Context,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> DispatchResult {
        let route = self.resolve_route(context, provider, model);
        let agent = self.select_with_route(user_message, context, &route).await;
        info!(
            agent = %agent.key,
            provider = %route.provider,
            model = %route.model,
            "Dispatching request"
        );

        let mut result = DispatchResult {
            agent: agent.key.clone(),
            agent_name: agent.display_name.clone(),
            commands: Vec::new(),
            raw_completion: String::new(),
            parse_succeeded: false,
            warning: None,
            error: None,
            message: None,
            provider: route.provider.clone(),
            model: route.model.clone(),
            provider_error: None,
        };

        let request = GenerationRequest::new(
            prompt::agent_prompt(&agent, user_message, context),
            &route.provider,
            &route.model,
        )
        .with_hint("agent", agent.key.clone().into());
        let request = match serde_json::to_value(context) {
            Ok(ctx) => request.with_hint("context", ctx),
            Err(_) => request,
        };

        let completion = match self.client.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(agent = %agent.key, error = %e, "Generation call failed");
                return Self::failed(result, e);
            }
        };
        result.raw_completion = completion;

        if agent.is_general() {
            result.parse_succeeded = true;
            result.message = Some(result.raw_completion.clone());
            return result;
        }

        let parsed = parse_completion(&result.raw_completion);
        result.parse_succeeded = parsed.succeeded();

        if let ParsedCompletion::Unrecognized { reason } = &parsed {
            warn!(agent = %agent.key, reason = %reason, "Could not parse commands from completion");
            result.push_warning(format!("Failed to parse commands from the reply: {reason}"));
            result.message = Some(result.raw_completion.clone());
            return result;
        }

        let (candidates, message) = parsed.into_parts();
        result.message = message;

        for candidate in candidates {
            match self.validator.validate(&candidate) {
                Ok(command) => result.commands.push(command),
                Err(e) => {
                    warn!(agent = %agent.key, error = %e, "Dropping invalid command");
                    result.push_warning(format!("Command rejected: {e}"));
                }
            }
        }

        debug!(
            agent = %agent.key,
            commands = result.commands.len(),
            has_warning = result.warning.is_some(),
            "Dispatch complete"
        );
        result
    }

    fn failed(mut result: DispatchResult, error: ProviderError) -> DispatchResult {
        result.parse_succeeded = false;
        result.commands.clear();
        result.error = Some(error.to_string());
        result.push_warning(format!("Generation call failed: {error}"));
        result.provider_error = Some(error);
        result
    }

    /// Descriptors for a caller UI.
    pub fn agents(&self) -> Vec<Arc<AgentDescriptor>> {
        self.registry.iter().cloned().collect()
    }

    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            agents: self.registry.keys().into_iter().map(String::from).collect(),
            generation_client: self.client.name().to_string(),
            default_provider: self.config.default_provider.clone(),
            validator: self.validator.stats(),
            timestamp: Utc::now(),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}
