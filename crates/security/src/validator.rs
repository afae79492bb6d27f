//! Command validator: the gate between model output and any executor.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. The command is an object with an allow-listed `action`
//! 2. `web_search`: query and options
//! 3. Otherwise: each path field (`path`, `source`, `destination`)
//! 4. Batch fields (`paths`, `sources`): non-empty, bounded, each path checked
//! 5. Required fields for the action
//! 6. Dangerous actions: deletion guards
//!
//! A command that passes every check is decoded into a typed [`Command`].
//! Validation never mutates its input.

use dirflow_config::ValidatorConfig;
use dirflow_core::command::{ActionName, Command, SearchProvider};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::path::PathRules;

const PATH_FIELDS: [&str; 3] = ["path", "source", "destination"];
const BATCH_FIELDS: [&str; 2] = ["paths", "sources"];

/// Targets that would wipe a whole directory when deleted.
const DELETION_MARKERS: [&str; 3] = ["/", ".", "*"];

/// One rejected entry in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    pub index: usize,
    pub command: Value,
    pub error: String,
}

/// Result of validating a list of commands independently.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub valid_commands: Vec<Command>,
    pub errors: Vec<BatchError>,
    pub total_processed: usize,
    pub success_count: usize,
    pub error_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorStats {
    pub total_allowed_actions: usize,
    pub dangerous_actions_count: usize,
    pub path_fields_count: usize,
    pub actions_with_required_fields: usize,
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchValidationStats {
    pub search_commands_supported: Vec<&'static str>,
    pub valid_providers: Vec<&'static str>,
    pub max_query_length: usize,
    pub max_results_range: (i64, i64),
}

const MAX_RESULTS_RANGE: (i64, i64) = (1, 20);

/// Stateless, rule-based command validator.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    paths: PathRules,
    max_batch_size: usize,
    max_query_length: usize,
    critical_patterns: Vec<String>,
}

impl CommandValidator {
    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            paths: PathRules::from_config(config),
            max_batch_size: config.max_batch_size,
            max_query_length: config.max_query_length,
            critical_patterns: config.critical_file_patterns.clone(),
        }
    }

    /// Validate one untrusted command, returning its typed form.
    pub fn validate(&self, command: &Value) -> Result<Command, ValidationError> {
        let obj = command.as_object().ok_or(ValidationError::NotAnObject)?;
        let action = Self::action_of(obj)?;

        if action.is_search() {
            self.check_web_search(obj)?;
        } else {
            self.check_path_fields(obj)?;
            self.check_batch_fields(obj)?;
        }

        Self::check_required_fields(action, obj)?;

        let typed = serde_json::from_value::<Command>(command.clone()).map_err(|e| {
            ValidationError::Malformed {
                action: action.to_string(),
                reason: e.to_string(),
            }
        })?;

        // Guard the targets the typed command carries, not stray fields.
        if action.is_dangerous() {
            self.check_dangerous(&typed)?;
        }

        debug!(action = %action, "Command validated");
        Ok(typed)
    }

    pub fn is_valid(&self, command: &Value) -> bool {
        self.validate(command).is_ok()
    }

    /// Validate each command independently; one bad entry never stops the rest.
    pub fn validate_batch(&self, commands: &[Value]) -> BatchReport {
        let mut valid_commands = Vec::new();
        let mut errors = Vec::new();

        for (index, command) in commands.iter().enumerate() {
            match self.validate(command) {
                Ok(cmd) => valid_commands.push(cmd),
                Err(e) => errors.push(BatchError {
                    index,
                    command: command.clone(),
                    error: e.to_string(),
                }),
            }
        }

        BatchReport {
            success_count: valid_commands.len(),
            error_count: errors.len(),
            total_processed: commands.len(),
            valid_commands,
            errors,
        }
    }

    // ── Checks ──────────────────────────────────────────────────────────

    fn action_of(obj: &Map<String, Value>) -> Result<ActionName, ValidationError> {
        let action = present(obj, "action")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .ok_or(ValidationError::MissingAction)?;
        action
            .parse::<ActionName>()
            .map_err(|_| ValidationError::UnsupportedAction(action.to_string()))
    }

    fn check_web_search(&self, obj: &Map<String, Value>) -> Result<(), ValidationError> {
        let query = present(obj, "query").ok_or_else(|| ValidationError::MissingField {
            field: "query".into(),
        })?;
        let query = query
            .as_str()
            .ok_or_else(|| ValidationError::not_a_string("query"))?;
        if query.trim().is_empty() {
            return Err(ValidationError::empty("query"));
        }
        let len = query.chars().count();
        if len > self.max_query_length {
            return Err(ValidationError::QueryTooLong {
                len,
                max: self.max_query_length,
            });
        }

        if let Some(options) = present(obj, "options") {
            let options = options
                .as_object()
                .ok_or_else(|| ValidationError::search_option("options", "must be an object"))?;
            Self::check_search_options(options)?;
        }

        debug!(query, "Web search command validated");
        Ok(())
    }

    fn check_search_options(options: &Map<String, Value>) -> Result<(), ValidationError> {
        if let Some(max) = options.get("maxResults") {
            let (lo, hi) = MAX_RESULTS_RANGE;
            match max.as_i64() {
                Some(n) if (lo..=hi).contains(&n) => {}
                _ => {
                    return Err(ValidationError::search_option(
                        "maxResults",
                        format!("must be an integer between {lo} and {hi}"),
                    ));
                }
            }
        }

        if let Some(provider) = options.get("provider") {
            let known = provider
                .as_str()
                .is_some_and(|p| SearchProvider::NAMES.contains(&p));
            if !known {
                return Err(ValidationError::search_option(
                    "provider",
                    format!("{provider} is not one of {}", SearchProvider::NAMES.join(", ")),
                ));
            }
        }

        for key in ["language", "region"] {
            if let Some(code) = options.get(key) {
                let ok = code.as_str().is_some_and(|c| c.chars().count() == 2);
                if !ok {
                    return Err(ValidationError::search_option(key, "must be a 2-letter code"));
                }
            }
        }

        for key in ["filterDomains", "excludeDomains"] {
            if let Some(domains) = options.get(key)
                && !domains.is_array()
            {
                return Err(ValidationError::search_option(key, "must be a list"));
            }
        }

        Ok(())
    }

    fn check_path_fields(&self, obj: &Map<String, Value>) -> Result<(), ValidationError> {
        for field in PATH_FIELDS {
            if let Some(value) = present(obj, field) {
                self.paths.check_value(field, value)?;
            }
        }
        Ok(())
    }

    fn check_batch_fields(&self, obj: &Map<String, Value>) -> Result<(), ValidationError> {
        for field in BATCH_FIELDS {
            let Some(value) = present(obj, field) else {
                continue;
            };
            let items = value.as_array().ok_or_else(|| ValidationError::NotAList {
                field: field.into(),
            })?;
            if items.is_empty() {
                return Err(ValidationError::EmptyList {
                    field: field.into(),
                });
            }
            if items.len() > self.max_batch_size {
                return Err(ValidationError::BatchTooLarge {
                    field: field.into(),
                    count: items.len(),
                    max: self.max_batch_size,
                });
            }
            for (i, item) in items.iter().enumerate() {
                self.paths.check_value(&format!("{field}[{i}]"), item)?;
            }
        }
        Ok(())
    }

    fn check_required_fields(
        action: ActionName,
        obj: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        for &field in action.required_fields() {
            let value = present(obj, field).ok_or_else(|| ValidationError::MissingField {
                field: field.into(),
            })?;
            if field != "content"
                && let Some(s) = value.as_str()
                && s.trim().is_empty()
            {
                return Err(ValidationError::empty(field));
            }
        }
        Ok(())
    }

    fn check_dangerous(&self, command: &Command) -> Result<(), ValidationError> {
        let action = command.action();
        let targets = command.paths();
        warn!(action = %action, targets = ?targets, "Dangerous operation requested");

        if !action.is_deletion() {
            return Ok(());
        }

        for path in targets {
            let trimmed = path.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(pattern) = self
                .critical_patterns
                .iter()
                .find(|p| trimmed.contains(p.as_str()))
            {
                warn!(path = trimmed, pattern = %pattern, "Deletion targets a critical file");
            }
            if DELETION_MARKERS.contains(&trimmed) || trimmed.contains('*') {
                return Err(ValidationError::DangerousDeletion {
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }

    // ── Introspection ───────────────────────────────────────────────────

    pub fn allowed_actions(&self) -> &'static [ActionName] {
        &ActionName::ALL
    }

    /// Required fields for an action name; empty for unknown actions.
    pub fn required_fields(&self, action: &str) -> &'static [&'static str] {
        action
            .parse::<ActionName>()
            .map(|a| a.required_fields())
            .unwrap_or(&[])
    }

    pub fn is_dangerous_action(&self, action: &str) -> bool {
        action.parse::<ActionName>().is_ok_and(|a| a.is_dangerous())
    }

    pub fn is_search_command(&self, action: &str) -> bool {
        action.parse::<ActionName>().is_ok_and(|a| a.is_search())
    }

    pub fn stats(&self) -> ValidatorStats {
        ValidatorStats {
            total_allowed_actions: ActionName::ALL.len(),
            dangerous_actions_count: ActionName::DANGEROUS.len(),
            path_fields_count: PATH_FIELDS.len(),
            actions_with_required_fields: ActionName::ALL
                .iter()
                .filter(|a| !a.required_fields().is_empty())
                .count(),
            max_batch_size: self.max_batch_size,
        }
    }

    pub fn search_stats(&self) -> SearchValidationStats {
        SearchValidationStats {
            search_commands_supported: vec![ActionName::WebSearch.as_str()],
            valid_providers: SearchProvider::NAMES.to_vec(),
            max_query_length: self.max_query_length,
            max_results_range: MAX_RESULTS_RANGE,
        }
    }
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new(&ValidatorConfig::default())
    }
}

/// A field counts as present only when it exists and is not `null`.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}
