//! Configuration loading, validation, and management for dirflow.
//!
//! Loads configuration from `~/.dirflow/config.toml` with environment
//! variable overrides. Validates all settings at startup; the resulting
//! [`AppConfig`] is immutable and shared by reference for the life of the
//! process.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Hard ceiling for `context.max_history_items`.
pub const MAX_HISTORY_ITEMS_LIMIT: usize = 50;

/// Hard ceiling for `context.max_history_length`.
pub const MAX_HISTORY_LENGTH_LIMIT: usize = 50_000;

/// The root configuration structure.
///
/// Maps directly to `~/.dirflow/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider used when the caller names none
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model override; otherwise the provider's own default model is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Generation providers known to this process
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Conversation context bounds
    #[serde(default)]
    pub context: ContextConfig,

    /// Command validator rules
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Agent dispatcher settings
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Response envelope settings
    #[serde(default)]
    pub response: ResponseConfig,
}

fn default_provider() -> String {
    "gemini".into()
}

/// One entry in the provider table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name
    pub name: String,

    #[serde(default)]
    pub models: Vec<String>,

    pub default_model: String,

    /// Environment variable holding the API key, if the provider needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl ProviderConfig {
    fn new(name: &str, models: &[&str], default_model: &str, api_key_env: Option<&str>) -> Self {
        Self {
            name: name.into(),
            models: models.iter().map(|m| m.to_string()).collect(),
            default_model: default_model.into(),
            api_key_env: api_key_env.map(Into::into),
        }
    }

    /// Whether the credential this provider needs is present in the environment.
    pub fn has_credentials(&self) -> bool {
        match &self.api_key_env {
            Some(var) => std::env::var(var).is_ok_and(|v| !v.is_empty()),
            None => true,
        }
    }
}

fn default_providers() -> BTreeMap<String, ProviderConfig> {
    let mut providers = BTreeMap::new();
    providers.insert(
        "claude".into(),
        ProviderConfig::new(
            "Claude",
            &[
                "claude-3-haiku-20240307",
                "claude-3-5-haiku-20241022",
                "claude-sonnet-4-20250514",
                "claude-opus-4-1-20250805",
            ],
            "claude-3-5-haiku-20241022",
            Some("ANTHROPIC_API_KEY"),
        ),
    );
    providers.insert(
        "openai".into(),
        ProviderConfig::new(
            "OpenAI GPT",
            &["gpt-4.1-mini", "gpt-4", "gpt-4-turbo"],
            "gpt-4",
            Some("OPENAI_API_KEY"),
        ),
    );
    providers.insert(
        "gemini".into(),
        ProviderConfig::new(
            "Google Gemini",
            &["gemini-2.5-flash-lite", "gemini-2.5-flash", "gemini-2.5-pro"],
            "gemini-2.5-flash",
            Some("GOOGLE_API_KEY"),
        ),
    );
    providers.insert(
        "local".into(),
        ProviderConfig::new(
            "Local LLM",
            &["phi3:latest", "llama3:latest", "gemma3:4b", "gpt-oss:20b"],
            "phi3:latest",
            None,
        ),
    );
    providers
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Most recent exchanges kept in the history window
    #[serde(default = "default_max_history_items")]
    pub max_history_items: usize,

    /// Character budget for user + assistant text across the window
    #[serde(default = "default_max_history_length")]
    pub max_history_length: usize,

    #[serde(default = "default_current_path")]
    pub default_current_path: String,

    #[serde(default = "default_max_file_list")]
    pub max_file_list: usize,
}

fn default_max_history_items() -> usize {
    15
}
fn default_max_history_length() -> usize {
    10_000
}
fn default_current_path() -> String {
    "/workspace".into()
}
fn default_max_file_list() -> usize {
    1000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history_items: default_max_history_items(),
            max_history_length: default_max_history_length(),
            default_current_path: default_current_path(),
            max_file_list: default_max_file_list(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Absolute paths outside this root are logged
    #[serde(default = "default_current_path")]
    pub workspace_root: String,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Substrings that make a path unsafe wherever they appear
    #[serde(default = "default_denied_path_patterns")]
    pub denied_path_patterns: Vec<String>,

    /// Names that trigger a warning when targeted by a deletion
    #[serde(default = "default_critical_file_patterns")]
    pub critical_file_patterns: Vec<String>,
}

fn default_max_batch_size() -> usize {
    100
}
fn default_max_query_length() -> usize {
    500
}
fn default_denied_path_patterns() -> Vec<String> {
    [
        "..",
        "~",
        "/etc",
        "/var",
        "/usr",
        "/bin",
        "/sbin",
        "/root",
        "C:\\Windows",
        "C:\\Program",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_critical_file_patterns() -> Vec<String> {
    [
        "package.json",
        ".env",
        "config.json",
        "settings.json",
        ".git",
        "node_modules",
        "README.md",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_current_path(),
            max_batch_size: default_max_batch_size(),
            max_query_length: default_max_query_length(),
            denied_path_patterns: default_denied_path_patterns(),
            critical_file_patterns: default_critical_file_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Model used only for agent selection (cheaper is fine)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_model: Option<String>,

    #[serde(default = "default_selection_max_tokens")]
    pub selection_max_tokens: u32,
}

fn default_selection_max_tokens() -> u32 {
    100
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            selection_model: None,
            selection_max_tokens: default_selection_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Append "handled by <agent>" to successful replies
    #[serde(default)]
    pub announce_agent: bool,
}

impl AppConfig {
    /// Load configuration from the default path (~/.dirflow/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `DIRFLOW_PROVIDER`
    /// - `DIRFLOW_MODEL`
    /// - `DIRFLOW_WORKSPACE_ROOT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(provider) = std::env::var("DIRFLOW_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("DIRFLOW_MODEL") {
            config.default_model = Some(model);
        }

        if let Ok(root) = std::env::var("DIRFLOW_WORKSPACE_ROOT") {
            config.validator.workspace_root = root.clone();
            config.context.default_current_path = root;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dirflow")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ctx = &self.context;
        if ctx.max_history_items == 0 || ctx.max_history_items > MAX_HISTORY_ITEMS_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "context.max_history_items must be between 1 and {MAX_HISTORY_ITEMS_LIMIT}"
            )));
        }
        if ctx.max_history_length == 0 || ctx.max_history_length > MAX_HISTORY_LENGTH_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "context.max_history_length must be between 1 and {MAX_HISTORY_LENGTH_LIMIT}"
            )));
        }
        if self.validator.max_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "validator.max_batch_size must be > 0".into(),
            ));
        }
        if self.validator.max_query_length == 0 {
            return Err(ConfigError::ValidationError(
                "validator.max_query_length must be > 0".into(),
            ));
        }
        if !self.providers.contains_key(&self.default_provider) {
            return Err(ConfigError::ValidationError(format!(
                "default_provider '{}' is not in the provider table",
                self.default_provider
            )));
        }
        if let Some((key, _)) = self
            .providers
            .iter()
            .find(|(_, p)| p.default_model.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "providers.{key}.default_model must not be empty"
            )));
        }
        Ok(())
    }

    /// Look up a provider in the table.
    pub fn provider(&self, key: &str) -> Option<&ProviderConfig> {
        self.providers.get(key)
    }

    /// The model to use for `provider` when the caller names none.
    pub fn default_model_for(&self, provider: &str) -> Option<&str> {
        if provider == self.default_provider
            && let Some(model) = &self.default_model
        {
            return Some(model);
        }
        self.providers.get(provider).map(|p| p.default_model.as_str())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_model: None,
            providers: default_providers(),
            context: ContextConfig::default(),
            validator: ValidatorConfig::default(),
            dispatcher: DispatcherConfig::default(),
            response: ResponseConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.context.max_history_items, 15);
        assert_eq!(config.context.max_history_length, 10_000);
        assert_eq!(config.validator.max_batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.providers.len(), 4);
        assert_eq!(
            parsed.validator.denied_path_patterns,
            config.validator.denied_path_patterns
        );
    }

    #[test]
    fn history_limits_are_capped() {
        let mut config = AppConfig::default();
        config.context.max_history_items = 51;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.context.max_history_length = 50_001;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.context.max_history_items = 50;
        config.context.max_history_length = 50_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_default_provider_rejected() {
        let config = AppConfig {
            default_provider: "mistral".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.default_provider, "gemini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_provider = "claude"

[context]
max_history_items = 20

[dispatcher]
selection_model = "claude-3-haiku-20240307"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_provider, "claude");
        assert_eq!(config.context.max_history_items, 20);
        assert_eq!(config.context.max_history_length, 10_000);
        assert_eq!(
            config.dispatcher.selection_model.as_deref(),
            Some("claude-3-haiku-20240307")
        );
        assert_eq!(config.dispatcher.selection_max_tokens, 100);
        assert!(config.providers.contains_key("local"));
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_provider = [").unwrap();
        match AppConfig::load_from(file.path()) {
            Err(ConfigError::ParseError { .. }) => {}
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn default_model_resolution() {
        let mut config = AppConfig::default();
        assert_eq!(config.default_model_for("gemini"), Some("gemini-2.5-flash"));
        assert_eq!(config.default_model_for("local"), Some("phi3:latest"));
        assert_eq!(config.default_model_for("nope"), None);

        config.default_model = Some("gemini-2.5-pro".into());
        assert_eq!(config.default_model_for("gemini"), Some("gemini-2.5-pro"));
        assert_eq!(config.default_model_for("claude"), Some("claude-3-5-haiku-20241022"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini"));
        assert!(toml_str.contains("max_history_items"));
    }

    #[test]
    fn local_provider_needs_no_credentials() {
        let config = AppConfig::default();
        assert!(config.provider("local").unwrap().has_credentials());
    }
}
