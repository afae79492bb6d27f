//! Path rules: syntactic checks on model-supplied paths.
//!
//! Paths are never resolved against the filesystem here; the executor is
//! someone else. A path is rejected when it contains any denied pattern
//! (parent-directory segments, home shorthand, system roots on POSIX and
//! Windows). Matching ignores case and treats `\` as `/`.

use dirflow_config::ValidatorConfig;

use crate::error::ValidationError;

/// Where an accepted path points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathVerdict {
    Relative,
    InsideWorkspace,
    /// Absolute and outside the workspace root. Accepted, but logged.
    OutsideWorkspace,
}

#[derive(Debug, Clone)]
pub struct PathRules {
    /// (original, normalized) pairs
    denied: Vec<(String, String)>,
    workspace_root: String,
}

impl PathRules {
    pub fn new(denied_patterns: &[String], workspace_root: impl Into<String>) -> Self {
        Self {
            denied: denied_patterns
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| (p.clone(), normalize(p)))
                .collect(),
            workspace_root: workspace_root.into(),
        }
    }

    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self::new(&config.denied_path_patterns, config.workspace_root.clone())
    }

    /// Check a JSON value that should hold a path.
    pub fn check_value(
        &self,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<PathVerdict, ValidationError> {
        let path = value
            .as_str()
            .ok_or_else(|| ValidationError::not_a_string(field))?;
        self.check(field, path)
    }

    /// Check a single path string.
    pub fn check(&self, field: &str, path: &str) -> Result<PathVerdict, ValidationError> {
        if path.trim().is_empty() {
            return Err(ValidationError::empty(field));
        }

        let normalized = normalize(path);
        if let Some((pattern, _)) = self
            .denied
            .iter()
            .find(|(_, denied)| normalized.contains(denied.as_str()))
        {
            return Err(ValidationError::UnsafePath {
                field: field.into(),
                path: path.into(),
                pattern: pattern.clone(),
            });
        }

        if !path.starts_with('/') {
            return Ok(PathVerdict::Relative);
        }

        if path.starts_with(&self.workspace_root) {
            Ok(PathVerdict::InsideWorkspace)
        } else {
            tracing::warn!(field, path, root = %self.workspace_root, "Absolute path outside workspace root");
            Ok(PathVerdict::OutsideWorkspace)
        }
    }
}

impl Default for PathRules {
    fn default() -> Self {
        Self::from_config(&ValidatorConfig::default())
    }
}

fn normalize(s: &str) -> String {
    s.replace('\\', "/").to_lowercase()
}
