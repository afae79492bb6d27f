//! Validation failures. Each variant names the offending field.

/// Why a command was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Command must be a JSON object")]
    NotAnObject,

    #[error("Command has no action")]
    MissingAction,

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("{field} must be a string")]
    NotAString { field: String },

    #[error("{field} is empty")]
    EmptyField { field: String },

    #[error("Unsafe path in {field}: '{path}' (matches '{pattern}')")]
    UnsafePath {
        field: String,
        path: String,
        pattern: String,
    },

    #[error("{field} must be a list")]
    NotAList { field: String },

    #[error("{field} is an empty list")]
    EmptyList { field: String },

    #[error("{field} has {count} entries, batch limit is {max}")]
    BatchTooLarge {
        field: String,
        count: usize,
        max: usize,
    },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("web_search: query is {len} characters, limit is {max}")]
    QueryTooLong { len: usize, max: usize },

    #[error("web_search: invalid option {option}: {reason}")]
    InvalidSearchOption { option: String, reason: String },

    #[error("Dangerous deletion target: '{path}'")]
    DangerousDeletion { path: String },

    #[error("Malformed {action} command: {reason}")]
    Malformed { action: String, reason: String },
}

impl ValidationError {
    pub(crate) fn not_a_string(field: &str) -> Self {
        Self::NotAString {
            field: field.into(),
        }
    }

    pub(crate) fn empty(field: &str) -> Self {
        Self::EmptyField {
            field: field.into(),
        }
    }

    pub(crate) fn search_option(option: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSearchOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        let err = ValidationError::MissingField {
            field: "destination".into(),
        };
        assert!(err.to_string().contains("destination"));

        let err = ValidationError::UnsafePath {
            field: "path".into(),
            path: "../secret".into(),
            pattern: "..".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("path"));
        assert!(msg.contains("../secret"));
    }
}
