//! The outcome of one agent dispatch.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::ProviderError;

/// What the agent dispatcher hands back for a single user message.
///
/// Always well-formed: a failed generation call shows up in `error` with an
/// empty command list rather than as an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    /// Key of the agent that handled the request.
    pub agent: String,

    /// Display name of that agent.
    pub agent_name: String,

    /// Commands that passed validation, in the order the model emitted them.
    pub commands: Vec<Command>,

    pub raw_completion: String,

    pub parse_succeeded: bool,

    pub warning: Option<String>,

    pub error: Option<String>,

    pub message: Option<String>,

    /// Provider actually used for the completion.
    pub provider: String,

    /// Model actually used for the completion.
    pub model: String,

    /// The structured collaborator failure behind `error`, kept for
    /// classification. Not part of the wire shape.
    #[serde(skip)]
    pub provider_error: Option<ProviderError>,
}

impl DispatchResult {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Append a warning, joining with `"; "` when one is already present.
    pub fn push_warning(&mut self, warning: impl AsRef<str>) {
        let warning = warning.as_ref();
        match &mut self.warning {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(warning);
            }
            None => self.warning = Some(warning.to_string()),
        }
    }
}
