//! Commands: the structured actions a model may ask the caller to perform.
//!
//! A model's reply is untrusted JSON. It only becomes a [`Command`] after the
//! validator has accepted it; the typed enum below is what flows onward to
//! executors and into response envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The allow-list of action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    CreateFile,
    CreateDirectory,
    DeleteFile,
    CopyFile,
    MoveFile,
    ReadFile,
    EditFile,
    ListFiles,
    BatchDelete,
    BatchCopy,
    BatchMove,
    WebSearch,
}

impl ActionName {
    pub const ALL: [ActionName; 12] = [
        ActionName::CreateFile,
        ActionName::CreateDirectory,
        ActionName::DeleteFile,
        ActionName::CopyFile,
        ActionName::MoveFile,
        ActionName::ReadFile,
        ActionName::EditFile,
        ActionName::ListFiles,
        ActionName::BatchDelete,
        ActionName::BatchCopy,
        ActionName::BatchMove,
        ActionName::WebSearch,
    ];

    /// Actions that can destroy or rename user data.
    pub const DANGEROUS: [ActionName; 4] = [
        ActionName::DeleteFile,
        ActionName::BatchDelete,
        ActionName::MoveFile,
        ActionName::BatchMove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::CreateFile => "create_file",
            ActionName::CreateDirectory => "create_directory",
            ActionName::DeleteFile => "delete_file",
            ActionName::CopyFile => "copy_file",
            ActionName::MoveFile => "move_file",
            ActionName::ReadFile => "read_file",
            ActionName::EditFile => "edit_file",
            ActionName::ListFiles => "list_files",
            ActionName::BatchDelete => "batch_delete",
            ActionName::BatchCopy => "batch_copy",
            ActionName::BatchMove => "batch_move",
            ActionName::WebSearch => "web_search",
        }
    }

    /// Fields that must be present for this action.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            ActionName::CreateFile
            | ActionName::CreateDirectory
            | ActionName::DeleteFile
            | ActionName::ReadFile => &["path"],
            ActionName::CopyFile | ActionName::MoveFile => &["source", "destination"],
            ActionName::EditFile => &["path", "content"],
            ActionName::ListFiles => &[],
            ActionName::BatchDelete => &["paths"],
            ActionName::BatchCopy | ActionName::BatchMove => &["sources", "destination"],
            ActionName::WebSearch => &["query"],
        }
    }

    pub fn is_dangerous(&self) -> bool {
        Self::DANGEROUS.contains(self)
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, ActionName::DeleteFile | ActionName::BatchDelete)
    }

    pub fn is_search(&self) -> bool {
        matches!(self, ActionName::WebSearch)
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unsupported action: {s}"))
    }
}

/// Search backend preference carried by a `web_search` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    #[default]
    Auto,
    Tavily,
    Google,
    Duckduckgo,
}

impl SearchProvider {
    pub const NAMES: [&'static str; 4] = ["auto", "tavily", "google", "duckduckgo"];
}

/// Options attached to a `web_search` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<SearchProvider>,

    /// ISO 639-1 language code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// ISO 3166-1 alpha-2 region code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_domains: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_domains: Option<Vec<String>>,
}

/// A validated command.
///
/// Serializes to the same flat shape the model produces, e.g.
/// `{"action":"copy_file","source":"a.txt","destination":"b.txt"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    CreateFile {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    CreateDirectory {
        path: String,
    },
    DeleteFile {
        path: String,
    },
    CopyFile {
        source: String,
        destination: String,
    },
    MoveFile {
        source: String,
        destination: String,
    },
    ReadFile {
        path: String,
    },
    EditFile {
        path: String,
        content: String,
    },
    ListFiles {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    BatchDelete {
        paths: Vec<String>,
    },
    BatchCopy {
        sources: Vec<String>,
        destination: String,
    },
    BatchMove {
        sources: Vec<String>,
        destination: String,
    },
    WebSearch {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<SearchOptions>,
    },
}

impl Command {
    pub fn action(&self) -> ActionName {
        match self {
            Command::CreateFile { .. } => ActionName::CreateFile,
            Command::CreateDirectory { .. } => ActionName::CreateDirectory,
            Command::DeleteFile { .. } => ActionName::DeleteFile,
            Command::CopyFile { .. } => ActionName::CopyFile,
            Command::MoveFile { .. } => ActionName::MoveFile,
            Command::ReadFile { .. } => ActionName::ReadFile,
            Command::EditFile { .. } => ActionName::EditFile,
            Command::ListFiles { .. } => ActionName::ListFiles,
            Command::BatchDelete { .. } => ActionName::BatchDelete,
            Command::BatchCopy { .. } => ActionName::BatchCopy,
            Command::BatchMove { .. } => ActionName::BatchMove,
            Command::WebSearch { .. } => ActionName::WebSearch,
        }
    }

    /// Every filesystem path this command touches, in field order.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Command::CreateFile { path, .. }
            | Command::CreateDirectory { path }
            | Command::DeleteFile { path }
            | Command::ReadFile { path }
            | Command::EditFile { path, .. } => vec![path.as_str()],
            Command::ListFiles { path } => path.as_deref().into_iter().collect(),
            Command::CopyFile { source, destination } | Command::MoveFile { source, destination } => {
                vec![source.as_str(), destination.as_str()]
            }
            Command::BatchDelete { paths } => paths.iter().map(String::as_str).collect(),
            Command::BatchCopy { sources, destination }
            | Command::BatchMove { sources, destination } => sources
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(destination.as_str()))
                .collect(),
            Command::WebSearch { .. } => vec![],
        }
    }
}
