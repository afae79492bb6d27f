//! Offline responder: deterministic replies used when the generation
//! service cannot be reached.
//!
//! The reply is chosen by keyword on the user's message, checked in order:
//! help, search, create, copy, move, list. Anything else gets one of a few
//! generic acknowledgements.

use chrono::Utc;
use dirflow_core::command::Command;
use dirflow_core::context::{Context, DEFAULT_CURRENT_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackCategory {
    Help,
    Search,
    Create,
    Copy,
    Move,
    List,
    Generic,
}

impl FallbackCategory {
    const KEYWORDS: [(FallbackCategory, &'static [&'static str]); 6] = [
        (FallbackCategory::Help, &["help", "ヘルプ"]),
        (FallbackCategory::Search, &["search", "検索", "調べて", "リサーチ"]),
        (FallbackCategory::Create, &["create", "作成"]),
        (FallbackCategory::Copy, &["copy", "コピー"]),
        (FallbackCategory::Move, &["move", "移動"]),
        (FallbackCategory::List, &["list", "一覧"]),
    ];

    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        Self::KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| message.contains(w)))
            .map(|(category, _)| *category)
            .unwrap_or(FallbackCategory::Generic)
    }
}

/// Message and commands for an offline reply. Commands are always empty
/// today; nothing is executed without the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineReply {
    pub category: FallbackCategory,
    pub message: String,
    pub commands: Vec<Command>,
}

const GENERIC_REPLIES: [&str; 5] = [
    "The file operation has been carried out.",
    "The analysis is complete.",
    "Processing finished successfully.",
    "Happy to answer your question. Is there anything I can help with?",
    "Understood. Let me know if you need anything else.",
];

const HELP_TEXT: &str = "Available commands:

Files
- Create a file: \"create sample.txt\"
- Create a directory: \"create a documents folder\"
- Read a file: \"show me the contents of notes.md\"
- Edit a file: \"change the contents of notes.md\"
- Copy a file: \"copy report.txt to backup\"
- Move or rename a file: \"move draft.txt to archive\"
- Delete a file: \"delete old.log\"
- List files: \"list the files here\"

Batch operations
- \"delete every .tmp file\"
- \"copy all images into the images folder\"
- \"move the old files into archive\"

Web search
- \"search for the latest Rust release notes\"
- \"look up today's exchange rates\"";

/// The offline reply for `message`.
pub fn offline_reply(message: &str, context: Option<&Context>) -> OfflineReply {
    let category = FallbackCategory::classify(message);
    let message = match category {
        FallbackCategory::Help => HELP_TEXT.to_string(),
        FallbackCategory::Search => {
            "Running a web search. (Offline mode: check the search service connection.)".into()
        }
        FallbackCategory::Create => {
            "Creating the file or folder. (Offline mode: check the API connection.)".into()
        }
        FallbackCategory::Copy => "Copying the file. (Offline mode: check the API connection.)".into(),
        FallbackCategory::Move => "Moving the file. (Offline mode: check the API connection.)".into(),
        FallbackCategory::List => {
            let path = context.map_or(DEFAULT_CURRENT_PATH, |c| c.current_path.as_str());
            let count = context.map_or(0, |c| c.file_list.len());
            format!("Current directory: {path}\nFile count: {count}")
        }
        FallbackCategory::Generic => generic_reply().to_string(),
    };

    OfflineReply {
        category,
        message,
        commands: Vec::new(),
    }
}

/// Rotates through the generic replies by the current sub-second clock.
fn generic_reply() -> &'static str {
    let tick = Utc::now().timestamp_subsec_micros() as usize;
    GENERIC_REPLIES[tick % GENERIC_REPLIES.len()]
}
