//! Agent registry: the fixed set of handlers a request can be routed to.
//!
//! Built once at startup and shared read-only behind an `Arc`. Exactly one
//! agent is "general": it has no capabilities and its replies are never
//! parsed for commands.

use std::sync::Arc;

use dirflow_core::command::ActionName;
use dirflow_core::error::{Error, Result};
use serde::Serialize;

pub const FILE_EXPERT: &str = "file_expert";
pub const WEB_SEARCH_EXPERT: &str = "web_search_expert";
pub const GENERAL_ASSISTANT: &str = "general_assistant";

/// A named handler with a capability set and prompt template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub key: String,
    pub display_name: String,
    pub description: String,
    pub capabilities: Vec<ActionName>,

    /// Prompt template; `{{VAR}}` placeholders are filled from the context.
    #[serde(skip)]
    pub prompt_template: String,

    /// Substrings in a selection reply that route to this agent.
    #[serde(skip)]
    pub selection_keywords: Vec<String>,
}

impl AgentDescriptor {
    pub fn is_general(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<Arc<AgentDescriptor>>,
    general: usize,
}

impl AgentRegistry {
    /// Build a registry. Fails unless exactly one agent is general and all
    /// keys are distinct.
    pub fn new(agents: Vec<AgentDescriptor>) -> Result<Self> {
        let generals: Vec<usize> = agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_general())
            .map(|(i, _)| i)
            .collect();

        let &[general] = generals.as_slice() else {
            return Err(Error::Config {
                message: format!(
                    "agent registry needs exactly one general agent, found {}",
                    generals.len()
                ),
            });
        };

        for (i, agent) in agents.iter().enumerate() {
            if agents[..i].iter().any(|a| a.key == agent.key) {
                return Err(Error::Config {
                    message: format!("duplicate agent key '{}'", agent.key),
                });
            }
        }

        Ok(Self {
            agents: agents.into_iter().map(Arc::new).collect(),
            general,
        })
    }

    /// The three built-in agents: file operations, web search, general chat.
    pub fn builtin() -> Self {
        let general = 2;
        Self {
            agents: vec![
                Arc::new(file_expert()),
                Arc::new(web_search_expert()),
                Arc::new(general_assistant()),
            ],
            general,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Arc<AgentDescriptor>> {
        self.agents.iter().find(|a| a.key == key)
    }

    pub fn general(&self) -> &Arc<AgentDescriptor> {
        &self.agents[self.general]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AgentDescriptor>> {
        self.agents.iter()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Map a free-text selection reply to an agent.
    ///
    /// Exact key match (case-insensitive) first, then keyword containment in
    /// registry order, then the general agent.
    pub fn resolve(&self, reply: &str) -> &Arc<AgentDescriptor> {
        let reply = reply.trim().to_lowercase();

        if let Some(agent) = self.agents.iter().find(|a| a.key.eq_ignore_ascii_case(&reply)) {
            return agent;
        }

        self.agents
            .iter()
            .filter(|a| !a.is_general())
            .find(|a| {
                a.selection_keywords
                    .iter()
                    .any(|k| reply.contains(&k.to_lowercase()))
            })
            .unwrap_or_else(|| self.general())
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn file_expert() -> AgentDescriptor {
    AgentDescriptor {
        key: FILE_EXPERT.into(),
        display_name: "File Operations Expert".into(),
        description: "Creates, reads, edits, deletes, copies, moves and lists files and \
                      directories, including batch operations."
            .into(),
        capabilities: ActionName::ALL
            .into_iter()
            .filter(|a| !a.is_search())
            .collect(),
        prompt_template: FILE_EXPERT_PROMPT.into(),
        selection_keywords: vec!["file".into(), "ファイル".into()],
    }
}

fn web_search_expert() -> AgentDescriptor {
    AgentDescriptor {
        key: WEB_SEARCH_EXPERT.into(),
        display_name: "Web Search Expert".into(),
        description: "Searches the internet to gather information that answers the \
                      user's question."
            .into(),
        capabilities: vec![ActionName::WebSearch],
        prompt_template: WEB_SEARCH_EXPERT_PROMPT.into(),
        selection_keywords: vec!["search".into(), "検索".into(), "web".into()],
    }
}

fn general_assistant() -> AgentDescriptor {
    AgentDescriptor {
        key: GENERAL_ASSISTANT.into(),
        display_name: "General Assistant".into(),
        description: "Handles general questions and conversation that the expert agents \
                      do not cover."
            .into(),
        capabilities: Vec::new(),
        prompt_template: GENERAL_ASSISTANT_PROMPT.into(),
        selection_keywords: Vec::new(),
    }
}

const FILE_EXPERT_PROMPT: &str = r#"You are a file operations expert. Turn the user's instructions into filesystem commands in JSON.
Available commands:
- create_file: create a file. Example: {"action": "create_file", "path": "path/to/file.txt", "content": "file contents"}
- create_directory: create a directory. Example: {"action": "create_directory", "path": "path/to/directory"}
- delete_file: delete a file. Example: {"action": "delete_file", "path": "path/to/file.txt"}
- copy_file: copy a file. Example: {"action": "copy_file", "source": "path/to/source.txt", "destination": "path/to/destination.txt"}
- move_file: move or rename a file. Example: {"action": "move_file", "source": "path/to/old_name.txt", "destination": "path/to/new_name.txt"}
- read_file: read a file. Example: {"action": "read_file", "path": "path/to/file.txt"}
- edit_file: replace a file's contents. Example: {"action": "edit_file", "path": "path/to/file.txt", "content": "new contents"}
- list_files: list a directory. Example: {"action": "list_files", "path": "path/to/directory"}
- batch_delete: delete several files. Example: {"action": "batch_delete", "paths": ["path/to/file1.txt", "path/to/file2.txt"]}
- batch_copy: copy several files. Example: {"action": "batch_copy", "sources": ["path/to/file1.txt", "path/to/file2.txt"], "destination": "path/to/directory"}
- batch_move: move several files. Example: {"action": "batch_move", "sources": ["path/to/file1.txt", "path/to/file2.txt"], "destination": "path/to/directory"}

Produce one or more commands that carry out the instruction exactly.
When several commands are needed, return them as a JSON array.
Example: [{"action": "create_directory", "path": "new_dir"}, {"action": "create_file", "path": "new_dir/file.txt", "content": "Hello"}]
When generating file contents, write the actual contents.
The current working directory is {{CURRENT_PATH}}. Use relative paths.
"#;

const WEB_SEARCH_EXPERT_PROMPT: &str = r#"You are a web search expert. Turn the user's question into a web search command in JSON.
Available commands:
- web_search: run a web search. Example: {"action": "web_search", "query": "search terms", "options": {"maxResults": 5, "provider": "auto"}}
  - options:
    - maxResults: maximum number of results (1-20, default 10)
    - provider: search provider ('auto', 'tavily', 'google', 'duckduckgo', default 'auto')
    - language: result language (ISO 639-1 code, e.g. 'ja', 'en')
    - region: result region (ISO 3166-1 alpha-2 code, e.g. 'JP', 'US')
    - filterDomains: only search these domains (list)
    - excludeDomains: skip these domains (list)

Produce exactly one command with the best query and options for the request.
Example: {"action": "web_search", "query": "latest AI technology trends", "options": {"maxResults": 3, "language": "en"}}
"#;

const GENERAL_ASSISTANT_PROMPT: &str = r#"You are a helpful, capable general-purpose assistant.
Answer the user's questions and hold a conversation, giving the most useful information you can.
If the request needs file operations or a web search, say so and ask for specifics.
Example: "To create a file, could you tell me the file name and its contents?"
Example: "To search the web, what exactly would you like to find out?"
"#;
