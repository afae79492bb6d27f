//! Prompt construction for agent selection and agent execution.
//!
//! Templates use `{{VAR}}` placeholders:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{{CURRENT_PATH}}` | working directory |
//! | `{{FILE_COUNT}}` | number of entries in the file list |
//! | `{{FILE_LIST}}` | file list as pretty JSON |
//! | `{{HISTORY_COUNT}}` | exchanges in the history window |
//! | `{{CURRENT_FILE}}` | file being edited, or `none` |
//! | `{{CUSTOM_PROMPT_NAME}}` | name of the enabled custom prompt |
//! | `{{OPEN_FILE_INFO}}` | caller-supplied details about the open file |

use dirflow_core::context::Context;

use crate::registry::{AgentDescriptor, AgentRegistry};

const CONTEXT_BASIC: &str = "[Context]\n\
    Current directory: {{CURRENT_PATH}}\n\
    File count: {{FILE_COUNT}}\n\
    Currently editing: {{CURRENT_FILE}}";

const CONTEXT_WITH_CUSTOM_PROMPT: &str = "[Context]\n\
    Current directory: {{CURRENT_PATH}}\n\
    File count: {{FILE_COUNT}}\n\
    Currently editing: {{CURRENT_FILE}}\n\
    Custom prompt: {{CUSTOM_PROMPT_NAME}} (enabled)";

const CONTEXT_WITH_OPEN_FILE: &str = "[Context]\n\
    Current directory: {{CURRENT_PATH}}\n\
    File count: {{FILE_COUNT}}\n\
    Currently editing: {{CURRENT_FILE}}\n\n\
    [Open file details]\n\
    {{OPEN_FILE_INFO}}";

/// Substitute every known placeholder in `template`.
pub fn render(template: &str, context: &Context) -> String {
    let file_list = serde_json::to_string_pretty(&context.file_list).unwrap_or_default();
    let custom_prompt_name = context
        .active_custom_prompt()
        .map(|p| p.name.as_str())
        .unwrap_or("");

    template
        .replace("{{CURRENT_PATH}}", &context.current_path)
        .replace("{{FILE_COUNT}}", &context.file_list.len().to_string())
        .replace("{{FILE_LIST}}", &file_list)
        .replace(
            "{{HISTORY_COUNT}}",
            &context.conversation_history.len().to_string(),
        )
        .replace(
            "{{CURRENT_FILE}}",
            context.current_file.as_deref().unwrap_or("none"),
        )
        .replace("{{CUSTOM_PROMPT_NAME}}", custom_prompt_name)
        .replace(
            "{{OPEN_FILE_INFO}}",
            context.open_file_info.as_deref().unwrap_or(""),
        )
}

/// The context block appended to command-capable agents' prompts.
///
/// Open-file details win over the custom-prompt note.
pub fn context_info(context: &Context) -> String {
    let has_open_file = context
        .open_file_info
        .as_deref()
        .is_some_and(|info| !info.is_empty());

    let template = if has_open_file {
        CONTEXT_WITH_OPEN_FILE
    } else if context.active_custom_prompt().is_some() {
        CONTEXT_WITH_CUSTOM_PROMPT
    } else {
        CONTEXT_BASIC
    };
    render(template, context)
}

/// Full prompt for one agent.
///
/// An enabled custom prompt is prepended; command agents also get the
/// context block; the user message always comes last.
pub fn agent_prompt(agent: &AgentDescriptor, user_message: &str, context: &Context) -> String {
    let mut prompt = String::new();

    if let Some(custom) = context.active_custom_prompt()
        && !custom.content.trim().is_empty()
    {
        prompt.push_str(&render(&custom.content, context));
        prompt.push_str("\n\n");
    }

    prompt.push_str(&render(&agent.prompt_template, context));

    if !agent.is_general() {
        prompt.push_str("\n\n");
        prompt.push_str(&context_info(context));
    }

    prompt.push_str("\n\nUser request: ");
    prompt.push_str(user_message);
    prompt
}

/// Short prompt asking the model to name the agent that should answer.
pub fn selection_prompt(registry: &AgentRegistry, user_message: &str) -> String {
    let descriptions = registry
        .iter()
        .map(|a| format!("- {}: {} - {}", a.key, a.display_name, a.description))
        .collect::<Vec<_>>()
        .join("\n");
    let keys = registry.keys().join(", ");

    format!(
        "Decide which agent should handle the user's message.\n\
         The options are:\n\
         {descriptions}\n\n\
         Reply with only the key of the chosen agent ({keys}).\n\
         No other explanation.\n\n\
         User message: {user_message}\n\n\
         Selected agent:"
    )
}
