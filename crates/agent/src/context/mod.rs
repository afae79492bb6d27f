//! Conversation context manager.
//!
//! Accepts whatever context blob the caller sends, overlays it onto fixed
//! defaults and returns a bounded, normalized [`Context`]:
//!
//! | Field | Treatment |
//! |-------|-----------|
//! | `currentPath` | non-empty string, else the configured default |
//! | `fileList` | trimmed non-empty strings, capped |
//! | `conversationHistory` | windowed, length-trimmed, deduplicated, incomplete entries dropped |
//! | `customPrompt` | normalized to a fixed shape, or dropped if not an object |
//! | `metadata` | recomputed |
//!
//! Malformed fields fall back to defaults instead of failing the request.

pub mod history;

use chrono::{DateTime, Utc};
use dirflow_config::{ContextConfig, MAX_HISTORY_ITEMS_LIMIT, MAX_HISTORY_LENGTH_LIMIT};
use dirflow_core::context::{Context, ContextMetadata, CustomPrompt, Exchange, history_chars};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_entries: usize,
    pub total_length: usize,
    pub should_suggest_new_chat: bool,
    pub oldest_entry: Option<String>,
    pub newest_entry: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextManagerStatus {
    pub max_history_items: usize,
    pub max_history_length: usize,
    pub default_current_path: String,
    pub max_file_list: usize,
    pub is_healthy: bool,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ContextManager {
    max_history_items: usize,
    max_history_length: usize,
    default_current_path: String,
    max_file_list: usize,
}

impl ContextManager {
    pub fn new(config: &ContextConfig) -> Self {
        let mut manager = Self {
            max_history_items: 1,
            max_history_length: 1,
            default_current_path: config.default_current_path.clone(),
            max_file_list: config.max_file_list,
        };
        manager.update_limits(
            Some(config.max_history_items),
            Some(config.max_history_length),
        );
        manager
    }

    /// Normalize a caller-supplied context. Never fails.
    pub fn prepare_context(&self, raw: &Value) -> Context {
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);

        let current_path = string_field(obj, "currentPath")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.default_current_path.clone());

        let history = obj
            .get("conversationHistory")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(exchange_from_value).collect())
            .unwrap_or_default();

        let mut context = Context {
            current_path,
            file_list: self.normalize_file_list(obj.get("fileList")),
            current_file: string_field(obj, "currentFile"),
            open_file_info: string_field(obj, "openFileInfo"),
            conversation_history: self.optimize_history(history),
            custom_prompt: obj.get("customPrompt").and_then(custom_prompt_from_value),
            provider: string_field(obj, "provider"),
            model: string_field(obj, "model"),
            agent_selection_model: string_field(obj, "agentSelectionModel"),
            metadata: None,
        };
        context.metadata = Some(metadata(&context));

        debug!(
            history = context.conversation_history.len(),
            files = context.file_list.len(),
            "Context prepared"
        );
        context
    }

    /// Advisory only: the history is long, large, or the user changed topic.
    pub fn should_suggest_new_chat(&self, context: &Context) -> bool {
        let history = &context.conversation_history;
        history.len() >= self.max_history_items
            || history_chars(history) >= self.max_history_length
            || history::topic_switched(history)
    }

    pub fn optimize_history(&self, history: Vec<Exchange>) -> Vec<Exchange> {
        history::optimize(history, self.max_history_items, self.max_history_length)
    }

    /// Append an exchange stamped with the current time, then re-shape the history.
    pub fn add_history_entry(&self, context: &mut Context, user: &str, ai: &str) {
        let mut history = std::mem::take(&mut context.conversation_history);
        history.push(Exchange {
            user: user.to_string(),
            ai: Some(ai.to_string()),
            timestamp: Some(Utc::now().to_rfc3339()),
        });
        context.conversation_history = self.optimize_history(history);
        context.metadata = Some(metadata(context));
    }

    pub fn clear_history(&self, context: &mut Context) {
        context.conversation_history.clear();
        context.metadata = Some(metadata(context));
    }

    pub fn history_stats(&self, context: &Context) -> HistoryStats {
        let history = &context.conversation_history;
        HistoryStats {
            total_entries: history.len(),
            total_length: history_chars(history),
            should_suggest_new_chat: self.should_suggest_new_chat(context),
            oldest_entry: history.first().and_then(|e| e.timestamp.clone()),
            newest_entry: history.last().and_then(|e| e.timestamp.clone()),
        }
    }

    /// Change the history limits. Zero is ignored; values above the hard
    /// caps are clamped.
    pub fn update_limits(&mut self, max_items: Option<usize>, max_length: Option<usize>) {
        if let Some(items) = max_items.filter(|&n| n > 0) {
            self.max_history_items = items.min(MAX_HISTORY_ITEMS_LIMIT);
        }
        if let Some(length) = max_length.filter(|&n| n > 0) {
            self.max_history_length = length.min(MAX_HISTORY_LENGTH_LIMIT);
        }
    }

    pub fn max_history_items(&self) -> usize {
        self.max_history_items
    }

    pub fn max_history_length(&self) -> usize {
        self.max_history_length
    }

    pub fn status(&self) -> ContextManagerStatus {
        ContextManagerStatus {
            max_history_items: self.max_history_items,
            max_history_length: self.max_history_length,
            default_current_path: self.default_current_path.clone(),
            max_file_list: self.max_file_list,
            is_healthy: true,
            last_activity: Utc::now(),
        }
    }

    fn normalize_file_list(&self, value: Option<&Value>) -> Vec<String> {
        let Some(items) = value.and_then(Value::as_array) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .take(self.max_file_list)
            .map(String::from)
            .collect()
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(&ContextConfig::default())
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

/// Non-object entries are skipped; a non-string `user` counts as empty and
/// is dropped later as incomplete.
fn exchange_from_value(value: &Value) -> Option<Exchange> {
    let obj = value.as_object()?;
    Some(Exchange {
        user: string_field(obj, "user").unwrap_or_default(),
        ai: string_field(obj, "ai"),
        timestamp: string_field(obj, "timestamp"),
    })
}

fn custom_prompt_from_value(value: &Value) -> Option<CustomPrompt> {
    let obj = value.as_object()?;
    let defaults = CustomPrompt::default();
    Some(CustomPrompt {
        enabled: obj.get("enabled").is_some_and(truthy),
        name: string_field(obj, "name").unwrap_or(defaults.name),
        content: string_field(obj, "content").unwrap_or(defaults.content),
        description: string_field(obj, "description").unwrap_or(defaults.description),
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn metadata(context: &Context) -> ContextMetadata {
    ContextMetadata {
        timestamp: Utc::now(),
        history_count: context.conversation_history.len(),
        file_count: context.file_list.len(),
        has_custom_prompt: context.active_custom_prompt().is_some(),
        has_open_file: context.current_file.is_some(),
        context_size: context_size(context),
    }
}

/// Approximate character footprint of everything the prompt may include.
fn context_size(context: &Context) -> usize {
    let chars = |s: Option<&str>| s.map_or(0, |s| s.chars().count());
    let file_list = serde_json::to_string(&context.file_list).map_or(0, |s| s.chars().count());
    let prompt = context.custom_prompt.as_ref().map_or(0, |p| {
        p.name.chars().count() + p.content.chars().count() + p.description.chars().count()
    });

    context.current_path.chars().count()
        + file_list
        + chars(context.current_file.as_deref())
        + chars(context.open_file_info.as_deref())
        + context.history_chars()
        + prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn history(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| json!({"user": format!("message {i}"), "ai": format!("reply {i}")}))
                .collect(),
        )
    }

    #[test]
    fn empty_input_gets_defaults() {
        let ctx = ContextManager::default().prepare_context(&json!({}));
        assert_eq!(ctx.current_path, "/workspace");
        assert!(ctx.file_list.is_empty());
        assert!(ctx.current_file.is_none());
        assert!(ctx.custom_prompt.is_none());
        assert_eq!(ctx.metadata.unwrap().history_count, 0);
    }

    #[test]
    fn non_object_input_gets_defaults() {
        let ctx = ContextManager::default().prepare_context(&json!("garbage"));
        assert_eq!(ctx.current_path, "/workspace");
    }

    #[test]
    fn caller_fields_overlay_defaults() {
        let ctx = ContextManager::default().prepare_context(&json!({
            "currentPath": "/workspace/src",
            "currentFile": "main.rs",
            "openFileInfo": "main.rs (42 lines)",
            "provider": "claude",
            "agentSelectionModel": "claude-3-haiku-20240307"
        }));
        assert_eq!(ctx.current_path, "/workspace/src");
        assert_eq!(ctx.current_file.as_deref(), Some("main.rs"));
        assert_eq!(ctx.provider.as_deref(), Some("claude"));
        assert_eq!(ctx.agent_selection_model.as_deref(), Some("claude-3-haiku-20240307"));
        assert!(ctx.metadata.unwrap().has_open_file);
    }

    #[test]
    fn history_windowed_to_last_fifteen() {
        let ctx = ContextManager::default()
            .prepare_context(&json!({ "conversationHistory": history(20) }));
        let h = &ctx.conversation_history;
        assert_eq!(h.len(), 15);
        assert_eq!(h[0].user, "message 5");
        assert_eq!(h[14].user, "message 19");
    }

    #[test]
    fn identical_exchanges_collapse() {
        let ctx = ContextManager::default().prepare_context(&json!({
            "conversationHistory": [{"user": "x", "ai": "yes"}, {"user": "x", "ai": "yes"}]
        }));
        assert_eq!(ctx.conversation_history.len(), 1);
    }

    #[test]
    fn deduplicated_short_reply_is_still_incomplete() {
        // Dedup keeps one {x, y}; the incompleteness pass then drops it.
        let ctx = ContextManager::default().prepare_context(&json!({
            "conversationHistory": [{"user": "x", "ai": "y"}, {"user": "x", "ai": "y"}]
        }));
        assert!(ctx.conversation_history.is_empty());
    }

    #[test]
    fn malformed_history_entries_skipped() {
        let ctx = ContextManager::default().prepare_context(&json!({
            "conversationHistory": [42, {"user": 7, "ai": "whatever"}, {"user": "ok", "ai": null}]
        }));
        assert_eq!(ctx.conversation_history, vec![Exchange::new("ok", None)]);
    }

    #[test]
    fn history_not_a_list_is_empty() {
        let ctx = ContextManager::default()
            .prepare_context(&json!({ "conversationHistory": {"user": "x"} }));
        assert!(ctx.conversation_history.is_empty());
    }

    #[test]
    fn history_trimmed_to_character_budget() {
        let mut manager = ContextManager::default();
        manager.update_limits(None, Some(30));
        let ctx = manager.prepare_context(&json!({
            "conversationHistory": [
                {"user": "first question", "ai": "first answer"},
                {"user": "second q", "ai": "second a"}
            ]
        }));
        assert_eq!(ctx.conversation_history.len(), 1);
        assert_eq!(ctx.conversation_history[0].user, "second q");
    }

    #[test]
    fn file_list_normalized_and_capped() {
        let ctx = ContextManager::default().prepare_context(&json!({
            "fileList": ["  a.txt ", "", "   ", 5, "b/c.md"]
        }));
        assert_eq!(ctx.file_list, vec!["a.txt", "b/c.md"]);

        let many: Vec<String> = (0..1200).map(|i| format!("f{i}")).collect();
        let ctx = ContextManager::default().prepare_context(&json!({ "fileList": many }));
        assert_eq!(ctx.file_list.len(), 1000);
        assert_eq!(ctx.file_list[999], "f999");
    }

    #[test]
    fn custom_prompt_normalized() {
        let ctx = ContextManager::default().prepare_context(&json!({
            "customPrompt": {"enabled": 1, "content": "Be brief."}
        }));
        let prompt = ctx.custom_prompt.unwrap();
        assert!(prompt.enabled);
        assert_eq!(prompt.name, "Unknown");
        assert_eq!(prompt.content, "Be brief.");
        assert_eq!(prompt.description, "");

        let ctx = ContextManager::default().prepare_context(&json!({ "customPrompt": "nope" }));
        assert!(ctx.custom_prompt.is_none());
    }

    #[test]
    fn metadata_counts() {
        let ctx = ContextManager::default().prepare_context(&json!({
            "fileList": ["a", "b"],
            "conversationHistory": history(2),
            "customPrompt": {"enabled": true, "name": "Terse"}
        }));
        let meta = ctx.metadata.unwrap();
        assert_eq!(meta.file_count, 2);
        assert_eq!(meta.history_count, 2);
        assert!(meta.has_custom_prompt);
        assert!(!meta.has_open_file);
        assert!(meta.context_size > 0);
    }

    #[test]
    fn suggests_new_chat_when_full() {
        let manager = ContextManager::default();
        let ctx = manager.prepare_context(&json!({ "conversationHistory": history(15) }));
        assert!(manager.should_suggest_new_chat(&ctx));

        let ctx = manager.prepare_context(&json!({ "conversationHistory": history(4) }));
        assert!(!manager.should_suggest_new_chat(&ctx));
    }

    #[test]
    fn suggests_new_chat_on_topic_switch() {
        let manager = ContextManager::default();
        let mut ctx = manager.prepare_context(&json!({ "conversationHistory": history(2) }));
        manager.add_history_entry(&mut ctx, "Can you help with something new?", "Of course.");
        assert!(manager.should_suggest_new_chat(&ctx));
    }

    #[test]
    fn add_and_clear_history() {
        let manager = ContextManager::default();
        let mut ctx = manager.prepare_context(&json!({}));
        manager.add_history_entry(&mut ctx, "hello", "hi there");
        manager.add_history_entry(&mut ctx, "hello", "hi there");

        let stats = manager.history_stats(&ctx);
        assert_eq!(stats.total_entries, 1);
        assert!(stats.oldest_entry.is_some());
        assert_eq!(ctx.metadata.as_ref().unwrap().history_count, 1);

        manager.clear_history(&mut ctx);
        let stats = manager.history_stats(&ctx);
        assert_eq!(stats.total_entries, 0);
        assert!(stats.newest_entry.is_none());
    }

    #[test]
    fn limits_are_clamped() {
        let mut manager = ContextManager::default();
        manager.update_limits(Some(500), Some(1_000_000));
        assert_eq!(manager.max_history_items(), 50);
        assert_eq!(manager.max_history_length(), 50_000);

        manager.update_limits(Some(0), None);
        assert_eq!(manager.max_history_items(), 50);

        let status = manager.status();
        assert!(status.is_healthy);
        assert_eq!(status.max_file_list, 1000);
    }
}
