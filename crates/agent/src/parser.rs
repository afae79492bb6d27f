//! Completion parsing: turns a command agent's raw reply into candidates.
//!
//! The reply is classified once into a [`ParsedCompletion`]; callers match
//! on the variant instead of probing JSON shapes themselves. Candidates are
//! still untrusted and must go through the validator.

use serde_json::Value;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Shape of a command agent's reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCompletion {
    /// A single object with an `action` field.
    SingleCommand {
        command: Value,
        message: Option<String>,
    },
    /// A bare list, or an object with a `commands` list.
    CommandList {
        commands: Vec<Value>,
        message: Option<String>,
    },
    /// An object with only a `message`.
    MessageOnly { message: String },
    /// Not decodable, or decodable into an unexpected shape.
    Unrecognized { reason: String },
}

impl ParsedCompletion {
    pub fn succeeded(&self) -> bool {
        !matches!(self, ParsedCompletion::Unrecognized { .. })
    }

    /// Split into candidate commands and the model's own message.
    pub fn into_parts(self) -> (Vec<Value>, Option<String>) {
        match self {
            ParsedCompletion::SingleCommand { command, message } => (vec![command], message),
            ParsedCompletion::CommandList { commands, message } => (commands, message),
            ParsedCompletion::MessageOnly { message } => (Vec::new(), Some(message)),
            ParsedCompletion::Unrecognized { .. } => (Vec::new(), None),
        }
    }
}

/// Interior of a ```` ```json ```` fence if there is one, else the trimmed reply.
///
/// The closing fence is the last one in the reply, so fences nested inside
/// string values survive.
pub fn extract_json_block(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(open) = trimmed.find(JSON_FENCE) {
        let start = open + JSON_FENCE.len();
        if let Some(end) = trimmed.rfind(FENCE)
            && end > start
        {
            return trimmed[start..end].trim();
        }
    }
    trimmed
}

pub fn parse_completion(raw: &str) -> ParsedCompletion {
    let body = extract_json_block(raw);

    let decoded: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return ParsedCompletion::Unrecognized {
                reason: format!("completion is not valid JSON: {e}"),
            };
        }
    };

    match decoded {
        Value::Object(mut map) => {
            let message = map.remove("message").and_then(message_text);

            if map.contains_key("action") {
                return ParsedCompletion::SingleCommand {
                    command: Value::Object(map),
                    message,
                };
            }

            if let Some(Value::Array(commands)) = map.remove("commands") {
                return ParsedCompletion::CommandList { commands, message };
            }

            match message {
                Some(message) => ParsedCompletion::MessageOnly { message },
                None => ParsedCompletion::Unrecognized {
                    reason: "JSON object has no action, commands or message".into(),
                },
            }
        }
        Value::Array(commands) => ParsedCompletion::CommandList {
            commands,
            message: None,
        },
        other => ParsedCompletion::Unrecognized {
            reason: format!(
                "completion is valid JSON but neither an object nor a list: {}",
                json_kind(&other)
            ),
        },
    }
}

fn message_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_single_command() {
        let raw = "```json\n{\"action\":\"create_file\",\"path\":\"t.txt\",\"content\":\"hi\"}\n```";
        let parsed = parse_completion(raw);
        assert!(parsed.succeeded());
        assert_eq!(
            parsed,
            ParsedCompletion::SingleCommand {
                command: json!({"action": "create_file", "path": "t.txt", "content": "hi"}),
                message: None,
            }
        );
    }

    #[test]
    fn fence_with_surrounding_prose() {
        let raw = "Sure, here you go:\n```json\n[{\"action\":\"list_files\"}]\n```\nAnything else?";
        let (commands, _) = parse_completion(raw).into_parts();
        assert_eq!(commands, vec![json!({"action": "list_files"})]);
    }

    #[test]
    fn unclosed_fence_falls_back_to_whole_reply() {
        assert_eq!(extract_json_block("```json\n{}"), "```json\n{}");
    }

    #[test]
    fn bare_list_and_commands_field() {
        let list = parse_completion(r#"[{"action":"read_file","path":"a"},{"action":"read_file","path":"b"}]"#);
        assert_eq!(list.into_parts().0.len(), 2);

        let wrapped = parse_completion(
            r#"{"commands":[{"action":"list_files"}],"message":"Listing now"}"#,
        );
        assert_eq!(
            wrapped,
            ParsedCompletion::CommandList {
                commands: vec![json!({"action": "list_files"})],
                message: Some("Listing now".into()),
            }
        );
    }

    #[test]
    fn message_is_stripped_from_single_command() {
        match parse_completion(r#"{"action":"delete_file","path":"x","message":"Deleting x"}"#) {
            ParsedCompletion::SingleCommand { command, message } => {
                assert!(command.get("message").is_none());
                assert_eq!(message.as_deref(), Some("Deleting x"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn message_only_is_a_success() {
        let parsed = parse_completion(r#"{"message":"Which file do you mean?"}"#);
        assert!(parsed.succeeded());
        assert_eq!(parsed.into_parts(), (vec![], Some("Which file do you mean?".into())));
    }

    #[test]
    fn plain_text_is_unrecognized() {
        let parsed = parse_completion("not json at all");
        assert!(!parsed.succeeded());
        assert!(matches!(parsed, ParsedCompletion::Unrecognized { .. }));
    }

    #[test]
    fn scalar_and_shapeless_objects_are_unrecognized() {
        assert!(!parse_completion("42").succeeded());
        assert!(!parse_completion(r#""text""#).succeeded());
        assert!(!parse_completion(r#"{"foo":1}"#).succeeded());
        assert!(!parse_completion(r#"{"commands":"nope"}"#).succeeded());
    }
}
