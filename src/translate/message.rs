//! Inbound chat messages as sent by the chat UI.
//!
//! The UI sends either plain `content`, a list of typed `parts`, or the older
//! `experimental_attachments` / `toolInvocations` fields. Everything except
//! `role` is optional.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat role. Unknown roles fail deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// One message of the inbound conversation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub parts: Option<Vec<MessagePart>>,

    #[serde(default, rename = "experimental_attachments")]
    pub attachments: Option<Vec<Attachment>>,

    #[serde(default)]
    pub tool_invocations: Option<Vec<ToolInvocation>>,

    /// Call id for `tool` role messages.
    #[serde(default, alias = "tool_call_id")]
    pub tool_call_id: Option<String>,
}

/// A typed message part (`text`, `file`, `tool-<name>`, `dynamic-tool`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default, alias = "mediaType")]
    pub content_type: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub tool_call_id: Option<String>,

    #[serde(default)]
    pub tool_name: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub input: Option<Value>,

    #[serde(default)]
    pub output: Option<Value>,

    #[serde(default)]
    pub args: Option<Value>,
}

impl MessagePart {
    /// Tool name for `tool-*` and `dynamic-tool` parts, `None` for anything else.
    pub fn tool_name(&self) -> Option<&str> {
        if let Some(name) = self.tool_name.as_deref() {
            if self.is_tool() {
                return Some(name);
            }
        }
        self.kind.strip_prefix("tool-").filter(|name| !name.is_empty())
    }

    pub fn is_tool(&self) -> bool {
        self.kind.starts_with("tool-") || self.kind == "dynamic-tool"
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    pub url: String,
}

/// Legacy tool invocation record attached to an assistant message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub tool_name: String,

    #[serde(default)]
    pub args: Option<Value>,

    #[serde(default)]
    pub result: Option<Value>,

    #[serde(default)]
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_role_is_rejected() {
        let err = serde_json::from_str::<ChatMessage>(r#"{"content":"hi"}"#).unwrap_err();
        assert!(err.to_string().contains("role"));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(serde_json::from_str::<ChatMessage>(r#"{"role":"robot","content":"hi"}"#).is_err());
    }

    #[test]
    fn test_tool_call_id_accepts_both_spellings() {
        let a: ChatMessage =
            serde_json::from_str(r#"{"role":"tool","content":"1","toolCallId":"c1"}"#).unwrap();
        let b: ChatMessage =
            serde_json::from_str(r#"{"role":"tool","content":"1","tool_call_id":"c1"}"#).unwrap();
        assert_eq!(a.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(b.tool_call_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_tool_part_name_resolution() {
        let part: MessagePart =
            serde_json::from_str(r#"{"type":"tool-get_current_weather","toolCallId":"c1"}"#)
                .unwrap();
        assert_eq!(part.tool_name(), Some("get_current_weather"));

        let part: MessagePart =
            serde_json::from_str(r#"{"type":"dynamic-tool","toolName":"lookup"}"#).unwrap();
        assert_eq!(part.tool_name(), Some("lookup"));

        let part: MessagePart = serde_json::from_str(r#"{"type":"text","text":"x"}"#).unwrap();
        assert_eq!(part.tool_name(), None);
    }
}
