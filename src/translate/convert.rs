//! Conversion from UI chat messages to OpenAI chat-completion messages.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::translate::message::{ChatMessage, MessagePart, Role};

/// A message in the provider's (OpenAI) shape, one variant per role.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ProviderMessage {
    System {
        content: Content,
    },
    User {
        content: Content,
    },
    Assistant {
        content: Content,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        content: Content,
    },
}

/// Message content: a plain string or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// True for `""`, `"{}"` and an empty part list.
    pub fn is_blank(&self) -> bool {
        match self {
            Content::Text(text) => {
                let text = text.trim();
                text.is_empty() || text == "{}"
            }
            Content::Parts(parts) => parts.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// An assistant tool call replayed to the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

impl ToolCall {
    fn function(id: &str, name: &str, arguments: Option<&Value>) -> Self {
        Self {
            id: id.to_string(),
            kind: "function",
            function: FunctionCall {
                name: name.to_string(),
                arguments: encode_arguments(arguments),
            },
        }
    }
}

/// Translate the inbound conversation into provider messages.
///
/// Order is preserved. Tool results embedded in a message (tool parts with
/// output, legacy tool invocations with a result) are appended as separate
/// `tool` messages right after it, but only when the assistant message they
/// follow carries the matching call. A `tool` message with blank content and
/// no call id is dropped.
pub fn convert_messages(messages: &[ChatMessage]) -> Vec<ProviderMessage> {
    let mut out = Vec::with_capacity(messages.len());

    for message in messages {
        let mut content_parts = Vec::new();
        let mut tool_calls = Vec::new();
        let mut tool_results = Vec::new();

        match message.parts.as_deref() {
            Some(parts) if !parts.is_empty() => {
                for part in parts {
                    convert_part(part, &mut content_parts, &mut tool_calls, &mut tool_results);
                }
            }
            _ => {
                if let Some(text) = &message.content {
                    content_parts.push(ContentPart::Text { text: text.clone() });
                }
                for attachment in message.attachments.iter().flatten() {
                    content_parts.push(file_part(
                        attachment.content_type.as_deref(),
                        &attachment.url,
                    ));
                }
            }
        }

        for invocation in message.tool_invocations.iter().flatten() {
            tool_calls.push(ToolCall::function(
                &invocation.tool_call_id,
                &invocation.tool_name,
                invocation.args.as_ref(),
            ));
            if let Some(result) = &invocation.result {
                tool_results.push(tool_result(&invocation.tool_call_id, result));
            }
        }

        let content = collapse(content_parts);
        let converted = match message.role {
            Role::System => Some(ProviderMessage::System { content }),
            Role::User => Some(ProviderMessage::User { content }),
            Role::Assistant => Some(ProviderMessage::Assistant {
                content,
                tool_calls: std::mem::take(&mut tool_calls),
            }),
            Role::Tool if content.is_blank() && message.tool_call_id.is_none() => {
                debug!("Dropping empty tool message without a call id");
                None
            }
            Role::Tool => Some(ProviderMessage::Tool {
                tool_call_id: message.tool_call_id.clone(),
                content,
            }),
        };

        if !tool_calls.is_empty() {
            debug!(
                role = ?message.role,
                dropped = tool_calls.len(),
                "Ignoring tool calls on a non-assistant message"
            );
        }

        // The provider rejects a tool message whose call is not in the
        // preceding assistant message.
        let called: Vec<&str> = match &converted {
            Some(ProviderMessage::Assistant { tool_calls, .. }) => {
                tool_calls.iter().map(|call| call.id.as_str()).collect()
            }
            _ => Vec::new(),
        };
        let results = tool_results.len();
        tool_results.retain(|result| match result {
            ProviderMessage::Tool {
                tool_call_id: Some(id),
                ..
            } => called.contains(&id.as_str()),
            _ => false,
        });
        if tool_results.len() < results {
            debug!(
                role = ?message.role,
                dropped = results - tool_results.len(),
                "Ignoring tool results without a matching call"
            );
        }

        out.extend(converted);
        out.extend(tool_results);
    }

    out
}

fn convert_part(
    part: &MessagePart,
    content: &mut Vec<ContentPart>,
    tool_calls: &mut Vec<ToolCall>,
    tool_results: &mut Vec<ProviderMessage>,
) {
    match part.kind.as_str() {
        "text" => content.push(ContentPart::Text {
            text: part.text.clone().unwrap_or_default(),
        }),
        "file" => {
            if let Some(url) = &part.url {
                content.push(file_part(part.content_type.as_deref(), url));
            }
        }
        _ if part.is_tool() => {
            let (Some(call_id), Some(name)) = (part.tool_call_id.as_deref(), part.tool_name())
            else {
                return;
            };

            let arguments = part.input.as_ref().or(part.args.as_ref());
            let state_is_call = part
                .state
                .as_deref()
                .is_some_and(|s| s.contains("call") || s.contains("input") || s.contains("output"));
            if state_is_call || arguments.is_some() {
                tool_calls.push(ToolCall::function(call_id, name, arguments));
            }

            if part.state.as_deref() == Some("output-available") {
                if let Some(output) = &part.output {
                    tool_results.push(tool_result(call_id, output));
                }
            }
        }
        other => debug!(kind = other, "Skipping unsupported message part"),
    }
}

fn file_part(content_type: Option<&str>, url: &str) -> ContentPart {
    if content_type.is_some_and(|ct| ct.starts_with("image")) {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.to_string(),
            },
        }
    } else {
        ContentPart::Text {
            text: url.to_string(),
        }
    }
}

fn tool_result(call_id: &str, result: &Value) -> ProviderMessage {
    ProviderMessage::Tool {
        tool_call_id: Some(call_id.to_string()),
        content: Content::Text(result.to_string()),
    }
}

/// A lone text part becomes a plain string; nothing becomes `""`.
fn collapse(mut parts: Vec<ContentPart>) -> Content {
    match parts.len() {
        0 => Content::Text(String::new()),
        1 if matches!(parts[0], ContentPart::Text { .. }) => match parts.remove(0) {
            ContentPart::Text { text } => Content::Text(text),
            part => Content::Parts(vec![part]),
        },
        _ => Content::Parts(parts),
    }
}

/// Tool arguments travel as a JSON string; strings pass through untouched.
fn encode_arguments(arguments: Option<&Value>) -> String {
    match arguments {
        Some(Value::String(raw)) => raw.clone(),
        None | Some(Value::Null) => "{}".to_string(),
        Some(value) => value.to_string(),
    }
}
