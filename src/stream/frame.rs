//! Wire framing for the client-facing stream.
//!
//! - `data` is the AI SDK data stream protocol: one `<tag>:<json>\n` line
//!   per event.
//! - `ui-message` is the AI SDK UI message stream: SSE `data: {json}` events
//!   with a `type` field, closed by `data: [DONE]`.
//! - `text` writes raw text deltas and nothing else.

use std::str::FromStr;

use bytes::Bytes;
use serde_json::{json, Value};

use crate::error::RelayError;
use crate::stream::event::StreamEvent;

/// Tags used by the `data` protocol.
pub mod tag {
    pub const TEXT: char = '0';
    pub const TOOL_CALL: char = '9';
    pub const TOOL_RESULT: char = 'a';
    pub const TOOL_CALL_START: char = 'b';
    pub const TOOL_CALL_DELTA: char = 'c';
    pub const ERROR: char = '3';
    pub const FINISH: char = 'd';

    pub const ALL: [char; 7] = [
        TEXT,
        TOOL_CALL,
        TOOL_RESULT,
        TOOL_CALL_START,
        TOOL_CALL_DELTA,
        ERROR,
        FINISH,
    ];
}

/// Output protocol selected by the `protocol` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Data,
    UiMessage,
    Text,
}

impl FromStr for Protocol {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(Protocol::Data),
            "ui-message" => Ok(Protocol::UiMessage),
            "text" => Ok(Protocol::Text),
            other => Err(RelayError::UnsupportedProtocol(other.to_string())),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Data => write!(f, "data"),
            Protocol::UiMessage => write!(f, "ui-message"),
            Protocol::Text => write!(f, "text"),
        }
    }
}

impl Protocol {
    /// Extra response header announcing the stream format, if any.
    pub fn stream_header(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Protocol::Data => Some(("x-vercel-ai-data-stream", "v1")),
            Protocol::UiMessage => Some(("x-vercel-ai-ui-message-stream", "v1")),
            Protocol::Text => None,
        }
    }
}

/// Per-response event serializer.
///
/// `data` and `text` frames depend only on the event. The UI message stream
/// opens the message on the first event and wraps consecutive text deltas in
/// a `text-start`/`text-end` pair, so it tracks the open text part.
#[derive(Debug)]
pub struct FrameEncoder {
    protocol: Protocol,
    message_id: String,
    started: bool,
    open_text: Option<String>,
    text_parts: usize,
}

impl FrameEncoder {
    pub fn new(protocol: Protocol, message_id: impl Into<String>) -> Self {
        Self {
            protocol,
            message_id: message_id.into(),
            started: false,
            open_text: None,
            text_parts: 0,
        }
    }

    /// Frames for one event, possibly none.
    pub fn encode(&mut self, event: &StreamEvent) -> Vec<Bytes> {
        match self.protocol {
            Protocol::Data => vec![encode_data(event)],
            Protocol::Text => match event {
                StreamEvent::TextDelta(text) => vec![Bytes::from(text.clone())],
                _ => Vec::new(),
            },
            Protocol::UiMessage => self.encode_ui(event),
        }
    }

    fn encode_ui(&mut self, event: &StreamEvent) -> Vec<Bytes> {
        let mut frames = Vec::new();

        if !self.started {
            self.started = true;
            frames.push(sse(&json!({ "type": "start", "messageId": self.message_id })));
        }

        if let StreamEvent::TextDelta(delta) = event {
            let id = match &self.open_text {
                Some(id) => id.clone(),
                None => {
                    let id = format!("text-{}", self.text_parts);
                    self.text_parts += 1;
                    frames.push(sse(&json!({ "type": "text-start", "id": id })));
                    self.open_text = Some(id.clone());
                    id
                }
            };
            frames.push(sse(&json!({ "type": "text-delta", "id": id, "delta": delta })));
            return frames;
        }

        if let Some(id) = self.open_text.take() {
            frames.push(sse(&json!({ "type": "text-end", "id": id })));
        }

        let chunk = match event {
            StreamEvent::TextDelta(_) => return frames,
            StreamEvent::ToolCallStart { id, name } => json!({
                "type": "tool-input-start",
                "toolCallId": id,
                "toolName": name,
            }),
            StreamEvent::ToolCallDelta {
                id, args_fragment, ..
            } => json!({
                "type": "tool-input-delta",
                "toolCallId": id,
                "inputTextDelta": args_fragment,
            }),
            StreamEvent::ToolCall { id, name, args } => json!({
                "type": "tool-input-available",
                "toolCallId": id,
                "toolName": name,
                "input": args,
            }),
            StreamEvent::ToolResult { id, result } => json!({
                "type": "tool-output-available",
                "toolCallId": id,
                "output": result,
            }),
            StreamEvent::Finish { .. } => json!({ "type": "finish" }),
            StreamEvent::Error(message) => json!({ "type": "error", "errorText": message }),
        };
        frames.push(sse(&chunk));

        if event.is_terminal() {
            frames.push(Bytes::from_static(b"data: [DONE]\n\n"));
        }
        frames
    }
}

fn sse(chunk: &Value) -> Bytes {
    Bytes::from(format!("data: {chunk}\n\n"))
}

fn encode_data(event: &StreamEvent) -> Bytes {
    let (prefix, payload) = match event {
        StreamEvent::TextDelta(text) => (tag::TEXT, json!(text)),
        StreamEvent::ToolCallStart { id, name } => (
            tag::TOOL_CALL_START,
            json!({ "toolCallId": id, "toolName": name }),
        ),
        StreamEvent::ToolCallDelta {
            id, args_fragment, ..
        } => (
            tag::TOOL_CALL_DELTA,
            json!({ "toolCallId": id, "argsTextDelta": args_fragment }),
        ),
        StreamEvent::ToolCall { id, name, args } => (
            tag::TOOL_CALL,
            json!({ "toolCallId": id, "toolName": name, "args": args }),
        ),
        StreamEvent::ToolResult { id, result } => (
            tag::TOOL_RESULT,
            json!({ "toolCallId": id, "result": result }),
        ),
        StreamEvent::Finish { reason, usage } => (
            tag::FINISH,
            json!({ "finishReason": reason, "usage": usage }),
        ),
        StreamEvent::Error(message) => (tag::ERROR, Value::String(message.clone())),
    };
    Bytes::from(format!("{prefix}:{payload}\n"))
}
