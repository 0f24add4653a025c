//! Client-facing stream events and the decoder that derives them from
//! provider chunks.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::upstream::chunk::{CompletionChunk, ToolCallFragment};

/// One unit of client-facing output.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Generated text.
    TextDelta(String),

    /// The model started a tool call.
    ToolCallStart { id: String, name: String },

    /// More argument text for a started tool call.
    ToolCallDelta {
        id: String,
        name: String,
        args_fragment: String,
    },

    /// A fully assembled tool call.
    ToolCall { id: String, name: String, args: Value },

    /// Output of a tool executed by the relay.
    ToolResult { id: String, result: Value },

    /// Terminal: the provider finished.
    Finish { reason: String, usage: Usage },

    /// Terminal: the upstream stream failed.
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Finish { .. } | StreamEvent::Error(_))
    }
}

/// Token usage as reported by the provider (zero when it reports nothing).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A tool call assembled from its fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledToolCall {
    pub id: String,
    pub name: String,
    /// Concatenated raw argument text.
    pub arguments: String,
}

impl AssembledToolCall {
    /// Arguments as JSON. Unparsable text is kept as a JSON string; empty
    /// text becomes `{}`.
    pub fn args(&self) -> Value {
        if self.arguments.trim().is_empty() {
            return Value::Object(Default::default());
        }
        serde_json::from_str(&self.arguments)
            .unwrap_or_else(|_| Value::String(self.arguments.clone()))
    }
}

/// Stateful chunk → event decoder for a single response.
///
/// Tracks tool calls in arrival order, the last finish reason and the
/// reported usage. Chunks with nothing to show produce no events.
///
/// Fragments are routed by their index. A fragment bringing a new id at an
/// index already in use starts a new call: providers that omit `index`
/// send every call at index 0.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    tool_calls: Vec<AssembledToolCall>,
    /// Position in `tool_calls` of the call open at each index.
    open: HashMap<u32, usize>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events carried by one chunk, in chunk order.
    pub fn decode(&mut self, chunk: CompletionChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(usage) = chunk.usage {
            self.usage = Some(Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            });
        }

        for choice in chunk.choices {
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
            let Some(delta) = choice.delta else {
                continue;
            };

            if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                events.push(StreamEvent::TextDelta(text));
            }
            for fragment in delta.tool_calls.into_iter().flatten() {
                self.decode_tool_fragment(fragment, &mut events);
            }
        }

        events
    }

    fn decode_tool_fragment(&mut self, fragment: ToolCallFragment, events: &mut Vec<StreamEvent>) {
        let (name, arguments) = match fragment.function {
            Some(f) => (f.name, f.arguments.unwrap_or_default()),
            None => (None, String::new()),
        };

        let open = self.open.get(&fragment.index).copied();
        let slot = match (open, fragment.id) {
            (Some(slot), None) => slot,
            (Some(slot), Some(id)) if self.tool_calls[slot].id == id => slot,
            (_, Some(id)) => {
                events.push(StreamEvent::ToolCallStart {
                    id: id.clone(),
                    name: name.clone().unwrap_or_default(),
                });
                self.tool_calls.push(AssembledToolCall {
                    id,
                    name: name.unwrap_or_default(),
                    arguments: String::new(),
                });
                let slot = self.tool_calls.len() - 1;
                self.open.insert(fragment.index, slot);
                slot
            }
            (None, None) => {
                warn!(index = fragment.index, "Tool call fragment before its id, dropping");
                return;
            }
        };
        let call = &mut self.tool_calls[slot];

        if !arguments.is_empty() {
            call.arguments.push_str(&arguments);
            events.push(StreamEvent::ToolCallDelta {
                id: call.id.clone(),
                name: call.name.clone(),
                args_fragment: arguments,
            });
        }
    }

    /// Drain the assembled tool calls in the order they started.
    pub fn take_tool_calls(&mut self) -> Vec<AssembledToolCall> {
        self.open.clear();
        std::mem::take(&mut self.tool_calls)
    }

    /// The terminal event for a stream that ended normally.
    ///
    /// Finish reasons are kebab-cased (`tool_calls` → `tool-calls`).
    pub fn finish_event(&self) -> StreamEvent {
        StreamEvent::Finish {
            reason: self
                .finish_reason
                .as_deref()
                .map(|r| r.replace('_', "-"))
                .unwrap_or_else(|| "unknown".to_string()),
            usage: self.usage.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(value: Value) -> CompletionChunk {
        serde_json::from_value(value).unwrap()
    }

    fn text(content: &str) -> CompletionChunk {
        chunk(json!({"choices": [{"index": 0, "delta": {"content": content}}]}))
    }

    #[test]
    fn test_text_chunk_yields_one_delta() {
        let mut decoder = ChunkDecoder::new();
        assert_eq!(
            decoder.decode(text("Hi")),
            vec![StreamEvent::TextDelta("Hi".into())]
        );
    }

    #[test]
    fn test_role_only_and_usage_chunks_yield_nothing() {
        let mut decoder = ChunkDecoder::new();
        let role = chunk(json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}}]}));
        assert!(decoder.decode(role).is_empty());

        let usage = chunk(json!({"choices": [], "usage": {"prompt_tokens": 9, "completion_tokens": 4}}));
        assert!(decoder.decode(usage).is_empty());

        assert_eq!(
            decoder.finish_event(),
            StreamEvent::Finish {
                reason: "unknown".into(),
                usage: Usage {
                    prompt_tokens: 9,
                    completion_tokens: 4
                },
            }
        );
    }

    #[test]
    fn test_tool_call_fragments_assemble_by_index() {
        let mut decoder = ChunkDecoder::new();

        let first = chunk(json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "id": "call_a", "type": "function", "function": {"name": "get_current_weather", "arguments": ""}}
        ]}}]}));
        assert_eq!(
            decoder.decode(first),
            vec![StreamEvent::ToolCallStart {
                id: "call_a".into(),
                name: "get_current_weather".into()
            }]
        );

        for piece in ["{\"latitude\":", "52.5,\"longitude\":13.4}"] {
            let next = chunk(json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": piece}}
            ]}}]}));
            let events = decoder.decode(next);
            assert_eq!(
                events,
                vec![StreamEvent::ToolCallDelta {
                    id: "call_a".into(),
                    name: "get_current_weather".into(),
                    args_fragment: piece.into(),
                }]
            );
        }

        let done = chunk(json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}));
        assert!(decoder.decode(done).is_empty());

        let calls = decoder.take_tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args(), json!({"latitude": 52.5, "longitude": 13.4}));
        assert!(matches!(
            decoder.finish_event(),
            StreamEvent::Finish { ref reason, .. } if reason == "tool-calls"
        ));
        assert!(decoder.take_tool_calls().is_empty());
    }

    #[test]
    fn test_new_id_at_same_index_starts_a_new_call() {
        let mut decoder = ChunkDecoder::new();

        let first = chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"id": "c1", "function": {"name": "f", "arguments": "{\"x\":1}"}}
        ]}}]}));
        decoder.decode(first);

        let second = chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"id": "c2", "function": {"name": "g", "arguments": "{\"y\":2}"}}
        ]}}]}));
        assert_eq!(
            decoder.decode(second),
            vec![
                StreamEvent::ToolCallStart {
                    id: "c2".into(),
                    name: "g".into()
                },
                StreamEvent::ToolCallDelta {
                    id: "c2".into(),
                    name: "g".into(),
                    args_fragment: "{\"y\":2}".into(),
                },
            ]
        );

        // An id-less continuation belongs to the most recent call.
        let more = chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"function": {"arguments": ""}}
        ]}}]}));
        assert!(decoder.decode(more).is_empty());

        let calls = decoder.take_tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!((calls[0].id.as_str(), calls[0].args()), ("c1", json!({"x": 1})));
        assert_eq!((calls[1].id.as_str(), calls[1].args()), ("c2", json!({"y": 2})));
    }

    #[test]
    fn test_repeated_id_continues_the_call() {
        let mut decoder = ChunkDecoder::new();
        for piece in ["{\"a\":", "1}"] {
            let next = chunk(json!({"choices": [{"delta": {"tool_calls": [
                {"index": 0, "id": "c1", "function": {"name": "f", "arguments": piece}}
            ]}}]}));
            decoder.decode(next);
        }
        let calls = decoder.take_tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args(), json!({"a": 1}));
    }

    #[test]
    fn test_fragment_without_known_id_is_dropped() {
        let mut decoder = ChunkDecoder::new();
        let orphan = chunk(json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 3, "function": {"arguments": "{}"}}
        ]}}]}));
        assert!(decoder.decode(orphan).is_empty());
        assert!(decoder.take_tool_calls().is_empty());
    }

    #[test]
    fn test_unparsable_arguments_kept_as_string() {
        let call = AssembledToolCall {
            id: "c".into(),
            name: "f".into(),
            arguments: "{oops".into(),
        };
        assert_eq!(call.args(), json!("{oops"));

        let empty = AssembledToolCall {
            arguments: String::new(),
            ..call
        };
        assert_eq!(empty.args(), json!({}));
    }
}
