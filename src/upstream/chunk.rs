//! Streaming chat-completion chunks (OpenAI `chat.completion.chunk`).
//!
//! Every field is optional or defaulted: providers differ in what they omit
//! and send explicit `null`s liberally.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Present on the trailing usage-only chunk.
    #[serde(default)]
    pub usage: Option<ChunkUsage>,

    /// Some providers report mid-stream failures as an `error` object.
    #[serde(default)]
    pub error: Option<ChunkError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub delta: Option<ChunkDelta>,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
}

/// One piece of a tool call. The first fragment for an index carries the id
/// and function name; later ones only carry more argument text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallFragment {
    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub function: Option<FunctionFragment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionFragment {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChunkUsage {
    #[serde(default)]
    pub prompt_tokens: u64,

    #[serde(default)]
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkError {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_tool_call_fragment() {
        let chunk: CompletionChunk = serde_json::from_str(
            r#"{"id":"c","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"f","arguments":""}}]},"finish_reason":null}]}"#,
        )
        .unwrap();
        let delta = chunk.choices[0].delta.as_ref().unwrap();
        let fragment = &delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(fragment.id.as_deref(), Some("call_1"));
        assert_eq!(fragment.function.as_ref().unwrap().name.as_deref(), Some("f"));
    }

    #[test]
    fn test_tolerates_nulls_and_usage_only_chunk() {
        let chunk: CompletionChunk = serde_json::from_str(
            r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#,
        )
        .unwrap();
        assert!(chunk.choices.is_empty());
        assert_eq!(chunk.usage.unwrap().prompt_tokens, 12);

        let chunk: CompletionChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"content":null,"tool_calls":null},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
