//! Upstream completion providers.
//!
//! - [`chunk`]: Streaming chunk types as the provider sends them
//! - [`openai`]: OpenAI-compatible HTTP client with SSE parsing

pub mod chunk;
pub mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::error::Result;
use crate::tools::{ProviderTool, ToolRegistry};
use crate::translate::ProviderMessage;

pub use chunk::CompletionChunk;
pub use openai::OpenAiProvider;

/// Provider chunks in arrival order. An `Err` item ends the useful stream.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk>> + Send>>;

/// A source of streamed chat completions.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model name requested upstream.
    fn model(&self) -> &str;

    /// Open a streaming completion. Errors here happen before any output
    /// reaches the client; errors inside the stream happen after.
    async fn stream_completion(
        &self,
        messages: &[ProviderMessage],
        tools: &ToolRegistry,
    ) -> Result<ChunkStream>;
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ProviderMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ProviderTool<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StreamOptions {
    pub include_usage: bool,
}
