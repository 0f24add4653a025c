//! OpenAI-compatible streaming client.
//!
//! Sends `POST {base_url}/chat/completions` with `stream: true` and turns the
//! SSE response body into [`CompletionChunk`]s. SSE framing (line buffering,
//! UTF-8 boundaries) is handled by `eventsource-stream`.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{future, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::config::UpstreamConfig;
use crate::error::{RelayError, Result};
use crate::tools::ToolRegistry;
use crate::translate::ProviderMessage;
use crate::upstream::{ChunkStream, CompletionChunk, CompletionProvider, CompletionRequest, StreamOptions};

/// Provider speaking the OpenAI Chat Completions streaming API.
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    include_usage: bool,
}

impl OpenAiProvider {
    pub fn new(config: &UpstreamConfig, client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            include_usage: config.include_usage,
        }
    }

    /// Read the API key from the configured environment variable. A missing
    /// key is not fatal here; requests fail with a 500 until it is set.
    pub fn from_env(config: &UpstreamConfig, client: reqwest::Client) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!(var = %config.api_key_env, "Upstream API key not set");
        }
        Self::new(config, client, api_key)
    }

    /// HTTP client with the configured connect and idle timeouts.
    ///
    /// There is no whole-request timeout: a streamed completion may run for
    /// minutes. The idle timeout applies to each read instead.
    pub fn http_client(config: &UpstreamConfig) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if config.connect_timeout_secs > 0 {
            builder = builder.connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        }
        if config.idle_timeout_secs > 0 {
            builder = builder.read_timeout(Duration::from_secs(config.idle_timeout_secs));
        }
        Ok(builder.build()?)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_completion(
        &self,
        messages: &[ProviderMessage],
        tools: &ToolRegistry,
    ) -> Result<ChunkStream> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RelayError::MissingApiKey(self.api_key_env.clone()))?;

        let body = CompletionRequest {
            model: &self.model,
            messages,
            tools: tools.provider_tools(),
            stream: true,
            stream_options: self.include_usage.then_some(StreamOptions {
                include_usage: true,
            }),
        };

        debug!(
            endpoint = %self.endpoint,
            messages = messages.len(),
            tools = body.tools.len(),
            "Opening upstream stream"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        info!(model = %self.model, "Upstream stream opened");
        Ok(parse_chunk_stream(response.bytes_stream()))
    }
}

/// Parse an SSE byte stream into completion chunks.
///
/// Blank events are skipped and `[DONE]` ends the stream. Transport errors,
/// undecodable payloads and provider `error` objects surface as `Err` items.
pub fn parse_chunk_stream<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let chunks = bytes
        .eventsource()
        .take_while(|item| {
            future::ready(!matches!(item, Ok(event) if event.data.trim() == "[DONE]"))
        })
        .filter_map(|item| {
            future::ready(match item {
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => Some(decode_chunk(&event.data)),
                Err(e) => Some(Err(RelayError::Upstream(e.to_string()))),
            })
        });

    Box::pin(chunks)
}

fn decode_chunk(data: &str) -> Result<CompletionChunk> {
    let chunk: CompletionChunk =
        serde_json::from_str(data).map_err(|e| RelayError::Decode(e.to_string()))?;
    if let Some(error) = &chunk.error {
        return Err(RelayError::Upstream(error.message.clone()));
    }
    Ok(chunk)
}
