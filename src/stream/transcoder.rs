//! Provider chunk stream → framed client stream.
//!
//! The output is lazy: one upstream chunk is pulled only when the previous
//! chunk's frames have been taken, so each frame reaches the client as soon
//! as it exists. Dropping the output drops the upstream response.

use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use crate::stream::event::{ChunkDecoder, StreamEvent};
use crate::stream::frame::{FrameEncoder, Protocol};
use crate::tools::ToolRegistry;
use crate::upstream::ChunkStream;

/// Serialized frames, ready to be written to the response body.
pub type FrameStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Stream of [`StreamEvent`]s for one response, ending with exactly one
/// `Finish` or `Error`.
pub struct Transcoder {
    chunks: ChunkStream,
    decoder: ChunkDecoder,
    tools: Arc<ToolRegistry>,
    request_id: String,
    chunks_seen: usize,
    done: bool,
}

impl Transcoder {
    pub fn new(chunks: ChunkStream, tools: Arc<ToolRegistry>, request_id: impl Into<String>) -> Self {
        Self {
            chunks,
            decoder: ChunkDecoder::new(),
            tools,
            request_id: request_id.into(),
            chunks_seen: 0,
            done: false,
        }
    }

    /// Events for the next upstream chunk, or the closing events once the
    /// upstream ends. `None` after the terminal event has been produced.
    pub async fn next_events(&mut self) -> Option<Vec<StreamEvent>> {
        if self.done {
            return None;
        }

        let events = match self.chunks.next().await {
            Some(Ok(chunk)) => {
                self.chunks_seen += 1;
                self.decoder.decode(chunk)
            }
            Some(Err(e)) => {
                warn!(
                    request_id = %self.request_id,
                    chunks = self.chunks_seen,
                    error = %e,
                    "Upstream stream failed"
                );
                vec![StreamEvent::Error(e.to_string())]
            }
            None => self.close().await,
        };
        self.done = events.iter().any(StreamEvent::is_terminal);
        Some(events)
    }

    /// Completed tool calls, local tool results, then `Finish`.
    async fn close(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        for call in self.decoder.take_tool_calls() {
            let args = call.args();
            events.push(StreamEvent::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                args: args.clone(),
            });
            if let Some(result) = self.tools.execute(&call.name, args).await {
                events.push(StreamEvent::ToolResult {
                    id: call.id,
                    result,
                });
            }
        }

        let finish = self.decoder.finish_event();
        debug!(
            request_id = %self.request_id,
            chunks = self.chunks_seen,
            finish = ?finish,
            "Upstream stream finished"
        );
        events.push(finish);
        events
    }

    /// Lazily encode every event with `protocol`, dropping events the
    /// protocol has no frame for.
    pub fn into_frames(self, protocol: Protocol) -> FrameStream {
        let encoder = FrameEncoder::new(protocol, format!("msg-{}", self.request_id));
        let frames = stream::unfold((self, encoder), |(mut transcoder, mut encoder)| async move {
            let events = transcoder.next_events().await?;
            let frames: Vec<Bytes> = events
                .iter()
                .flat_map(|event| encoder.encode(event))
                .collect();
            Some((stream::iter(frames), (transcoder, encoder)))
        })
        .flatten();

        Box::pin(frames)
    }
}

/// Transcode a provider chunk stream into `protocol` frames.
pub fn transcode(
    chunks: ChunkStream,
    protocol: Protocol,
    tools: Arc<ToolRegistry>,
    request_id: &str,
) -> FrameStream {
    Transcoder::new(chunks, tools, request_id).into_frames(protocol)
}
