//! Client-facing streaming.
//!
//! - [`event`]: StreamEvent and the chunk decoder
//! - [`frame`]: Protocol framing (`data` tags, `ui-message` SSE, raw `text`)
//! - [`transcoder`]: Lazy chunk stream → frame stream

pub mod event;
pub mod frame;
pub mod transcoder;

pub use event::{StreamEvent, Usage};
pub use frame::{FrameEncoder, Protocol};
pub use transcoder::{transcode, FrameStream, Transcoder};
