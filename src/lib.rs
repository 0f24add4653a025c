//! chat-relay: streaming relay between a chat UI and an LLM completion API.
//!
//! Accepts the UI's message list, forwards it with the configured tool
//! definitions to an OpenAI-compatible provider, and streams the provider's
//! output back as an AI SDK data stream, an AI SDK UI message stream, or
//! raw text.

pub mod config;
pub mod error;
pub mod server;
pub mod stream;
pub mod tools;
pub mod translate;
pub mod upstream;

pub use error::{RelayError, Result};
