//! Message translation from the chat UI to the completion provider.
//!
//! - [`message`]: Inbound message types as the UI sends them
//! - [`convert`]: Mapping to OpenAI chat-completion messages

pub mod convert;
pub mod message;

pub use convert::{convert_messages, Content, ContentPart, ProviderMessage};
pub use message::{ChatMessage, Role};
