//! HTTP server for the chat relay.
//!
//! - [`api`]: Router, request types and route handlers
//! - [`streaming`]: `text/event-stream` response construction

pub mod api;
pub mod streaming;

pub use api::{build_router, AppState};
