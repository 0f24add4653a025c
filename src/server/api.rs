//! Chat relay HTTP API.
//!
//! - POST /api/chat (alias /api/chat/completions)
//! - GET /health

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::server::streaming::stream_response;
use crate::stream::{transcode, Protocol};
use crate::tools::ToolRegistry;
use crate::translate::{convert_messages, ChatMessage};
use crate::upstream::CompletionProvider;

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn CompletionProvider>,
    pub tools: Arc<ToolRegistry>,
    pub start_time: Instant,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let allow_cors = state.config.server.allow_cors;

    let cors = ServiceBuilder::new().option_layer(allow_cors.then(CorsLayer::permissive));

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/completions", post(chat))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub model: String,
    pub tools: Vec<String>,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ChatQuery>, QueryRejection>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Query(query) = query.map_err(|e| RelayError::InvalidRequest(e.body_text()))?;
    let Json(req) = body.map_err(|e| RelayError::InvalidRequest(e.body_text()))?;
    let protocol: Protocol = query.protocol.as_deref().unwrap_or("data").parse()?;

    let request_id = Uuid::new_v4().to_string();
    let messages = convert_messages(&req.messages);

    info!(
        request_id = %request_id,
        received = req.messages.len(),
        forwarded = messages.len(),
        protocol = %protocol,
        "Chat request"
    );

    let chunks = state
        .provider
        .stream_completion(&messages, &state.tools)
        .await?;
    let frames = transcode(chunks, protocol, state.tools.clone(), &request_id);

    Ok(stream_response(frames, protocol))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.provider.model().to_string(),
        tools: state
            .tools
            .definitions()
            .iter()
            .map(|d| d.name.clone())
            .collect(),
    })
}
