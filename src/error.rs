//! Error type shared by the relay and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors raised while relaying a chat request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request body could not be parsed into a chat request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The `protocol` query parameter names no known stream protocol.
    #[error("unsupported stream protocol: {0:?}")]
    UnsupportedProtocol(String),

    /// No API key was found in the configured environment variable.
    #[error("missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    /// Transport-level failure talking to the upstream provider.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The upstream provider answered with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// An upstream stream chunk could not be decoded.
    #[error("malformed upstream chunk: {0}")]
    Decode(String),

    /// A locally executed tool failed.
    #[error("tool {name} failed: {message}")]
    Tool { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// HTTP status used when this error ends a request before streaming starts.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) | RelayError::UnsupportedProtocol(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Upstream(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Rejected request");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_422() {
        assert_eq!(
            RelayError::InvalidRequest("missing field `role`".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RelayError::UnsupportedProtocol("xml".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_everything_else_maps_to_500() {
        let errors = [
            RelayError::MissingApiKey("OPENAI_API_KEY".into()),
            RelayError::Upstream("connection reset".into()),
            RelayError::UpstreamStatus {
                status: 401,
                body: "unauthorized".into(),
            },
            RelayError::Decode("expected value".into()),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
