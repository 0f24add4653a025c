//! Streaming HTTP responses.
//!
//! Wraps a frame stream in a `text/event-stream` body. Each frame becomes
//! its own body chunk, so hyper writes it out as soon as it is produced.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;
use futures::StreamExt;

use crate::stream::{FrameStream, Protocol};

/// Build the 200 response carrying `frames`.
pub fn stream_response(frames: FrameStream, protocol: Protocol) -> Response {
    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));
    let mut response = Response::new(body);

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    if let Some((name, value)) = protocol.stream_header() {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    response
}
