//! Request body decoding
//!
//! Streams the request body frame by frame with a running byte count.
//! Exceeding the limit aborts immediately without buffering the remainder;
//! it is always an error, never a truncation.

use crate::engine::error::RouteError;
use http_body_util::BodyExt;
use hyper::body::{Body, Buf};

/// Read, size-limit, and JSON-decode a request payload.
///
/// Zero bytes decode to an empty object.
pub async fn decode<B>(body: B, limit: u64) -> Result<serde_json::Value, RouteError>
where
    B: Body + Unpin,
    B::Error: std::fmt::Display,
{
    let mut body = body;
    let mut buf: Vec<u8> = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| RouteError::Handler(format!("body read failed: {e}")))?;
        let Ok(mut data) = frame.into_data() else {
            // Trailer frame, nothing to accumulate.
            continue;
        };

        if buf.len() as u64 + data.remaining() as u64 > limit {
            return Err(RouteError::BodyTooLarge);
        }
        while data.has_remaining() {
            let chunk = data.chunk();
            buf.extend_from_slice(chunk);
            let advanced = chunk.len();
            data.advance(advanced);
        }
    }

    if buf.is_empty() {
        return Ok(serde_json::json!({}));
    }

    serde_json::from_slice(&buf).map_err(|e| RouteError::InvalidJsonBody(e.to_string()))
}
