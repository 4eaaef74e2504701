//! Request size limits.
//!
//! # Responsibilities
//! - Enforce maximum request body size while buffering
//!
//! # Design Decisions
//! - Bodies are buffered once so retries can replay them
//! - Oversized bodies are rejected with 413 Payload Too Large

use axum::body::{Body, Bytes};

use crate::error::ProxyError;

/// Read the whole request body, failing past `limit` bytes.
pub async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ProxyError::PayloadTooLarge(limit))
}
