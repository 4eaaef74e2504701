//! Error types surfaced by the proxy.
//!
//! Every upstream-facing failure is translated into a downstream-safe status
//! at the Forwarder boundary; the detail only ever reaches the logs.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::{ConfigError, ValidationError};

/// Failure while handling a single proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Connection refused, reset, or DNS failure.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    /// Connect or read deadline exceeded.
    #[error("upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// The upstream answered with something that could not be read.
    #[error("malformed upstream response: {0}")]
    UpstreamProtocol(#[source] reqwest::Error),

    /// Request body exceeded `security.max_body_size`.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
}

impl ProxyError {
    /// Classify a client error raised while talking to the upstream.
    pub fn from_upstream(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::UpstreamTimeout(timeout)
        } else if error.is_connect() {
            Self::UpstreamUnreachable(error)
        } else {
            Self::UpstreamProtocol(error)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UpstreamUnreachable(_) | Self::UpstreamProtocol(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnreachable(_) => "unreachable",
            Self::UpstreamTimeout(_) => "timeout",
            Self::UpstreamProtocol(_) => "protocol",
            Self::PayloadTooLarge(_) => "payload_too_large",
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::UpstreamUnreachable(_) | Self::UpstreamTimeout(_))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}

/// Failure while bringing the proxy up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid route: {0}")]
    Route(#[from] ValidationError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Listener(#[from] crate::net::ListenerError),

    #[error("TLS setup failed: {0}")]
    Tls(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProxyError::UpstreamTimeout(Duration::from_secs(1)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ProxyError::PayloadTooLarge(10).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_response_hides_detail() {
        let response = ProxyError::UpstreamTimeout(Duration::from_secs(30)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Gateway Timeout");
    }
}
