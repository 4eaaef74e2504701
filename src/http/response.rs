//! Response helpers.
//!
//! # Responsibilities
//! - Build locally generated responses (redirects, not found)
//! - Adjust validators of rewritten bodies
//! - Tag responses with their cache outcome

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::cache::{CacheStatus, X_CACHE_STATUS};

/// `301 Moved Permanently` to `location`.
pub fn moved_permanently(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::MOVED_PERMANENTLY;
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// A modified body can no longer match a strong validator.
pub fn weaken_etag(headers: &mut HeaderMap) {
    let weakened = headers
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with('"'))
        .and_then(|v| HeaderValue::from_str(&format!("W/{v}")).ok());

    if let Some(value) = weakened {
        headers.insert(header::ETAG, value);
    }
}

pub fn with_cache_status(mut response: Response, status: CacheStatus) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE_STATUS, status.header_value());
    response
}
