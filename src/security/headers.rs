//! Header manipulation.
//!
//! # Responsibilities
//! - Add Host, X-Real-IP, X-Forwarded-For, X-Forwarded-Proto
//! - Strip hop-by-hop headers in both directions
//! - Hide configured upstream response headers
//!
//! # Design Decisions
//! - X-Forwarded-For is appended to, matching `$proxy_add_x_forwarded_for`
//! - X-Real-IP and X-Forwarded-Proto are always overwritten

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::routing::RouteRule;

pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Where a request came from, as seen by the listener.
#[derive(Debug, Clone, Copy)]
pub struct ClientInfo {
    pub addr: SocketAddr,
    /// `http` or `https`.
    pub scheme: &'static str,
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Build the header set sent upstream for `route`.
pub fn forwarding_headers(inbound: &HeaderMap, route: &RouteRule, client: &ClientInfo) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    // Recomputed from the buffered body.
    headers.remove(header::CONTENT_LENGTH);

    if !route.preserve_host() || !headers.contains_key(header::HOST) {
        headers.insert(header::HOST, route.upstream_host().clone());
    }

    let ip = client.addr.ip().to_string();
    // Repeated header lines form one list.
    let forwarded_for = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .chain(std::iter::once(ip.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    if let Ok(value) = HeaderValue::from_str(&ip) {
        headers.insert(X_REAL_IP, value);
    }
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert(X_FORWARDED_FOR, value);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(client.scheme));

    // Rewriting needs a plain-text body from the upstream.
    if route.rewriter().is_some() {
        headers.remove(header::ACCEPT_ENCODING);
    }

    headers
}

/// Build the header set returned downstream from an upstream response.
pub fn downstream_headers(upstream: &HeaderMap, route: &RouteRule, hidden: &[HeaderName]) -> HeaderMap {
    let mut headers = upstream.clone();
    strip_hop_by_hop(&mut headers);
    for name in hidden {
        headers.remove(name);
    }

    if let Some(location) = headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| route.public_location(v))
        .and_then(|v| HeaderValue::from_str(&v).ok())
    {
        headers.insert(header::LOCATION, location);
    }

    headers
}
