//! Upstream forwarding.
//!
//! # Responsibilities
//! - Replay method, headers and body to the route's upstream origin
//! - Enforce connect and round-trip timeouts, optional retries
//! - Relay status and filtered headers; stream or buffer the body
//! - Hand text bodies to the rewriter and cacheable ones to the cache
//!
//! # Design Decisions
//! - One client per TLS verification mode, built once at startup
//! - Redirects are never followed; 3xx goes back to the client
//! - Bodies are streamed unless they must be rewritten or stored, and
//!   buffering is bounded; an oversized body falls back to streaming

use axum::body::{Body, Bytes};
use axum::http::{header, request, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::Response;
use futures_util::{stream, StreamExt};
use reqwest::{redirect, Client};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::response::weaken_etag;
use crate::observability::metrics;
use crate::resilience::retries::RetryPolicy;
use crate::resilience::timeouts::Timeouts;
use crate::rewrite::Rewritten;
use crate::routing::RouteRule;
use crate::security::headers::{downstream_headers, forwarding_headers, ClientInfo};

/// A request ready to be sent upstream. Lives for one round trip.
#[derive(Debug, Clone)]
pub struct ForwardedRequest {
    pub method: Method,
    /// Path and query on the upstream.
    pub upstream_path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardedRequest {
    pub fn new(route: &RouteRule, parts: &request::Parts, body: Bytes, client: &ClientInfo) -> Self {
        Self {
            method: parts.method.clone(),
            upstream_path: route.upstream_path(&parts.uri),
            headers: forwarding_headers(&parts.headers, route, client),
            body,
        }
    }
}

/// Sends requests upstream and turns the answers into downstream responses.
#[derive(Debug, Clone)]
pub struct Forwarder {
    verified: Client,
    insecure: Client,
    hidden_headers: Vec<HeaderName>,
    retry: RetryPolicy,
    timeouts: Timeouts,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let timeouts = Timeouts::from(&config.timeouts);
        let hidden_headers = config
            .headers
            .hide
            .iter()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .collect();

        Ok(Self {
            verified: build_client(&timeouts, true)?,
            insecure: build_client(&timeouts, false)?,
            hidden_headers,
            retry: RetryPolicy::from_config(&config.retries),
            timeouts,
        })
    }

    fn client(&self, route: &RouteRule) -> &Client {
        if route.verify_tls() {
            &self.verified
        } else {
            &self.insecure
        }
    }

    /// Send the request, retrying transport failures when enabled.
    pub async fn forward(
        &self,
        route: &RouteRule,
        request: &ForwardedRequest,
        request_id: &str,
    ) -> Result<reqwest::Response, ProxyError> {
        let url = route.upstream_url(&request.upstream_path);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let mut outbound = self
                .client(route)
                .request(request.method.clone(), &url)
                .headers(request.headers.clone());
            if !request.body.is_empty() {
                outbound = outbound.body(request.body.clone());
            }

            match outbound.send().await {
                Ok(response) => {
                    tracing::debug!(
                        request_id = %request_id,
                        route = %route.name(),
                        url = %url,
                        status = %response.status(),
                        attempt = attempts,
                        "Upstream responded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let error = ProxyError::from_upstream(e, self.timeouts.upstream);
                    metrics::record_upstream_error(route.name(), error.kind());

                    if let Some(delay) = self.retry.next_delay(attempts, &request.method, &error) {
                        tracing::info!(
                            request_id = %request_id,
                            route = %route.name(),
                            attempt = attempts,
                            delay = ?delay,
                            error = %error,
                            "Retrying upstream request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    tracing::error!(
                        request_id = %request_id,
                        route = %route.name(),
                        url = %url,
                        attempt = attempts,
                        error = %error,
                        "Upstream error"
                    );
                    return Err(error);
                }
            }
        }
    }

    /// Turn an upstream response into the downstream one.
    ///
    /// Headers are filtered first; the body is then streamed as-is, or
    /// buffered when it has to be rewritten or stored in `cache`. Buffering
    /// stops at the larger of the rewrite and cache limits, after which the
    /// body is streamed unmodified and not stored.
    pub async fn relay(
        &self,
        route: &RouteRule,
        method: &Method,
        mut upstream: reqwest::Response,
        cache: Option<(&ResponseCache, CacheKey)>,
    ) -> Result<Response, ProxyError> {
        let status = upstream.status();
        let mut headers = downstream_headers(upstream.headers(), route, &self.hidden_headers);

        // A HEAD answer has no body and its Content-Length describes the GET one.
        let rewriter = route
            .rewriter()
            .filter(|_| *method != Method::HEAD)
            .filter(|rw| rw.applies_to(&headers));
        let cache = cache.filter(|(cache, _)| cache.is_storable(status, &headers));

        if rewriter.is_none() && cache.is_none() {
            return Ok(build_response(status, headers, Body::from_stream(upstream.bytes_stream())));
        }

        let limit = rewriter
            .map_or(0, |rw| rw.max_body_bytes())
            .max(cache.as_ref().map_or(0, |(cache, _)| cache.max_entry_bytes()));

        let body = match read_body(&mut upstream, limit)
            .await
            .map_err(|e| ProxyError::from_upstream(e, self.timeouts.upstream))?
        {
            BufferedBody::Complete(body) => body,
            BufferedBody::Partial(prefix) => {
                tracing::debug!(
                    route = %route.name(),
                    limit = limit,
                    "Body exceeds buffering limit, streaming unmodified"
                );
                let rest = upstream.bytes_stream();
                let stream = stream::iter(prefix.into_iter().map(Ok::<_, reqwest::Error>)).chain(rest);
                return Ok(build_response(status, headers, Body::from_stream(stream)));
            }
        };

        let body = match rewriter.map(|rw| rw.rewrite_bytes(&body)) {
            Some(Rewritten::Text(text, replaced)) => {
                metrics::record_body_rewrite(route.name(), replaced);
                headers.remove(header::CONTENT_LENGTH);
                if replaced > 0 {
                    weaken_etag(&mut headers);
                }
                Bytes::from(text)
            }
            Some(Rewritten::Raw) => {
                tracing::debug!(route = %route.name(), "Body not rewritable, passing through unmodified");
                body
            }
            None => body,
        };

        if let Some((cache, key)) = cache {
            cache.store(key, status, headers.clone(), body.clone());
        }

        Ok(build_response(status, headers, Body::from(body)))
    }
}

/// Upstream body read up to a limit.
enum BufferedBody {
    /// The whole body, no larger than the limit.
    Complete(Bytes),
    /// Chunks read so far once the limit was crossed; the rest is unread.
    Partial(Vec<Bytes>),
}

async fn read_body(upstream: &mut reqwest::Response, limit: usize) -> Result<BufferedBody, reqwest::Error> {
    let mut chunks = Vec::new();
    let mut total = 0usize;

    while let Some(chunk) = upstream.chunk().await? {
        total = total.saturating_add(chunk.len());
        chunks.push(chunk);
        if total > limit {
            return Ok(BufferedBody::Partial(chunks));
        }
    }

    Ok(BufferedBody::Complete(match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.swap_remove(0),
        _ => Bytes::from(chunks.concat()),
    }))
}

fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn build_client(timeouts: &Timeouts, verify_tls: bool) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.upstream)
        .redirect(redirect::Policy::none())
        .danger_accept_invalid_certs(!verify_tls)
        .no_proxy()
        .build()
}
