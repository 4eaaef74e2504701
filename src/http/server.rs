//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to a plain or TLS listener
//! - Dispatch requests to a route, or to local static files
//! - Consult the response cache around upstream calls
//! - Observability (metrics, correlation IDs)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::{CacheKey, CacheLookup, CacheStatus, CacheSweeper, ResponseCache};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, StartupError};
use crate::http::forwarder::{ForwardedRequest, Forwarder};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{moved_permanently, not_found, with_cache_status};
use crate::http::static_files::StaticFiles;
use crate::net::tls::load_tls_config;
use crate::observability::metrics;
use crate::resilience::timeouts::Timeouts;
use crate::routing::{RouteRule, Router as ProxyRouter};
use crate::security::limits::buffer_body;
use crate::security::ClientInfo;

/// Time allowed for in-flight TLS connections to finish after shutdown.
const TLS_DRAIN_SECS: u64 = 30;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
    pub forwarder: Arc<Forwarder>,
    pub cache: Option<ResponseCache>,
    pub static_files: Option<StaticFiles>,
    pub max_body_size: usize,
    /// Scheme the listener speaks, reported as `X-Forwarded-Proto`.
    pub scheme: &'static str,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    cache: Option<ResponseCache>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let proxy_router = Arc::new(ProxyRouter::from_config(&config)?);
        let forwarder = Arc::new(Forwarder::new(&config)?);
        let cache = config
            .cache
            .enabled
            .then(|| ResponseCache::new(&config.cache));

        let state = AppState {
            router: proxy_router,
            forwarder,
            cache: cache.clone(),
            static_files: StaticFiles::from_config(&config.static_files),
            max_body_size: config.security.max_body_size,
            scheme: if config.listener.tls.is_some() { "https" } else { "http" },
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            cache,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request deadline answers `504` like an upstream timeout would.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Timeouts::from(&config.timeouts).request,
            ))
            .layer(propagate_request_id_layer())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id(request),
                    )
                }),
            )
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        let addr = listener.local_addr()?;

        if let Some(cache) = &self.cache {
            let interval = Duration::from_secs(self.config.cache.sweep_interval_secs);
            CacheSweeper::new(cache.clone(), interval).spawn(shutdown.resubscribe());
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        match &self.config.listener.tls {
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
            Some(tls) => {
                let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path))
                    .await
                    .map_err(StartupError::Tls)?;
                tracing::info!(address = %addr, "HTTPS server starting");

                let handle = axum_server::Handle::new();
                let signal = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    signal.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Redirects bare prefixes, proxies routed paths and serves the rest locally.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    if let Some(route) = state.router.bare_prefix_match(&path) {
        let location = match request.uri().query() {
            Some(query) => format!("{}?{}", route.prefix(), query),
            None => route.prefix().to_string(),
        };
        tracing::debug!(request_id = %request_id, path = %path, location = %location, "Redirecting to prefix");
        let response = moved_permanently(&location);
        metrics::record_request(route.name(), method.as_str(), response.status().as_u16(), start_time);
        return response;
    }

    let Some(route) = state.router.match_path(&path) else {
        tracing::debug!(request_id = %request_id, path = %path, "No route matched, serving locally");
        let response = match &state.static_files {
            Some(files) => files.serve(request).await,
            None => not_found(),
        };
        metrics::record_request("local", method.as_str(), response.status().as_u16(), start_time);
        return response;
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route.name(),
        "Proxying request"
    );

    let response = match proxy(&state, route, addr, request, &request_id).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    metrics::record_request(route.name(), method.as_str(), response.status().as_u16(), start_time);
    response
}

async fn proxy(
    state: &AppState,
    route: &RouteRule,
    addr: SocketAddr,
    request: Request<Body>,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let body = buffer_body(body, state.max_body_size).await?;

    let client = ClientInfo {
        addr,
        scheme: state.scheme,
    };
    let outbound = ForwardedRequest::new(route, &parts, body, &client);

    let cache = state
        .cache
        .as_ref()
        .filter(|_| ResponseCache::is_cacheable_method(&outbound.method));
    let key = cache.map(|_| CacheKey::new(&outbound.method, route.prefix(), &outbound.upstream_path));

    let mut stale = None;
    if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
        match cache.lookup(key) {
            CacheLookup::Fresh(entry) => {
                tracing::debug!(request_id = %request_id, route = %route.name(), "Cache hit");
                return Ok(entry.to_response(CacheStatus::Hit));
            }
            CacheLookup::Stale(entry) => stale = Some(entry),
            CacheLookup::Absent => {}
        }
    }

    // A failure while reading the body counts like one before the headers.
    let relayed = match state.forwarder.forward(route, &outbound, request_id).await {
        Ok(upstream) => {
            state
                .forwarder
                .relay(route, &outbound.method, upstream, cache.zip(key))
                .await
        }
        Err(e) => Err(e),
    };

    match relayed {
        Ok(response) => Ok(match cache {
            Some(_) => with_cache_status(response, CacheStatus::Miss),
            None => response,
        }),
        Err(e) => match stale {
            Some(entry) => {
                tracing::warn!(
                    request_id = %request_id,
                    route = %route.name(),
                    error = %e,
                    "Serving stale cache entry"
                );
                Ok(entry.to_response(CacheStatus::Stale))
            }
            None => Err(e),
        },
    }
}
