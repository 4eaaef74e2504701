//! Response cache storage.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::observability::metrics;

pub const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

/// Identity of a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    route: String,
    upstream_path: String,
}

impl CacheKey {
    pub fn new(method: &Method, route_prefix: &str, upstream_path: &str) -> Self {
        Self {
            method: method.clone(),
            route: route_prefix.to_string(),
            upstream_path: upstream_path.to_string(),
        }
    }
}

/// The only statuses that may be cached, each with its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Ok,
    NotFound,
}

impl TtlClass {
    pub fn for_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::OK => Some(Self::Ok),
            StatusCode::NOT_FOUND => Some(Self::NotFound),
            _ => None,
        }
    }
}

/// How the response was produced, reported in `X-Cache-Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Stale,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Stale => "STALE",
        }
    }

    pub fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

/// A stored upstream response, already filtered and rewritten.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub expires_at: Instant,
}

impl CachedResponse {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Whether the entry is still usable within `stale_window` past expiry.
    pub fn is_alive(&self, now: Instant, stale_window: Duration) -> bool {
        self.expires_at
            .checked_add(stale_window)
            .map_or(true, |deadline| now < deadline)
    }

    /// Rebuild a downstream response from the entry.
    pub fn to_response(&self, status: CacheStatus) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
            .headers_mut()
            .insert(X_CACHE_STATUS, status.header_value());
        response
    }
}

/// Outcome of a cache read.
#[derive(Debug)]
pub enum CacheLookup {
    Fresh(CachedResponse),
    /// Expired but still inside the stale window; only usable on upstream failure.
    Stale(CachedResponse),
    Absent,
}

/// Concurrent response cache keyed by method, route and upstream path.
///
/// Entries expire wholesale per TTL class. Bodies above `max_entry_bytes`
/// are never stored.
/// Concurrent misses on the same key each fetch from the upstream; the last
/// store wins.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<DashMap<CacheKey, CachedResponse>>,
    ok_ttl: Option<Duration>,
    not_found_ttl: Option<Duration>,
    stale_window: Duration,
    max_entry_bytes: usize,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let stale_window = if config.serve_stale_on_error {
            Duration::from_secs(config.max_stale_secs)
        } else {
            Duration::ZERO
        };

        Self {
            inner: Arc::new(DashMap::new()),
            ok_ttl: config.ok_ttl_secs.map(Duration::from_secs),
            not_found_ttl: config.not_found_ttl_secs.map(Duration::from_secs),
            stale_window,
            max_entry_bytes: config.max_entry_bytes,
        }
    }

    /// Largest body a single entry may hold.
    pub fn max_entry_bytes(&self) -> usize {
        self.max_entry_bytes
    }

    /// Only GET and HEAD responses are cached.
    pub fn is_cacheable_method(method: &Method) -> bool {
        method == Method::GET || method == Method::HEAD
    }

    /// TTL for a status, `None` when the status is not cacheable.
    pub fn ttl_for(&self, status: StatusCode) -> Option<Duration> {
        match TtlClass::for_status(status)? {
            TtlClass::Ok => self.ok_ttl,
            TtlClass::NotFound => self.not_found_ttl,
        }
    }

    /// Whether a response with these headers may be stored at all.
    pub fn is_storable(&self, status: StatusCode, headers: &HeaderMap) -> bool {
        if self.ttl_for(status).is_none() || headers.contains_key(header::SET_COOKIE) {
            return false;
        }
        !headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(|directive| directive.trim().to_ascii_lowercase())
            .any(|directive| matches!(directive.as_str(), "no-store" | "no-cache" | "private"))
    }

    pub fn lookup(&self, key: &CacheKey) -> CacheLookup {
        let now = Instant::now();
        let Some(entry) = self.inner.get(key).map(|e| e.value().clone()) else {
            metrics::record_cache_lookup("miss");
            return CacheLookup::Absent;
        };

        if entry.is_fresh(now) {
            metrics::record_cache_lookup("hit");
            CacheLookup::Fresh(entry)
        } else if entry.is_alive(now, self.stale_window) {
            metrics::record_cache_lookup("stale");
            CacheLookup::Stale(entry)
        } else {
            metrics::record_cache_lookup("expired");
            CacheLookup::Absent
        }
    }

    /// Store a response if its status and headers allow it. Overwrites any
    /// previous entry for the key.
    pub fn store(&self, key: CacheKey, status: StatusCode, headers: HeaderMap, body: Bytes) -> bool {
        if !self.is_storable(status, &headers) {
            return false;
        }
        if body.len() > self.max_entry_bytes {
            return false;
        }
        let Some(expires_at) = self
            .ttl_for(status)
            .and_then(|ttl| Instant::now().checked_add(ttl))
        else {
            return false;
        };

        let entry = CachedResponse {
            status,
            headers,
            body,
            expires_at,
        };
        self.inner.insert(key, entry);
        metrics::record_cache_size(self.inner.len());
        true
    }

    /// Remove entries past expiry plus the stale window. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner
            .retain(|_, entry| entry.is_alive(now, self.stale_window));
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_cache_size(self.inner.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(serve_stale: bool) -> CacheConfig {
        CacheConfig {
            enabled: true,
            ok_ttl_secs: Some(3600),
            not_found_ttl_secs: Some(60),
            serve_stale_on_error: serve_stale,
            max_stale_secs: 300,
            sweep_interval_secs: 30,
            max_entry_bytes: 16,
        }
    }

    fn key(path: &str) -> CacheKey {
        CacheKey::new(&Method::GET, "/ctf/", path)
    }

    fn store(cache: &ResponseCache, path: &str, status: StatusCode) -> bool {
        cache.store(key(path), status, HeaderMap::new(), Bytes::from_static(b"body"))
    }

    #[test]
    fn test_only_ok_and_not_found_are_cacheable() {
        let cache = ResponseCache::new(&config(false));
        assert_eq!(cache.ttl_for(StatusCode::OK), Some(Duration::from_secs(3600)));
        assert_eq!(cache.ttl_for(StatusCode::NOT_FOUND), Some(Duration::from_secs(60)));
        assert_eq!(cache.ttl_for(StatusCode::MOVED_PERMANENTLY), None);
        assert_eq!(cache.ttl_for(StatusCode::INTERNAL_SERVER_ERROR), None);

        assert!(!store(&cache, "/redirect", StatusCode::FOUND));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unset_ttl_disables_class() {
        let mut cfg = config(false);
        cfg.not_found_ttl_secs = None;
        let cache = ResponseCache::new(&cfg);
        assert!(!store(&cache, "/missing", StatusCode::NOT_FOUND));
        assert!(store(&cache, "/", StatusCode::OK));
    }

    #[test]
    fn test_private_responses_not_stored() {
        let cache = ResponseCache::new(&config(false));

        let mut cookie = HeaderMap::new();
        cookie.insert(header::SET_COOKIE, HeaderValue::from_static("session=1"));
        assert!(!cache.is_storable(StatusCode::OK, &cookie));

        let mut no_store = HeaderMap::new();
        no_store.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0, No-Store"));
        assert!(!cache.is_storable(StatusCode::OK, &no_store));

        let mut public = HeaderMap::new();
        public.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=60"));
        assert!(cache.is_storable(StatusCode::OK, &public));
    }

    #[test]
    fn test_method_is_part_of_key() {
        assert!(ResponseCache::is_cacheable_method(&Method::GET));
        assert!(ResponseCache::is_cacheable_method(&Method::HEAD));
        assert!(!ResponseCache::is_cacheable_method(&Method::POST));

        let cache = ResponseCache::new(&config(false));
        store(&cache, "/", StatusCode::OK);
        let head = CacheKey::new(&Method::HEAD, "/ctf/", "/");
        assert!(matches!(cache.lookup(&head), CacheLookup::Absent));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_classes_expire_independently() {
        let cache = ResponseCache::new(&config(false));
        store(&cache, "/page", StatusCode::OK);
        store(&cache, "/missing", StatusCode::NOT_FOUND);

        assert!(matches!(cache.lookup(&key("/page")), CacheLookup::Fresh(_)));
        assert!(matches!(cache.lookup(&key("/missing")), CacheLookup::Fresh(_)));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(matches!(cache.lookup(&key("/page")), CacheLookup::Fresh(_)));
        assert!(matches!(cache.lookup(&key("/missing")), CacheLookup::Absent));

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(matches!(cache.lookup(&key("/page")), CacheLookup::Absent));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_window_only_with_serve_stale() {
        let cache = ResponseCache::new(&config(true));
        store(&cache, "/missing", StatusCode::NOT_FOUND);

        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(matches!(cache.lookup(&key("/missing")), CacheLookup::Stale(_)));

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(matches!(cache.lookup(&key("/missing")), CacheLookup::Absent));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_removes_only_dead_entries() {
        let cache = ResponseCache::new(&config(false));
        store(&cache, "/page", StatusCode::OK);
        store(&cache, "/missing", StatusCode::NOT_FOUND);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_oversized_body_not_stored() {
        let cache = ResponseCache::new(&config(false));
        let body = Bytes::from(vec![b'x'; 17]);
        assert!(!cache.store(key("/big"), StatusCode::OK, HeaderMap::new(), body));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_far_future_ttl_does_not_overflow() {
        let mut cfg = config(true);
        cfg.ok_ttl_secs = Some(u64::MAX);
        cfg.max_stale_secs = u64::MAX;
        let cache = ResponseCache::new(&cfg);

        // Unrepresentable expiry: the response is simply not cached.
        assert!(!store(&cache, "/", StatusCode::OK));
        assert!(store(&cache, "/missing", StatusCode::NOT_FOUND));
        assert!(matches!(cache.lookup(&key("/missing")), CacheLookup::Fresh(_)));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_entry_rebuilds_response() {
        let cache = ResponseCache::new(&config(false));
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        cache.store(key("/"), StatusCode::OK, headers, Bytes::from_static(b"<p>hi</p>"));

        let CacheLookup::Fresh(entry) = cache.lookup(&key("/")) else {
            panic!("expected fresh entry");
        };
        let response = entry.to_response(CacheStatus::Hit);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(response.headers()[X_CACHE_STATUS], "HIT");
    }
}
