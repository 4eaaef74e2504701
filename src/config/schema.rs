//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the subpath proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Route definitions mapping path prefixes to upstream origins.
    pub routes: Vec<RouteConfig>,

    /// Body rewriting rules shared by all routes.
    pub rewrite: RewriteConfig,

    /// Response header policy.
    pub headers: HeaderPolicyConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Local static file serving for non-matching paths.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// A path prefix mounted onto an upstream origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match. Must start and end with `/`.
    pub prefix: String,

    /// Upstream origin, e.g. "https://ctf.example.org".
    pub upstream: String,

    /// Forward only the part of the path after the prefix.
    #[serde(default = "default_true")]
    pub strip_prefix: bool,

    /// Forward the client's Host header instead of the upstream authority.
    #[serde(default)]
    pub preserve_host: bool,

    /// Rewrite absolute paths in text bodies to live under the prefix.
    #[serde(default = "default_true")]
    pub rewrite_body: bool,

    /// Move `Location` headers of redirects under the prefix.
    #[serde(default)]
    pub rewrite_redirects: bool,

    /// Verify the upstream's TLS certificate.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

fn default_true() -> bool {
    true
}

/// A literal substitution applied after the prefix rules.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RewriteRuleConfig {
    pub match_pattern: String,
    pub replacement: String,
}

/// Body rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Patterns ending in `/`; the trailing slash is replaced by the route prefix.
    pub patterns: Vec<String>,

    /// Extra literal rules, applied in order after `patterns`.
    pub extra_rules: Vec<RewriteRuleConfig>,

    /// Content types (essence only) eligible for rewriting.
    pub content_types: Vec<String>,

    /// Larger bodies, declared or read, are streamed untouched.
    pub max_body_bytes: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            patterns: [
                "href=\"/",
                "src=\"/",
                "action=\"/",
                "url(\"/",
                "url('/",
                "url(/",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            extra_rules: Vec::new(),
            content_types: vec![
                "text/html".to_string(),
                "text/css".to_string(),
                "application/javascript".to_string(),
            ],
            max_body_bytes: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Response header policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Upstream response headers removed before reaching the client.
    pub hide: Vec<String>,
}

impl Default for HeaderPolicyConfig {
    fn default() -> Self {
        Self {
            hide: vec![
                "X-Frame-Options".to_string(),
                "X-Content-Type-Options".to_string(),
                "Content-Security-Policy".to_string(),
                "X-XSS-Protection".to_string(),
            ],
        }
    }
}

/// Response cache configuration.
///
/// Only `200` and `404` responses are ever cached; leaving a TTL unset
/// disables caching for that status.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the response cache.
    pub enabled: bool,

    /// TTL for `200 OK` responses in seconds.
    pub ok_ttl_secs: Option<u64>,

    /// TTL for `404 Not Found` responses in seconds.
    pub not_found_ttl_secs: Option<u64>,

    /// Serve an expired entry when the upstream cannot be reached.
    pub serve_stale_on_error: bool,

    /// How long past expiry an entry stays usable for stale serving.
    pub max_stale_secs: u64,

    /// Interval of the background eviction sweep in seconds.
    pub sweep_interval_secs: u64,

    /// Responses with a larger body are relayed but never stored.
    pub max_entry_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ok_ttl_secs: Some(3600),
            not_found_ttl_secs: Some(60),
            serve_stale_on_error: false,
            max_stale_secs: 300,
            sweep_interval_secs: 30,
            max_entry_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream round trip timeout (connect, send, read) in seconds.
    pub upstream_secs: u64,

    /// Downstream request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Static file serving for paths no route claims.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory holding the built single-page application.
    pub root: Option<String>,

    /// Document served for paths that match no file.
    pub index: String,

    /// max-age for fingerprinted assets.
    pub asset_max_age_secs: u64,

    /// Extensions that receive the long-lived cache policy.
    pub asset_extensions: Vec<String>,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: None,
            index: "index.html".to_string(),
            asset_max_age_secs: 31_536_000, // 1 year
            asset_extensions: [
                "js", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2",
                "ttf",
            ]
            .iter()
            .map(|e| e.to_string())
            .collect(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
