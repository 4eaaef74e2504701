//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate route prefixes and upstream origins
//! - Validate rewrite patterns and header names
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;
use crate::resilience::retries::RetryPolicy;

/// Upper bound for any duration setting: ten years.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("route `{route}`: prefix `{prefix}` must start and end with `/`")]
    MalformedPrefix { route: String, prefix: String },

    #[error("prefix `{0}` is used by more than one route")]
    DuplicatePrefix(String),

    #[error("route name `{0}` is used by more than one route")]
    DuplicateRouteName(String),

    #[error("route `{route}`: invalid upstream `{upstream}`: {reason}")]
    InvalidUpstream {
        route: String,
        upstream: String,
        reason: String,
    },

    #[error("rewrite pattern `{0}` must be non-empty and end with `/`")]
    InvalidRewritePattern(String),

    #[error("extra rewrite rule has an empty match pattern")]
    EmptyRewriteMatch,

    #[error("invalid header name `{0}` in hide list")]
    InvalidHeaderName(String),

    #[error("empty content type in rewrite allow-list")]
    EmptyContentType,

    #[error("timeout `{0}` must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("`{0}` must not exceed {max} seconds", max = MAX_DURATION_SECS)]
    DurationTooLarge(&'static str),

    #[error(
        "timeouts.request_secs ({request_secs}s) is shorter than the upstream budget of {}ms",
        .upstream_budget.as_millis()
    )]
    RequestTimeoutTooShort {
        request_secs: u64,
        upstream_budget: Duration,
    },

    #[error("retries.max_attempts must be at least 1")]
    ZeroRetryAttempts,

    #[error("cache.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,

    #[error("listener.tls requires both cert_path and key_path")]
    IncompleteTls,

    #[error("unknown log format `{0}` (expected `pretty` or `json`)")]
    LogFormat(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::IncompleteTls);
        }
    }

    let mut prefixes = HashSet::new();
    let mut names = HashSet::new();
    for route in &config.routes {
        if !route.prefix.starts_with('/') || !route.prefix.ends_with('/') {
            errors.push(ValidationError::MalformedPrefix {
                route: route.name.clone(),
                prefix: route.prefix.clone(),
            });
        }
        if !prefixes.insert(route.prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(route.prefix.clone()));
        }
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }
        if let Err(reason) = check_upstream(&route.upstream) {
            errors.push(ValidationError::InvalidUpstream {
                route: route.name.clone(),
                upstream: route.upstream.clone(),
                reason,
            });
        }
    }

    for pattern in &config.rewrite.patterns {
        if pattern.len() < 2 || !pattern.ends_with('/') {
            errors.push(ValidationError::InvalidRewritePattern(pattern.clone()));
        }
    }
    if config
        .rewrite
        .extra_rules
        .iter()
        .any(|rule| rule.match_pattern.is_empty())
    {
        errors.push(ValidationError::EmptyRewriteMatch);
    }
    if config
        .rewrite
        .content_types
        .iter()
        .any(|ct| ct.trim().is_empty())
    {
        errors.push(ValidationError::EmptyContentType);
    }

    for name in &config.headers.hide {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        }
    }

    let timeouts = [
        ("connect_secs", config.timeouts.connect_secs),
        ("upstream_secs", config.timeouts.upstream_secs),
        ("request_secs", config.timeouts.request_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroRetryAttempts);
    }

    let durations = [
        ("timeouts.connect_secs", Some(config.timeouts.connect_secs)),
        ("timeouts.upstream_secs", Some(config.timeouts.upstream_secs)),
        ("timeouts.request_secs", Some(config.timeouts.request_secs)),
        ("cache.ok_ttl_secs", config.cache.ok_ttl_secs),
        ("cache.not_found_ttl_secs", config.cache.not_found_ttl_secs),
        ("cache.max_stale_secs", Some(config.cache.max_stale_secs)),
        ("cache.sweep_interval_secs", Some(config.cache.sweep_interval_secs)),
    ];
    for (name, value) in durations {
        if value.is_some_and(|secs| secs > MAX_DURATION_SECS) {
            errors.push(ValidationError::DurationTooLarge(name));
        }
    }

    // Retries run inside the request deadline, so it must outlast all of them.
    let upstream_budget = RetryPolicy::from_config(&config.retries)
        .worst_case_duration(Duration::from_secs(config.timeouts.upstream_secs));
    if Duration::from_secs(config.timeouts.request_secs) < upstream_budget {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: config.timeouts.request_secs,
            upstream_budget,
        });
    }

    if config.cache.enabled && config.cache.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream(upstream: &str) -> Result<(), String> {
    let url = Url::parse(upstream).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("origin must not carry a query or fragment".to_string());
    }
    Ok(())
}
