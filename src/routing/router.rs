//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest prefix wins; routes are sorted once at startup
//! - O(n) prefix scan (acceptable for typical route counts)
//! - No match is not an error: the caller serves the path locally

use axum::http::{HeaderValue, Uri};
use url::Url;

use crate::config::{ProxyConfig, RouteConfig, ValidationError};
use crate::rewrite::BodyRewriter;
use crate::routing::matcher::PathPrefixMatcher;

/// A compiled route: prefix → upstream origin plus per-route policy.
#[derive(Debug, Clone)]
pub struct RouteRule {
    name: String,
    matcher: PathPrefixMatcher,
    upstream: Url,
    /// Origin without trailing slash, e.g. `https://ctf.example.org/base`.
    origin_base: String,
    upstream_host: HeaderValue,
    strip_prefix: bool,
    preserve_host: bool,
    rewrite_redirects: bool,
    verify_tls: bool,
    rewriter: Option<BodyRewriter>,
}

impl RouteRule {
    /// Compile a route from its configuration.
    pub fn compile(config: &RouteConfig, proxy: &ProxyConfig) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidUpstream {
            route: config.name.clone(),
            upstream: config.upstream.clone(),
            reason,
        };

        let upstream = Url::parse(&config.upstream).map_err(|e| invalid(e.to_string()))?;
        let host = upstream
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let authority = match upstream.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let upstream_host =
            HeaderValue::from_str(&authority).map_err(|e| invalid(e.to_string()))?;

        let origin_base = upstream.as_str().trim_end_matches('/').to_string();

        let rewriter = config
            .rewrite_body
            .then(|| BodyRewriter::for_prefix(&proxy.rewrite, &config.prefix));

        Ok(Self {
            name: config.name.clone(),
            matcher: PathPrefixMatcher::new(config.prefix.clone()),
            upstream,
            origin_base,
            upstream_host,
            strip_prefix: config.strip_prefix,
            preserve_host: config.preserve_host,
            rewrite_redirects: config.rewrite_redirects,
            verify_tls: config.verify_tls,
            rewriter,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Host header value naming the upstream authority.
    pub fn upstream_host(&self) -> &HeaderValue {
        &self.upstream_host
    }

    pub fn preserve_host(&self) -> bool {
        self.preserve_host
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    pub fn rewriter(&self) -> Option<&BodyRewriter> {
        self.rewriter.as_ref()
    }

    /// Translate an inbound URI into the upstream path and query.
    pub fn upstream_path(&self, uri: &Uri) -> String {
        let path = uri.path();
        let path = if self.strip_prefix {
            self.matcher.strip(path)
        } else {
            path
        };
        match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }

    /// Absolute URL for an upstream path produced by [`upstream_path`](Self::upstream_path).
    pub fn upstream_url(&self, upstream_path: &str) -> String {
        format!("{}{}", self.origin_base, upstream_path)
    }

    /// Map a redirect `Location` from the upstream into the public prefix.
    ///
    /// Returns `None` when redirect rewriting is off or the location points
    /// somewhere this route does not own.
    pub fn public_location(&self, location: &str) -> Option<String> {
        if !self.rewrite_redirects {
            return None;
        }

        let upstream_path = match location.strip_prefix(self.origin_base.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            Some(_) => return None,
            None if location.starts_with('/') && !location.starts_with("//") => {
                let base_path = self.upstream.path().trim_end_matches('/');
                match location.strip_prefix(base_path) {
                    Some(rest) if !base_path.is_empty() && rest.starts_with('/') => rest,
                    _ => location,
                }
            }
            None => return None,
        };

        if !self.strip_prefix || upstream_path.starts_with(self.prefix()) {
            return Some(upstream_path.to_string());
        }

        let mount = self.prefix().trim_end_matches('/');
        Some(format!("{mount}{upstream_path}"))
    }
}

/// Immutable route table.
#[derive(Debug, Default)]
pub struct Router {
    /// Sorted by prefix length, longest first.
    routes: Vec<RouteRule>,
}

impl Router {
    /// Compile all configured routes.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ValidationError> {
        let mut routes = config
            .routes
            .iter()
            .map(|route| RouteRule::compile(route, config))
            .collect::<Result<Vec<_>, _>>()?;
        routes.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));

        for route in &routes {
            tracing::info!(
                route = %route.name(),
                prefix = %route.prefix(),
                upstream = %route.upstream(),
                "Route compiled"
            );
        }

        Ok(Self { routes })
    }

    /// Find the route owning `path`, longest prefix first.
    pub fn match_path(&self, path: &str) -> Option<&RouteRule> {
        self.routes.iter().find(|r| r.matcher.matches(path))
    }

    /// Find the route whose prefix is `path` plus a trailing slash.
    pub fn bare_prefix_match(&self, path: &str) -> Option<&RouteRule> {
        self.routes.iter().find(|r| r.matcher.is_bare_prefix(path))
    }

    pub fn routes(&self) -> &[RouteRule] {
        &self.routes
    }
}
