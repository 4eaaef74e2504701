//! Response body rewriting for a mounted prefix.

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::RewriteConfig;
use crate::rewrite::rules::RewriteRule;

/// The ordered rule set of one route plus the gates deciding when it runs.
#[derive(Debug, Clone)]
pub struct BodyRewriter {
    rules: Vec<RewriteRule>,
    content_types: Arc<[String]>,
    max_body_bytes: usize,
}

/// Result of a rewrite pass over a body.
#[derive(Debug, PartialEq, Eq)]
pub enum Rewritten {
    /// The body was text and the rules ran; carries the replacement count.
    Text(String, usize),
    /// The body was not valid UTF-8, or too large, and is passed through untouched.
    Raw,
}

impl BodyRewriter {
    /// Compile the configured patterns and extra rules for `prefix`.
    pub fn for_prefix(config: &RewriteConfig, prefix: &str) -> Self {
        let rules = config
            .patterns
            .iter()
            .map(|pattern| RewriteRule::for_prefix(pattern, prefix))
            .chain(config.extra_rules.iter().map(RewriteRule::from))
            .collect();

        Self {
            rules,
            content_types: config
                .content_types
                .iter()
                .map(|ct| ct.trim().to_ascii_lowercase())
                .collect(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Whether a response with these headers is eligible for rewriting.
    ///
    /// Requires an allow-listed content type, no content encoding and a
    /// declared length (if any) within the buffering limit.
    pub fn applies_to(&self, headers: &HeaderMap) -> bool {
        self.allows_content_type(headers.get(header::CONTENT_TYPE))
            && is_identity_encoded(headers)
            && declared_length(headers).map_or(true, |len| len <= self.max_body_bytes)
    }

    fn allows_content_type(&self, value: Option<&HeaderValue>) -> bool {
        let Some(essence) = value
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
        else {
            return false;
        };
        self.content_types.iter().any(|ct| *ct == essence)
    }

    /// Run every rule, in order, over `text`.
    pub fn rewrite_str(&self, text: &str) -> (String, usize) {
        let mut current = text.to_string();
        let mut total = 0;
        for rule in &self.rules {
            let (next, replaced) = rule.apply(&current);
            current = next;
            total += replaced;
        }
        (current, total)
    }

    /// Rewrite a raw body. Non UTF-8 or oversized input is reported as
    /// [`Rewritten::Raw`].
    pub fn rewrite_bytes(&self, body: &[u8]) -> Rewritten {
        if body.len() > self.max_body_bytes {
            return Rewritten::Raw;
        }
        match std::str::from_utf8(body) {
            Ok(text) => {
                let (out, replaced) = self.rewrite_str(text);
                Rewritten::Text(out, replaced)
            }
            Err(_) => Rewritten::Raw,
        }
    }
}

fn is_identity_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map_or(true, |v| v.trim().eq_ignore_ascii_case("identity"))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
