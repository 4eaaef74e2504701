//! Timeout enforcement.
//!
//! # Responsibilities
//! - Derive upstream connect and round-trip deadlines from config
//! - Derive the overall downstream request deadline
//!
//! # Design Decisions
//! - Uses the upstream client's own connect/total timeouts
//! - Timeout errors are distinct from other errors (504, not 502)

use std::time::Duration;

use crate::config::TimeoutConfig;

/// Resolved deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub upstream: Duration,
    pub request: Duration,
}

impl From<&TimeoutConfig> for Timeouts {
    fn from(config: &TimeoutConfig) -> Self {
        let upstream = Duration::from_secs(config.upstream_secs);
        Self {
            connect: Duration::from_secs(config.connect_secs).min(upstream),
            upstream,
            request: Duration::from_secs(config.request_secs),
        }
    }
}
