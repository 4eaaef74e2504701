//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request path
//!     → router.rs (route lookup, longest prefix first)
//!     → matcher.rs (prefix test, strip, bare-prefix detection)
//!     → Return: matched RouteRule or NoMatch (serve locally)
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Parse upstream origin, build body rewriter
//!     → Sort by prefix length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{RouteRule, Router};
