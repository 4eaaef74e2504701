//! Subpath reverse proxy library.
//!
//! Mounts upstream web applications under URL prefixes of a single host,
//! rewriting root-relative references in their text responses so they keep
//! working under the prefix.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod rewrite;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, StartupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
