//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → [routing layer picks a route, or static files]
//!     → [cache lookup]
//!     → forwarder.rs (send upstream, relay, rewrite)
//!     → response.rs (redirects, cache status)
//!     → Send to client
//! ```

pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use forwarder::{ForwardedRequest, Forwarder};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
pub use static_files::StaticFiles;
