//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (buffer body within max_body_size)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Forwarder
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop, hide configured headers)
//!     → Client
//! ```

pub mod headers;
pub mod limits;

pub use headers::ClientInfo;
