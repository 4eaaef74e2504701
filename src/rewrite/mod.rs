//! Body rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream response headers
//!     → body.rs (content type / encoding / size gate)
//!     → buffered body
//!     → rules.rs (ordered literal substitutions)
//!     → rewritten body, Content-Length recomputed
//! ```
//!
//! # Design Decisions
//! - Literal substring replacement, not HTML/CSS/JS parsing
//! - Rule order is configuration order
//! - Bodies that are not UTF-8 pass through raw

pub mod body;
pub mod rules;

pub use body::{BodyRewriter, Rewritten};
pub use rules::RewriteRule;
