//! Response cache subsystem.
//!
//! # States
//! ```text
//! absent → fresh → stale → evicted
//!
//! fresh:   now < expires_at            served without contacting upstream
//! stale:   expired, inside stale window served only if the upstream fails
//!          and serve_stale_on_error is on
//! evicted: removed by the sweeper, or overwritten by a new fetch
//! ```
//!
//! # Design Decisions
//! - Only 200 and 404 are cacheable, each with its own TTL
//! - Only GET and HEAD are cached
//! - No size-based eviction, no single-flight fetch coalescing

pub mod store;
pub mod sweeper;

pub use store::{CacheKey, CacheLookup, CacheStatus, CachedResponse, ResponseCache, X_CACHE_STATUS};
pub use sweeper::CacheSweeper;
