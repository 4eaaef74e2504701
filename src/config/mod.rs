//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into Router / Forwarder / ResponseCache at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, HeaderPolicyConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    RetryConfig, RewriteConfig, RewriteRuleConfig, RouteConfig, SecurityConfig, StaticFilesConfig,
    TimeoutConfig, TlsConfig,
};
pub use validation::ValidationError;
