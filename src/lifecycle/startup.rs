//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and metrics from the loaded configuration
//! - Build the server (routes, upstream clients, cache)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use crate::config::ProxyConfig;
use crate::error::StartupError;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net;
use crate::observability::{logging, metrics};

/// Run the proxy with an already validated configuration.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        routes = config.routes.len(),
        cache = config.cache.enabled,
        "subpath-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener_config = config.listener.clone();
    let server = HttpServer::new(config)?;
    let listener = net::bind(&listener_config).await?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
