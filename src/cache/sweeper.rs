//! Background eviction of expired cache entries.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::cache::store::ResponseCache;

/// Periodically purges entries past their expiry (plus stale window).
pub struct CacheSweeper {
    cache: ResponseCache,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: ResponseCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Cache sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.cache.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.cache.len(), "Evicted expired cache entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::CacheKey;
    use crate::config::CacheConfig;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_and_stops() {
        let config = CacheConfig {
            enabled: true,
            ok_ttl_secs: Some(5),
            ..CacheConfig::default()
        };
        let cache = ResponseCache::new(&config);
        cache.store(
            CacheKey::new(&Method::GET, "/ctf/", "/"),
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"ok"),
        );

        let (tx, rx) = broadcast::channel(1);
        let handle = CacheSweeper::new(cache.clone(), Duration::from_secs(1)).spawn(rx);

        time::sleep(Duration::from_secs(7)).await;
        assert!(cache.is_empty());

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
