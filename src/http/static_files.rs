//! Local static files for paths no route claims.
//!
//! Serves a built single-page application: existing files are returned
//! as-is, anything else falls back to the index document.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::StaticFilesConfig;

const NO_CACHE: HeaderValue = HeaderValue::from_static("no-cache");

#[derive(Debug, Clone)]
pub struct StaticFiles {
    service: ServeDir<ServeFile>,
    asset_cache_control: HeaderValue,
    asset_extensions: Arc<[String]>,
}

impl StaticFiles {
    /// `None` when no static root is configured.
    pub fn from_config(config: &StaticFilesConfig) -> Option<Self> {
        let root = Path::new(config.root.as_deref()?);
        let index = root.join(&config.index);

        let asset_cache_control = HeaderValue::from_str(&format!(
            "public, max-age={}, immutable",
            config.asset_max_age_secs
        ))
        .unwrap_or(NO_CACHE);

        Some(Self {
            service: ServeDir::new(root).fallback(ServeFile::new(index)),
            asset_cache_control,
            asset_extensions: config
                .asset_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
        })
    }

    fn is_asset(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.asset_extensions.iter().any(|a| *a == ext)
            })
            .unwrap_or(false)
    }

    pub async fn serve(&self, request: Request<Body>) -> Response {
        let asset = self.is_asset(request.uri().path());

        let mut response = match self.service.clone().oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serve static file");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        // The index fallback answers missing assets too; it must stay revalidated.
        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));

        let policy = if asset && response.status().is_success() && !is_html {
            self.asset_cache_control.clone()
        } else {
            NO_CACHE
        };
        response.headers_mut().insert(header::CACHE_CONTROL, policy);
        response
    }
}
