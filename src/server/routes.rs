//! Router configuration for the tile proxy.
//!
//! This module defines the HTTP routes and applies CORS and tracing middleware.
//!
//! # Route Structure
//!
//! ```text
//! /health                      - Health check
//! /personal/{..}/{z}/{x}/{y}   - Personal heatmap tile
//! /global/{..}/{z}/{x}/{y}     - Global heatmap tile
//! ```
//!
//! Callers never authenticate; the proxy attaches its own session upstream.
//!
//! # Example
//!
//! ```ignore
//! use strava_tile_proxy::server::{create_router, RouterConfig};
//! use strava_tile_proxy::tile::TileProxy;
//!
//! let proxy = TileProxy::new(session, personal, global);
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(proxy, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{global_tile_handler, health_handler, personal_tile_handler, AppState};
use crate::session::Authenticator;
use crate::tile::TileProxy;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration that allows any CORS origin and traces
    /// requests.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Tile routes take a wildcard path so map clients can prefix the
/// coordinates with anything they like (`/personal/tiles/10/1/2` works the
/// same as `/personal/10/1/2`). Unmatched paths fall through to axum's 404.
pub fn create_router<A>(tile_proxy: TileProxy<A>, config: RouterConfig) -> Router
where
    A: Authenticator + 'static,
{
    let app_state = AppState::new(tile_proxy);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/personal/{*path}", get(personal_tile_handler::<A>))
        .route("/global/{*path}", get(global_tile_handler::<A>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
