//! # Strava Tile Proxy
//!
//! An authenticated forwarding proxy for Strava heatmap tiles.
//!
//! Map clients request tiles over plain HTTP. The proxy holds one logged-in
//! upstream session, attaches it to every tile fetch, and transparently logs
//! back in when the session expires.
//!
//! ## Features
//!
//! - **Personal and global heatmaps**: `/personal/{z}/{x}/{y}` and `/global/{z}/{x}/{y}`
//! - **Single-flight login**: concurrent expirations collapse into one login exchange
//! - **Retry once**: a rejected fetch is re-authenticated and retried exactly once
//! - **Streaming**: upstream status, headers and body are forwarded as they arrive
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`session`] - Credentials, CSRF login exchange and the shared session
//! - [`tile`] - Tile parameters, upstream URLs, authenticated fetch and forwarding
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use strava_tile_proxy::{
//!     create_router, Credentials, GlobalHeatmap, PersonalHeatmap, RouterConfig, Session,
//!     TileProxy, Visibility,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(Credentials::new("rider@example.com", "secret"))?;
//!     let proxy = TileProxy::new(
//!         session,
//!         PersonalHeatmap::new("12345", Visibility::default()),
//!         GlobalHeatmap::new(),
//!     );
//!
//!     let router = create_router(proxy, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod tile;

// Re-export commonly used types
pub use config::Config;
pub use error::{LoginError, ProxyError, TileParamError};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use session::{Authenticator, Credentials, Session};
pub use tile::{
    forward_response, GlobalHeatmap, Heat, PersonalHeatmap, RetryPolicy, Sport, TileProxy,
    TileRequest, UpstreamResponse, Visibility,
};
