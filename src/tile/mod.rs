//! Tile proxy layer.
//!
//! This module turns an inbound tile request into an authenticated upstream
//! fetch and streams the answer back.
//!
//! # Architecture
//!
//! The tile proxy sits between the HTTP layer and the upstream session:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ TileRequest (params)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               TileProxy                 │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  Personal /  │  │  Authenticated  │  │
//! │  │  Global URLs │  │  Fetcher        │  │
//! │  │  (upstream)  │  │  (retry once)   │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │ UpstreamResponse
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │     forward_response (stream back)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileProxy`]: Entry point for personal and global tile fetches
//! - [`TileRequest`]: Validated coordinates, color and sport
//! - [`PersonalHeatmap`] / [`GlobalHeatmap`]: Upstream URL construction
//! - [`AuthenticatedFetcher`]: GET with a single re-authenticated retry
//! - [`forward_response`]: Streams an [`UpstreamResponse`] to the caller
//!
//! # Example
//!
//! ```
//! use strava_tile_proxy::tile::{Heat, TileRequest};
//!
//! let request = TileRequest::from_parts("10/163/395", Some("color=blue")).unwrap();
//! assert_eq!(request.heat, Heat::Blue);
//! assert_eq!(request.coords.z, 10);
//! ```

mod fetcher;
mod forward;
mod params;
mod service;
mod upstream;

pub use fetcher::{AuthenticatedFetcher, Reauth, RetryPolicy};
pub use forward::{forward_response, UpstreamResponse};
pub use params::{Heat, Sport, TileCoords, TileRequest};
pub use service::TileProxy;
pub use upstream::{
    GlobalHeatmap, PersonalHeatmap, Visibility, DEFAULT_GLOBAL_HEATMAP_URL,
    DEFAULT_PERSONAL_HEATMAP_URL, FILTER_START, HEATMAP_SERVERS, SERVER_PLACEHOLDER,
};
