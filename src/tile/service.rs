//! Tile proxy for orchestrating authenticated tile fetches.
//!
//! The TileProxy is the main entry point for tile requests. It:
//! - Builds the upstream URL for the requested heatmap
//! - Fetches it through the shared session
//! - Re-authenticates and retries once when the session is rejected
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          TileProxy                              │
//! │  ┌──────────────────────────┐   ┌───────────────────────────┐   │
//! │  │     personal_tile()      │   │       global_tile()       │   │
//! │  │ 1. URL with filters      │   │ 1. Pick edge server       │   │
//! │  │ 2. Fetch, on 401 login   │   │ 2. Fetch, on 401/403      │   │
//! │  │    and retry once        │   │    edge auth, retry once  │   │
//! │  └────────────┬─────────────┘   └─────────────┬─────────────┘   │
//! │               └──────────────┬────────────────┘                 │
//! │                              ▼                                  │
//! │                ┌───────────────────────────┐                    │
//! │                │   AuthenticatedFetcher    │                    │
//! │                └─────────────┬─────────────┘                    │
//! └──────────────────────────────┼──────────────────────────────────┘
//!                                ▼
//!                      Authenticator (Session)
//! ```

use std::sync::Arc;

use chrono::Local;
use tracing::debug;

use crate::error::ProxyError;
use crate::session::Authenticator;

use super::fetcher::{AuthenticatedFetcher, Reauth};
use super::forward::UpstreamResponse;
use super::params::TileRequest;
use super::upstream::{GlobalHeatmap, PersonalHeatmap};

// =============================================================================
// Tile Proxy
// =============================================================================

/// Fetches heatmap tiles on behalf of unauthenticated callers.
///
/// # Type Parameters
///
/// * `A` - The authenticator holding the upstream session (e.g. [`Session`](crate::session::Session))
///
/// # Example
///
/// ```ignore
/// use strava_tile_proxy::session::{Credentials, Session};
/// use strava_tile_proxy::tile::{GlobalHeatmap, PersonalHeatmap, TileProxy, TileRequest, Visibility};
///
/// let session = Session::new(Credentials::new("me@example.com", "secret"))?;
/// let proxy = TileProxy::new(
///     session,
///     PersonalHeatmap::new("12345", Visibility::default()),
///     GlobalHeatmap::new(),
/// );
///
/// let response = proxy.personal_tile(&TileRequest::new(10, 163, 395)).await?;
/// println!("Upstream answered {}", response.status());
/// ```
pub struct TileProxy<A: Authenticator> {
    fetcher: AuthenticatedFetcher<A>,
    personal: PersonalHeatmap,
    global: GlobalHeatmap,
}

impl<A: Authenticator> TileProxy<A> {
    /// Create a proxy that owns its authenticator.
    pub fn new(auth: A, personal: PersonalHeatmap, global: GlobalHeatmap) -> Self {
        Self::with_shared_auth(Arc::new(auth), personal, global)
    }

    /// Create a proxy around an authenticator shared with other components.
    pub fn with_shared_auth(auth: Arc<A>, personal: PersonalHeatmap, global: GlobalHeatmap) -> Self {
        Self {
            fetcher: AuthenticatedFetcher::new(auth),
            personal,
            global,
        }
    }

    pub fn authenticator(&self) -> &A {
        self.fetcher.authenticator()
    }

    pub fn personal(&self) -> &PersonalHeatmap {
        &self.personal
    }

    pub fn global(&self) -> &GlobalHeatmap {
        &self.global
    }

    /// Fetch a tile of the athlete's personal heatmap.
    ///
    /// Activities are filtered up to today's local date. A 401 triggers one
    /// login and one retry; whatever the retry returns is passed back.
    pub async fn personal_tile(&self, request: &TileRequest) -> Result<UpstreamResponse, ProxyError> {
        let today = Local::now().date_naive();
        let url = self.personal.tile_url(request, today);
        debug!(url = %url, "Fetching personal heatmap tile");

        self.fetcher
            .fetch(&url, self.personal.policy(), Reauth::Login)
            .await
    }

    /// Fetch a tile of the global heatmap from a randomly chosen edge.
    ///
    /// A 401 or 403 triggers one edge authorization against the same edge,
    /// then one retry.
    pub async fn global_tile(&self, request: &TileRequest) -> Result<UpstreamResponse, ProxyError> {
        let edge_url = self.global.edge_url(self.global.pick_server());
        let url = self.global.tile_url(&edge_url, request);
        debug!(url = %url, "Fetching global heatmap tile");

        self.fetcher
            .fetch(
                &url,
                self.global.policy(),
                Reauth::Edge {
                    edge_url: &edge_url,
                },
            )
            .await
    }
}
