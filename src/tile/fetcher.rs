//! Authenticated upstream fetches with a single retry on session expiry.
//!
//! ```text
//!   GET url ──► status in policy? ──no──► return response
//!                     │ yes
//!                     ▼
//!              re-authenticate ──► GET url ──► return response (whatever it is)
//! ```
//!
//! There is no loop: a second rejection goes back to the caller unchanged.

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, info, warn};

use crate::error::ProxyError;
use crate::session::Authenticator;

use super::forward::UpstreamResponse;

// =============================================================================
// Retry Policy
// =============================================================================

/// Statuses that mean the upstream no longer accepts the session.
///
/// Each upstream path carries its own policy; see [`RetryPolicy::session`]
/// and [`RetryPolicy::edge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    auth_rejections: Vec<StatusCode>,
}

impl RetryPolicy {
    pub fn new(auth_rejections: impl IntoIterator<Item = StatusCode>) -> Self {
        Self {
            auth_rejections: auth_rejections.into_iter().collect(),
        }
    }

    /// Policy for the login-session path: only 401 means the session expired.
    pub fn session() -> Self {
        Self::new([StatusCode::UNAUTHORIZED])
    }

    /// Policy for the CDN edge path, which answers 401 or 403.
    pub fn edge() -> Self {
        Self::new([StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN])
    }

    pub fn is_auth_rejection(&self, status: StatusCode) -> bool {
        self.auth_rejections.contains(&status)
    }

    pub fn auth_rejections(&self) -> &[StatusCode] {
        &self.auth_rejections
    }
}

/// How to refresh the session after an auth rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reauth<'a> {
    /// Run the login exchange.
    Login,

    /// Log in, then authorize against the edge at `edge_url`.
    Edge { edge_url: &'a str },
}

// =============================================================================
// Authenticated Fetcher
// =============================================================================

/// Issues upstream GETs through the shared session.
pub struct AuthenticatedFetcher<A: Authenticator> {
    auth: Arc<A>,
}

impl<A: Authenticator> AuthenticatedFetcher<A> {
    pub fn new(auth: Arc<A>) -> Self {
        Self { auth }
    }

    pub fn authenticator(&self) -> &A {
        &self.auth
    }

    /// GET `url`, re-authenticating and retrying once if `policy` says the
    /// session was rejected.
    ///
    /// Transport errors on either attempt are returned, never retried. A
    /// failed re-authentication is returned as [`ProxyError::Login`].
    pub async fn fetch(
        &self,
        url: &str,
        policy: &RetryPolicy,
        reauth: Reauth<'_>,
    ) -> Result<UpstreamResponse, ProxyError> {
        let first = self.get(url).await?;
        let status = first.status();
        if !policy.is_auth_rejection(status) {
            debug!(url = %url, status = status.as_u16(), "Upstream responded");
            return Ok(UpstreamResponse::from(first));
        }

        // The rejected response is not forwarded; release its connection.
        drop(first);

        info!(
            url = %url,
            status = status.as_u16(),
            "Upstream rejected session, re-authenticating"
        );
        match reauth {
            Reauth::Login => self.auth.login().await?,
            Reauth::Edge { edge_url } => self.auth.edge_auth(edge_url).await?,
        }

        let retried = self.get(url).await?;
        if policy.is_auth_rejection(retried.status()) {
            warn!(
                url = %url,
                status = retried.status().as_u16(),
                "Upstream still rejects session after re-authenticating"
            );
        }

        Ok(UpstreamResponse::from(retried))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ProxyError> {
        Ok(self.auth.client().get(url).send().await?)
    }
}
