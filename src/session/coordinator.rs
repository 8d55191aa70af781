//! The process-wide upstream session and its login coordinator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::LoginError;

use super::claim::LoginClaim;
use super::csrf::bootstrap;
use super::Credentials;

/// User agent sent on every upstream request.
pub const USER_AGENT: &str = "strava-tile-proxy";

/// Default per-request timeout for upstream calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Authenticator Trait
// =============================================================================

/// Source of an authenticated upstream client.
///
/// The tile pipeline only needs a client whose requests carry the current
/// session, plus a way to refresh that session when the upstream rejects it.
/// [`Session`] is the production implementation; tests substitute their own.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Client bound to the shared session cookie jar.
    fn client(&self) -> &Client;

    /// Establish a fresh login session.
    async fn login(&self) -> Result<(), LoginError>;

    /// Log in, then authorize against the heatmap edge at `edge_url`.
    async fn edge_auth(&self, edge_url: &str) -> Result<(), LoginError>;
}

// =============================================================================
// Session
// =============================================================================

/// The single upstream session shared by every request in the process.
///
/// Holds the cookie jar, the client bound to it, and the single-flight login
/// machinery. Concurrent [`Session::login`] calls collapse into one network
/// exchange: the caller that wins the [`LoginClaim`] runs it while holding the
/// login mutex, and the others wait for the claim to be released, take the
/// mutex, and return without touching the network.
///
/// Fetches that don't need a login only read the jar and never contend on the
/// login mutex.
pub struct Session {
    credentials: Credentials,
    jar: Arc<Jar>,
    client: Client,
    claim: LoginClaim,
    login_lock: Mutex<()>,
}

impl Session {
    /// Create a session with the default request timeout.
    pub fn new(credentials: Credentials) -> Result<Self, reqwest::Error> {
        Self::with_timeout(credentials, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a session whose upstream requests time out after `timeout`.
    pub fn with_timeout(credentials: Credentials, timeout: Duration) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            credentials,
            jar,
            client,
            claim: LoginClaim::new(),
            login_lock: Mutex::new(()),
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The cookie jar shared by every upstream request.
    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    /// Whether a login exchange is currently in flight.
    pub fn login_in_progress(&self) -> bool {
        self.claim.is_claimed()
    }

    /// Log in, merging with any login already in flight.
    ///
    /// Every caller returns only after a login exchange has finished. Callers
    /// that merged into another caller's exchange report success; the
    /// claimant reports the exchange's own result. The claim is released on
    /// every exit path, so a failed login can be retried by the next caller.
    pub async fn login(&self) -> Result<(), LoginError> {
        let Some(_claim) = self.claim.try_claim() else {
            debug!("Login already in flight, waiting for it");
            self.claim.released().await;
            let _guard = self.login_lock.lock().await;
            return Ok(());
        };

        // `_guard` drops before `_claim`, so waiters never queue behind a
        // finished exchange.
        let _guard = self.login_lock.lock().await;

        info!(email = %self.credentials.email(), "Logging in to upstream");
        match bootstrap(&self.client, &self.credentials).await {
            Ok(()) => {
                info!("Login succeeded");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                Err(e)
            }
        }
    }

    /// Log in, then request `{edge_url}/auth` so the edge's signed cookies
    /// land in the jar.
    ///
    /// The edge request is serialized with login exchanges through the login
    /// mutex. Only a transport error fails it; the edge's status is ignored.
    pub async fn edge_auth(&self, edge_url: &str) -> Result<(), LoginError> {
        self.login().await?;

        let _guard = self.login_lock.lock().await;
        let url = format!("{}/auth", edge_url.trim_end_matches('/'));
        info!(url = %url, "Authorizing against heatmap edge");

        let response = self.client.get(&url).send().await?;
        debug!(status = response.status().as_u16(), "Edge authorization finished");

        Ok(())
    }
}

#[async_trait]
impl Authenticator for Session {
    fn client(&self) -> &Client {
        &self.client
    }

    async fn login(&self) -> Result<(), LoginError> {
        Session::login(self).await
    }

    async fn edge_auth(&self, edge_url: &str) -> Result<(), LoginError> {
        Session::edge_auth(self, edge_url).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("login_in_progress", &self.login_in_progress())
            .finish_non_exhaustive()
    }
}
