//! Test utilities for integration tests.
//!
//! This module provides:
//! - A mocked login site (CSRF login page plus cookie-issuing session endpoint)
//! - Builders wiring a real [`Session`] and [`TileProxy`] to a [`MockServer`]
//! - A counting [`Authenticator`] for tests that only care about retry decisions

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::CookieStore;
use reqwest::Client;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use strava_tile_proxy::error::LoginError;
use strava_tile_proxy::session::{Authenticator, Credentials, Session};
use strava_tile_proxy::tile::{GlobalHeatmap, PersonalHeatmap, TileProxy, Visibility};

// =============================================================================
// Constants
// =============================================================================

pub const EMAIL: &str = "rider@example.com";
pub const PASSWORD: &str = "hunter2";
pub const ATHLETE_ID: &str = "12321";

/// Upstream path of the personal tile 1/2/3 with default color.
pub const PERSONAL_TILE_PATH: &str = "/tiles/12321/hot/1/2/3@2x.png";

/// Upstream path of the global tile 1/2/3 on edge `a` with default sport and color.
pub const GLOBAL_TILE_PATH: &str = "/a/tiles-auth/all/hot/1/2/3@2x.png";

/// Edge authorization path for edge `a`.
pub const EDGE_AUTH_PATH: &str = "/a/auth";

/// Login page carrying CSRF meta tags the way the real site does.
pub const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Log In | Strava</title>
  <meta name="csrf-param" content="authenticity_token" />
  <meta name="csrf-token" content="tok3n+/=" />
</head>
<body><form action="/session" method="post"></form></body>
</html>"#;

/// A minimal PNG-looking payload.
pub const TILE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-tile";

// =============================================================================
// Mock Login Site
// =============================================================================

/// Session endpoint that sets `auth=auth_token_N`, N counting up per call.
#[derive(Default)]
pub struct SessionCookieResponder {
    issued: AtomicUsize,
}

impl Respond for SessionCookieResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200)
            .insert_header("set-cookie", format!("auth=auth_token_{n}; Path=/"))
            .set_body_string("welcome")
    }
}

/// Mount the login page and session endpoint.
///
/// `page_delay` holds the login page back so concurrent callers overlap.
pub async fn mount_login_site(server: &MockServer, page_delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LOGIN_PAGE)
                .set_delay(page_delay),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(SessionCookieResponder::default())
        .mount(server)
        .await;
}

/// Number of requests the server received for `method_name path`.
pub async fn request_count(server: &MockServer, method_name: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method_name && r.url.path() == request_path)
        .count()
}

/// Requests the server received for `request_path`, in arrival order.
pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}

// =============================================================================
// Builders
// =============================================================================

pub fn credentials(server: &MockServer) -> Credentials {
    Credentials::with_base_url(EMAIL, PASSWORD, server.uri())
}

pub fn session(server: &MockServer) -> Session {
    Session::with_timeout(credentials(server), Duration::from_secs(5)).unwrap()
}

pub fn personal_heatmap(server: &MockServer) -> PersonalHeatmap {
    PersonalHeatmap::new(ATHLETE_ID, Visibility::default()).with_base_url(server.uri())
}

/// Global heatmap pinned to edge `a`, served under `{uri}/a`.
pub fn global_heatmap(server: &MockServer) -> GlobalHeatmap {
    GlobalHeatmap::new()
        .with_url_template(format!("{}/{{server}}", server.uri()))
        .with_servers(["a"])
}

/// A tile proxy where login site, personal and global heatmaps all live on `server`.
pub fn tile_proxy(server: &MockServer) -> TileProxy<Session> {
    TileProxy::new(
        session(server),
        personal_heatmap(server),
        global_heatmap(server),
    )
}

/// The `auth` cookie the session would send to `server`, if any.
pub fn auth_cookie(session: &Session, server: &MockServer) -> Option<String> {
    let url = reqwest::Url::parse(&server.uri()).unwrap();
    let header = session.jar().cookies(&url)?;
    header
        .to_str()
        .unwrap()
        .split("; ")
        .find(|c| c.starts_with("auth="))
        .map(str::to_string)
}

// =============================================================================
// Counting Authenticator
// =============================================================================

/// Authenticator that records calls instead of logging in.
pub struct CountingAuth {
    client: Client,
    logins: AtomicUsize,
    edge_auths: Mutex<Vec<String>>,
    fail: bool,
}

impl CountingAuth {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            logins: AtomicUsize::new(0),
            edge_auths: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Every login attempt fails with a missing CSRF token.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn edge_auths(&self) -> Vec<String> {
        self.edge_auths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Authenticator for CountingAuth {
    fn client(&self) -> &Client {
        &self.client
    }

    async fn login(&self) -> Result<(), LoginError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LoginError::MissingCsrfToken("csrf-token"));
        }
        Ok(())
    }

    async fn edge_auth(&self, edge_url: &str) -> Result<(), LoginError> {
        self.login().await?;
        self.edge_auths.lock().unwrap().push(edge_url.to_string());
        Ok(())
    }
}

/// A tile proxy on `server` driven by a shared counting authenticator.
pub fn counting_proxy(server: &MockServer, auth: Arc<CountingAuth>) -> TileProxy<CountingAuth> {
    TileProxy::with_shared_auth(auth, personal_heatmap(server), global_heatmap(server))
}
