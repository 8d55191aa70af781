//! Authenticated fetch integration tests.
//!
//! Tests verify:
//! - A tile the upstream accepts is fetched once, without logging in
//! - One auth rejection leads to one login and one retry
//! - A second rejection is handed back unchanged
//! - Personal and global paths use their own rejection statuses
//! - Upstream URLs carry the configured filters

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use strava_tile_proxy::error::{LoginError, ProxyError};
use strava_tile_proxy::tile::{Heat, PersonalHeatmap, Sport, TileProxy, TileRequest, Visibility};

use super::test_utils::{
    counting_proxy, mount_login_site, request_count, requests_to, session, tile_proxy,
    CountingAuth, ATHLETE_ID, EDGE_AUTH_PATH, GLOBAL_TILE_PATH, PERSONAL_TILE_PATH, TILE_BYTES,
};

async fn body_bytes(response: strava_tile_proxy::UpstreamResponse) -> Vec<u8> {
    use http_body_util::BodyExt;

    let response = strava_tile_proxy::forward_response(response);
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Mount a tile mock that answers `first` once, then `then` forever.
async fn mount_tile(server: &MockServer, tile_path: &str, first: u16, then: u16) {
    Mock::given(method("GET"))
        .and(path(tile_path))
        .respond_with(ResponseTemplate::new(first))
        .up_to_n_times(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(tile_path))
        .respond_with(
            ResponseTemplate::new(then)
                .insert_header("content-type", "image/png")
                .set_body_bytes(TILE_BYTES),
        )
        .mount(server)
        .await;
}

// =============================================================================
// Personal Heatmap
// =============================================================================

#[tokio::test]
async fn test_accepted_tile_needs_no_login() {
    let server = MockServer::start().await;
    mount_login_site(&server, Duration::ZERO).await;
    mount_tile(&server, PERSONAL_TILE_PATH, 200, 200).await;

    let proxy = tile_proxy(&server);
    let response = proxy
        .personal_tile(&TileRequest::new(1, 2, 3))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(request_count(&server, "GET", PERSONAL_TILE_PATH).await, 1);
    assert_eq!(request_count(&server, "GET", "/login").await, 0);
}

#[tokio::test]
async fn test_expired_session_logs_in_and_retries_once() {
    let server = MockServer::start().await;
    mount_login_site(&server, Duration::ZERO).await;
    mount_tile(&server, PERSONAL_TILE_PATH, 401, 200).await;

    let proxy = tile_proxy(&server);
    let response = proxy
        .personal_tile(&TileRequest::new(1, 2, 3))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(body_bytes(response).await, TILE_BYTES);

    assert_eq!(request_count(&server, "GET", PERSONAL_TILE_PATH).await, 2);
    assert_eq!(request_count(&server, "GET", "/login").await, 1);
    assert_eq!(request_count(&server, "POST", "/session").await, 1);

    // Only the retry carries the fresh session cookie
    let tiles = requests_to(&server, PERSONAL_TILE_PATH).await;
    assert!(tiles[0].headers.get("cookie").is_none());
    let cookie = tiles[1].headers.get("cookie").unwrap().to_str().unwrap();
    assert!(cookie.contains("auth=auth_token_0"));
}

#[tokio::test]
async fn test_second_rejection_is_returned_unchanged() {
    let server = MockServer::start().await;
    mount_login_site(&server, Duration::ZERO).await;
    mount_tile(&server, PERSONAL_TILE_PATH, 401, 401).await;

    let proxy = tile_proxy(&server);
    let response = proxy
        .personal_tile(&TileRequest::new(1, 2, 3))
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(request_count(&server, "GET", PERSONAL_TILE_PATH).await, 2);
    assert_eq!(request_count(&server, "POST", "/session").await, 1);
}

#[tokio::test]
async fn test_personal_forbidden_is_not_an_auth_rejection() {
    let server = MockServer::start().await;
    mount_tile(&server, PERSONAL_TILE_PATH, 403, 403).await;

    let auth = Arc::new(CountingAuth::new());
    let proxy = counting_proxy(&server, Arc::clone(&auth));
    let response = proxy
        .personal_tile(&TileRequest::new(1, 2, 3))
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    assert_eq!(auth.logins(), 0);
    assert_eq!(request_count(&server, "GET", PERSONAL_TILE_PATH).await, 1);
}

#[tokio::test]
async fn test_upstream_errors_are_not_retried() {
    let server = MockServer::start().await;
    mount_tile(&server, PERSONAL_TILE_PATH, 500, 200).await;

    let auth = Arc::new(CountingAuth::new());
    let proxy = counting_proxy(&server, Arc::clone(&auth));
    let response = proxy
        .personal_tile(&TileRequest::new(1, 2, 3))
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(auth.logins(), 0);
}

#[tokio::test]
async fn test_failed_relogin_surfaces_login_error() {
    let server = MockServer::start().await;
    mount_tile(&server, PERSONAL_TILE_PATH, 401, 200).await;

    let auth = Arc::new(CountingAuth::failing());
    let proxy = counting_proxy(&server, Arc::clone(&auth));
    let err = proxy
        .personal_tile(&TileRequest::new(1, 2, 3))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProxyError::Login(LoginError::MissingCsrfToken(_))
    ));
    assert_eq!(auth.logins(), 1);
    // No retry after a failed login
    assert_eq!(request_count(&server, "GET", PERSONAL_TILE_PATH).await, 1);
}

#[tokio::test]
async fn test_concurrent_expiries_share_one_login() {
    let server = MockServer::start().await;
    mount_login_site(&server, Duration::from_millis(200)).await;

    // Every request without the session cookie is rejected
    Mock::given(method("GET"))
        .and(path(PERSONAL_TILE_PATH))
        .and(wiremock::matchers::header_exists("cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(TILE_BYTES))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PERSONAL_TILE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let proxy = Arc::new(tile_proxy(&server));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let proxy = Arc::clone(&proxy);
            tokio::spawn(async move {
                proxy
                    .personal_tile(&TileRequest::new(1, 2, 3))
                    .await
                    .map(|r| r.status())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 200);
    }
    assert_eq!(request_count(&server, "POST", "/session").await, 1);
    assert_eq!(request_count(&server, "GET", PERSONAL_TILE_PATH).await, 8);
}

#[tokio::test]
async fn test_personal_url_carries_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/tiles/{}/purple/7/8/9@2x.png", ATHLETE_ID)))
        .and(query_param("filter_type", "run"))
        .and(query_param("filter_start", "2011-01-01"))
        .and(query_param("include_everyone", "true"))
        .and(query_param("include_followers_only", "true"))
        .and(query_param("include_only_me", "true"))
        .and(query_param("respect_privacy_zones", "false"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = TileProxy::new(
        session(&server),
        PersonalHeatmap::new(ATHLETE_ID, Visibility::all()).with_base_url(server.uri()),
        super::test_utils::global_heatmap(&server),
    );
    let request = TileRequest::new(7, 8, 9)
        .with_heat(Heat::Purple)
        .with_sport(Sport::Run);
    let response = proxy.personal_tile(&request).await.unwrap();
    assert_eq!(response.status(), 200);

    let tiles = server.received_requests().await.unwrap();
    let filter_end = tiles[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "filter_end")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(filter_end.len(), "2024-01-01".len());
}

#[tokio::test]
async fn test_unreachable_tile_service_is_transport_error() {
    let server = MockServer::start().await;
    let auth = Arc::new(CountingAuth::new());
    let proxy = TileProxy::with_shared_auth(
        auth,
        PersonalHeatmap::new(ATHLETE_ID, Visibility::default())
            .with_base_url("http://127.0.0.1:9"),
        super::test_utils::global_heatmap(&server),
    );

    let err = proxy
        .personal_tile(&TileRequest::new(1, 2, 3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProxyError::UpstreamTransport { timeout: false, .. }
    ));
}

// =============================================================================
// Global Heatmap
// =============================================================================

#[tokio::test]
async fn test_global_forbidden_triggers_edge_auth() {
    let server = MockServer::start().await;
    mount_login_site(&server, Duration::ZERO).await;
    mount_tile(&server, GLOBAL_TILE_PATH, 403, 200).await;

    Mock::given(method("GET"))
        .and(path(EDGE_AUTH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "CloudFront-Policy=policy; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let proxy = tile_proxy(&server);
    let response = proxy
        .global_tile(&TileRequest::new(1, 2, 3))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(request_count(&server, "GET", GLOBAL_TILE_PATH).await, 2);
    assert_eq!(request_count(&server, "POST", "/session").await, 1);

    let tiles = requests_to(&server, GLOBAL_TILE_PATH).await;
    let cookie = tiles[1].headers.get("cookie").unwrap().to_str().unwrap();
    assert!(cookie.contains("CloudFront-Policy=policy"));
}

#[tokio::test]
async fn test_global_edge_auth_targets_chosen_edge() {
    let server = MockServer::start().await;
    mount_tile(&server, GLOBAL_TILE_PATH, 401, 200).await;

    let auth = Arc::new(CountingAuth::new());
    let proxy = counting_proxy(&server, Arc::clone(&auth));
    let request = TileRequest::new(1, 2, 3);
    let response = proxy.global_tile(&request).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(auth.edge_auths(), vec![format!("{}/a", server.uri())]);
}

#[tokio::test]
async fn test_global_path_uses_sport_and_color() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a/tiles-auth/water/bluered/4/5/6@2x.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let auth = Arc::new(CountingAuth::new());
    let proxy = counting_proxy(&server, auth);
    let request = TileRequest::new(4, 5, 6)
        .with_heat(Heat::BlueRed)
        .with_sport(Sport::Water);

    let response = proxy.global_tile(&request).await.unwrap();
    assert_eq!(response.status(), 200);

    let tiles = server.received_requests().await.unwrap();
    assert!(tiles[0].url.query().is_none());
}
