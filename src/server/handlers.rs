//! HTTP request handlers for the tile proxy.
//!
//! This module contains the Axum handlers for proxying tiles and health checks.
//!
//! # Endpoints
//!
//! - `GET /personal/{*path}` - Personal heatmap tile, path ends in `{z}/{x}/{y}`
//! - `GET /global/{*path}` - Global heatmap tile, path ends in `{z}/{x}/{y}`
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{ProxyError, TileParamError};
use crate::session::Authenticator;
use crate::tile::{forward_response, TileProxy, TileRequest};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile proxy.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<A: Authenticator> {
    /// The tile proxy holding the upstream session
    pub tile_proxy: Arc<TileProxy<A>>,
}

impl<A: Authenticator> AppState<A> {
    pub fn new(tile_proxy: TileProxy<A>) -> Self {
        Self {
            tile_proxy: Arc::new(tile_proxy),
        }
    }
}

impl<A: Authenticator> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            tile_proxy: Arc::clone(&self.tile_proxy),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "login_failed")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    // 5xx at ERROR, 404s at DEBUG (scanners hit these constantly), other 4xx at WARN
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

/// Convert TileParamError to HTTP response.
impl IntoResponse for TileParamError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TileParamError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            TileParamError::BadCoordinate(_) => (StatusCode::BAD_REQUEST, "invalid_coordinate"),
            TileParamError::BadQueryValue { .. } => (StatusCode::BAD_REQUEST, "invalid_query"),
        };

        error_response(status, error_type, self.to_string())
    }
}

/// Convert ProxyError to HTTP response.
///
/// A failed login is the proxy's own fault (500); an unreachable tile service
/// is the upstream's (502, or 504 when the request timed out).
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ProxyError::Login(_) => (StatusCode::INTERNAL_SERVER_ERROR, "login_failed"),
            ProxyError::UpstreamTransport { timeout: true, .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout")
            }
            ProxyError::UpstreamTransport { timeout: false, .. } => {
                (StatusCode::BAD_GATEWAY, "upstream_unreachable")
            }
        };

        error_response(status, error_type, self.to_string())
    }
}

/// Errors a tile handler can return.
#[derive(Debug)]
pub enum HandlerError {
    Params(TileParamError),
    Proxy(ProxyError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Params(err) => err.into_response(),
            HandlerError::Proxy(err) => err.into_response(),
        }
    }
}

impl From<TileParamError> for HandlerError {
    fn from(err: TileParamError) -> Self {
        HandlerError::Params(err)
    }
}

impl From<ProxyError> for HandlerError {
    fn from(err: ProxyError) -> Self {
        HandlerError::Proxy(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle personal heatmap tile requests.
///
/// # Endpoint
///
/// `GET /personal/{*path}`
///
/// The last three path segments are `{z}/{x}/{y}`; anything before them is
/// ignored.
///
/// # Query Parameters
///
/// - `color`: Heat color (default: `hot`)
/// - `sport`: Activity filter (default: `all`)
///
/// # Response
///
/// - Upstream status, headers and body, streamed
/// - `400 Bad Request`: Coordinate overflow or unknown color/sport
/// - `404 Not Found`: Path does not end in three numeric segments
/// - `500 Internal Server Error`: Re-authentication failed
/// - `502 Bad Gateway` / `504 Gateway Timeout`: Tile service unreachable
pub async fn personal_tile_handler<A: Authenticator + 'static>(
    State(state): State<AppState<A>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, HandlerError> {
    let request = TileRequest::from_parts(&path, query.as_deref())?;
    let upstream = state.tile_proxy.personal_tile(&request).await?;
    Ok(forward_response(upstream))
}

/// Handle global heatmap tile requests.
///
/// # Endpoint
///
/// `GET /global/{*path}`
///
/// Same path, query and response contract as [`personal_tile_handler`].
/// The tile is fetched from a randomly chosen edge server.
pub async fn global_tile_handler<A: Authenticator + 'static>(
    State(state): State<AppState<A>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, HandlerError> {
    let request = TileRequest::from_parts(&path, query.as_deref())?;
    let upstream = state.tile_proxy.global_tile(&request).await?;
    Ok(forward_response(upstream))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
