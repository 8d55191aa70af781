use thiserror::Error;

/// Errors raised while establishing an upstream login session
#[derive(Debug, Clone, Error)]
pub enum LoginError {
    /// The login page did not carry both CSRF meta tags
    #[error("Missing CSRF token: login page has no {0} meta tag")]
    MissingCsrfToken(&'static str),

    /// Network or connection error during the login exchange
    #[error("Login transport error: {0}")]
    Transport(String),

    /// The login page or credential submission returned a non-2xx status
    #[error("Login rejected: {stage} returned HTTP {status}")]
    Rejected { stage: &'static str, status: u16 },
}

impl From<reqwest::Error> for LoginError {
    fn from(err: reqwest::Error) -> Self {
        LoginError::Transport(err.to_string())
    }
}

/// Errors surfaced by the tile proxy pipeline
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// Re-authentication failed before the retry could be issued
    #[error("Login failed: {0}")]
    Login(#[from] LoginError),

    /// The tile service could not be reached
    #[error("Upstream transport error: {message}")]
    UpstreamTransport { message: String, timeout: bool },
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::UpstreamTransport {
            timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// Errors produced while turning an inbound request into a tile request.
///
/// These never reach the proxy pipeline; the HTTP layer answers them directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileParamError {
    /// The path does not end in a `z/x/y` triple of digits
    #[error("Not found")]
    NotFound,

    /// A coordinate is all digits but does not fit in a u64
    #[error("invalid tile {0}")]
    BadCoordinate(&'static str),

    /// An unrecognized `color` or `sport` value
    #[error("invalid query parameter {param}: unknown {kind} {value:?}")]
    BadQueryValue {
        param: &'static str,
        kind: &'static str,
        value: String,
    },
}
