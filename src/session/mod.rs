//! Upstream session management.
//!
//! This module owns the single login session the proxy shares across all
//! requests, and the single-flight protocol that keeps concurrent callers
//! from logging in more than once at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Session                              │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │ Credentials │  │  cookie Jar  │  │ LoginClaim + login     │  │
//! │  │ (immutable) │  │  (shared)    │  │ mutex (single-flight)  │  │
//! │  └─────────────┘  └──────────────┘  └───────────┬────────────┘  │
//! └─────────────────────────────────────────────────┼───────────────┘
//!                                                   │ claimant only
//!                                                   ▼
//!                                   ┌───────────────────────────────┐
//!                                   │ bootstrap()                   │
//!                                   │ GET /login → extract_csrf()   │
//!                                   │ POST /session (form)          │
//!                                   └───────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use strava_tile_proxy::session::{Credentials, Session};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(Credentials::new("me@example.com", "secret"))?;
//!
//! // Any number of tasks may call this at once; one exchange happens.
//! session.login().await?;
//! # Ok(())
//! # }
//! ```

mod claim;
mod coordinator;
mod credentials;
mod csrf;

pub use claim::{ClaimGuard, LoginClaim};
pub use coordinator::{Authenticator, Session, DEFAULT_REQUEST_TIMEOUT, USER_AGENT};
pub use credentials::{Credentials, DEFAULT_STRAVA_URL};
pub use csrf::{bootstrap, extract_csrf, CsrfToken, CSRF_PARAM_META, CSRF_TOKEN_META};
