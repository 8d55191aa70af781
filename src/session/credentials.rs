//! Login credentials for the upstream account.

use std::fmt;

/// Default base URL of the upstream login service.
pub const DEFAULT_STRAVA_URL: &str = "https://www.strava.com";

/// Identity, secret and login base URL for the single upstream account.
///
/// Credentials are fixed for the lifetime of the process. The secret is kept
/// out of `Debug` output so the struct can be logged safely.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
    base_url: String,
}

impl Credentials {
    /// Create credentials that log in against the public Strava site.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_base_url(email, password, DEFAULT_STRAVA_URL)
    }

    /// Create credentials for a custom login base URL.
    ///
    /// A trailing slash on `base_url` is ignored.
    pub fn with_base_url(
        email: impl Into<String>,
        password: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            email: email.into(),
            password: password.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the page carrying the CSRF meta tags.
    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url)
    }

    /// URL the credential form is posted to.
    pub fn session_url(&self) -> String {
        format!("{}/session", self.base_url)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
