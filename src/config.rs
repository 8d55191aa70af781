//! Configuration management for the tile proxy.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables (`STRAVA_*` for the account, `PROXY_*` for the server)
//! - Defaults pointing at the public Strava endpoints
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use strava_tile_proxy::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//!
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `PROXY_HOST` - Server bind address (default: 0.0.0.0)
//! - `PROXY_PORT` - Server port (default: 8080)
//! - `STRAVA_EMAIL` - Account email (required)
//! - `STRAVA_PASSWORD` - Account password (required)
//! - `ATHLETE_ID` - Athlete whose personal heatmap is served (required)
//! - `REVEAL_PRIVACY_ZONES` - Draw tracks inside privacy zones (default: false)
//! - `REVEAL_ONLY_ME_ACTIVITIES` - Include "only me" activities (default: false)
//! - `REVEAL_FOLLOWER_ONLY_ACTIVITIES` - Include follower-only activities (default: false)
//! - `REVEAL_PUBLIC_ACTIVITIES` - Include public activities (default: false)
//! - `STRAVA_URL` - Login site origin
//! - `PERSONAL_HEATMAP_URL` - Personal heatmap origin
//! - `GLOBAL_HEATMAP_URL` - Global heatmap edge template containing `{server}`
//! - `PROXY_REQUEST_TIMEOUT` - Upstream request timeout in seconds (default: 30)
//! - `PROXY_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::fmt;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use url::Url;

use crate::session::{Credentials, DEFAULT_STRAVA_URL};
use crate::tile::{
    GlobalHeatmap, PersonalHeatmap, Visibility, DEFAULT_GLOBAL_HEATMAP_URL,
    DEFAULT_PERSONAL_HEATMAP_URL, SERVER_PLACEHOLDER,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default upstream request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Strava Tile Proxy - serves Strava heatmap tiles without a browser session.
///
/// Logs in with the configured account and forwards personal and global
/// heatmap tile requests, re-authenticating when the session expires.
#[derive(Parser, Clone)]
#[command(name = "strava-tile-proxy")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PROXY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PROXY_PORT")]
    pub port: u16,

    // =========================================================================
    // Account Configuration
    // =========================================================================
    /// Strava account email.
    #[arg(long, env = "STRAVA_EMAIL")]
    pub email: String,

    /// Strava account password.
    #[arg(long, env = "STRAVA_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Athlete whose personal heatmap is served.
    #[arg(long, env = "ATHLETE_ID")]
    pub athlete_id: String,

    // =========================================================================
    // Personal Heatmap Visibility
    // =========================================================================
    /// Draw tracks inside privacy zones.
    #[arg(long, env = "REVEAL_PRIVACY_ZONES", action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), default_value_t = false,
          num_args = 0..=1, default_missing_value = "true")]
    pub reveal_privacy_zones: bool,

    /// Include activities visible only to the athlete.
    #[arg(long, env = "REVEAL_ONLY_ME_ACTIVITIES", action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), default_value_t = false,
          num_args = 0..=1, default_missing_value = "true")]
    pub reveal_only_me_activities: bool,

    /// Include follower-only activities.
    #[arg(long, env = "REVEAL_FOLLOWER_ONLY_ACTIVITIES", action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), default_value_t = false,
          num_args = 0..=1, default_missing_value = "true")]
    pub reveal_follower_only_activities: bool,

    /// Include public activities.
    #[arg(long, env = "REVEAL_PUBLIC_ACTIVITIES", action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), default_value_t = false,
          num_args = 0..=1, default_missing_value = "true")]
    pub reveal_public_activities: bool,

    // =========================================================================
    // Upstream Configuration
    // =========================================================================
    /// Origin of the login site.
    #[arg(long, default_value = DEFAULT_STRAVA_URL, env = "STRAVA_URL")]
    pub strava_url: String,

    /// Origin of the personal heatmap tile service.
    #[arg(long, default_value = DEFAULT_PERSONAL_HEATMAP_URL, env = "PERSONAL_HEATMAP_URL")]
    pub personal_heatmap_url: String,

    /// Global heatmap edge template; `{server}` is replaced by a, b or c.
    #[arg(long, default_value = DEFAULT_GLOBAL_HEATMAP_URL, env = "GLOBAL_HEATMAP_URL")]
    pub global_heatmap_url: String,

    /// Upstream request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "PROXY_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "PROXY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !looks_like_email(&self.email) {
            return Err(format!(
                "Invalid email address '{}'. Set --email or STRAVA_EMAIL",
                self.email
            ));
        }

        if self.password.is_empty() {
            return Err("Password is required. Set --password or STRAVA_PASSWORD".to_string());
        }

        if self.athlete_id.trim().is_empty() {
            return Err("Athlete ID is required. Set --athlete-id or ATHLETE_ID".to_string());
        }

        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }

        check_url("strava_url", &self.strava_url)?;
        check_url("personal_heatmap_url", &self.personal_heatmap_url)?;

        if !self.global_heatmap_url.contains(SERVER_PLACEHOLDER) {
            return Err(format!(
                "global_heatmap_url must contain the {} placeholder",
                SERVER_PLACEHOLDER
            ));
        }
        check_url(
            "global_heatmap_url",
            &self.global_heatmap_url.replace(SERVER_PLACEHOLDER, "a"),
        )?;

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::with_base_url(&self.email, &self.password, &self.strava_url)
    }

    pub fn visibility(&self) -> Visibility {
        Visibility {
            reveal_privacy_zones: self.reveal_privacy_zones,
            reveal_only_me: self.reveal_only_me_activities,
            reveal_followers_only: self.reveal_follower_only_activities,
            reveal_public: self.reveal_public_activities,
        }
    }

    pub fn personal_heatmap(&self) -> PersonalHeatmap {
        PersonalHeatmap::new(self.athlete_id.trim(), self.visibility())
            .with_base_url(&self.personal_heatmap_url)
    }

    pub fn global_heatmap(&self) -> GlobalHeatmap {
        GlobalHeatmap::new().with_url_template(&self.global_heatmap_url)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("athlete_id", &self.athlete_id)
            .field("reveal_privacy_zones", &self.reveal_privacy_zones)
            .field("reveal_only_me_activities", &self.reveal_only_me_activities)
            .field(
                "reveal_follower_only_activities",
                &self.reveal_follower_only_activities,
            )
            .field("reveal_public_activities", &self.reveal_public_activities)
            .field("strava_url", &self.strava_url)
            .field("personal_heatmap_url", &self.personal_heatmap_url)
            .field("global_heatmap_url", &self.global_heatmap_url)
            .field("request_timeout", &self.request_timeout)
            .field("cors_origins", &self.cors_origins)
            .field("verbose", &self.verbose)
            .field("no_tracing", &self.no_tracing)
            .finish()
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
}

fn check_url(name: &str, value: &str) -> Result<(), String> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| format!("{} '{}' is not a valid URL: {}", name, value, e))
}

// =============================================================================
// Tests
// =============================================================================
