//! Upstream heatmap variants and their tile URL templates.
//!
//! Two tile services sit behind the proxy:
//!
//! ```text
//! personal: {personal}/tiles/{athlete}/{color}/{z}/{x}/{y}@2x.png?{filters}
//! global:   {edge(server)}/tiles-auth/{sport}/{color}/{z}/{x}/{y}@2x.png
//! ```
//!
//! The personal heatmap sits behind the login session and rejects a stale
//! session with 401. The global heatmap sits behind a CDN edge that answers
//! 401 or 403 until its own cookies are issued via `{edge}/auth`.

use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use url::form_urlencoded;

use super::fetcher::RetryPolicy;
use super::params::TileRequest;

/// Default personal heatmap origin.
pub const DEFAULT_PERSONAL_HEATMAP_URL: &str = "https://personal-heatmaps-external.strava.com";

/// Default global heatmap edge template.
pub const DEFAULT_GLOBAL_HEATMAP_URL: &str = "https://heatmap-external-{server}.strava.com";

/// Placeholder substituted with the edge server name.
pub const SERVER_PLACEHOLDER: &str = "{server}";

/// Edge servers a global tile request is spread over.
pub const HEATMAP_SERVERS: &[&str] = &["a", "b", "c"];

/// Earliest activity date requested for personal heatmaps.
pub const FILTER_START: &str = "2011-01-01";

// =============================================================================
// Personal Heatmap
// =============================================================================

/// Which of the athlete's activities the personal heatmap reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Visibility {
    /// Draw tracks inside privacy zones
    pub reveal_privacy_zones: bool,

    /// Include activities visible only to the athlete
    pub reveal_only_me: bool,

    /// Include follower-only activities
    pub reveal_followers_only: bool,

    /// Include public activities
    pub reveal_public: bool,
}

impl Visibility {
    /// Reveal everything, privacy zones included.
    pub fn all() -> Self {
        Self {
            reveal_privacy_zones: true,
            reveal_only_me: true,
            reveal_followers_only: true,
            reveal_public: true,
        }
    }
}

/// The athlete's personal heatmap, served behind the login session.
#[derive(Debug, Clone)]
pub struct PersonalHeatmap {
    base_url: String,
    athlete_id: String,
    visibility: Visibility,
    policy: RetryPolicy,
}

impl PersonalHeatmap {
    pub fn new(athlete_id: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            base_url: DEFAULT_PERSONAL_HEATMAP_URL.to_string(),
            athlete_id: athlete_id.into(),
            visibility,
            policy: RetryPolicy::session(),
        }
    }

    /// Point at a different origin (trailing slash ignored).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override which statuses count as an expired session.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn athlete_id(&self) -> &str {
        &self.athlete_id
    }

    /// Build the upstream URL for `request`, filtering activities up to `today`.
    pub fn tile_url(&self, request: &TileRequest, today: NaiveDate) -> String {
        let v = &self.visibility;
        let today = today.format("%Y-%m-%d").to_string();

        // Keys in sorted order
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("filter_end", &today)
            .append_pair("filter_start", FILTER_START)
            .append_pair("filter_type", request.sport.as_str())
            .append_pair("include_everyone", bool_str(v.reveal_public))
            .append_pair("include_followers_only", bool_str(v.reveal_followers_only))
            .append_pair("include_only_me", bool_str(v.reveal_only_me))
            .append_pair("respect_privacy_zones", bool_str(!v.reveal_privacy_zones))
            .finish();

        let c = request.coords;
        format!(
            "{}/tiles/{}/{}/{}/{}/{}@2x.png?{}",
            self.base_url, self.athlete_id, request.heat, c.z, c.x, c.y, query
        )
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// =============================================================================
// Global Heatmap
// =============================================================================

/// The global heatmap, served by CDN edges that need their own authorization.
#[derive(Debug, Clone)]
pub struct GlobalHeatmap {
    url_template: String,
    servers: Vec<String>,
    policy: RetryPolicy,
}

impl Default for GlobalHeatmap {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalHeatmap {
    pub fn new() -> Self {
        Self {
            url_template: DEFAULT_GLOBAL_HEATMAP_URL.to_string(),
            servers: HEATMAP_SERVERS.iter().map(|s| s.to_string()).collect(),
            policy: RetryPolicy::edge(),
        }
    }

    /// Use a different edge template. `{server}` is replaced by the server name.
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into().trim_end_matches('/').to_string();
        self
    }

    /// Restrict the edge servers requests are spread over.
    ///
    /// An empty list keeps the current servers.
    pub fn with_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let servers: Vec<String> = servers.into_iter().map(Into::into).collect();
        if !servers.is_empty() {
            self.servers = servers;
        }
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Pick an edge server uniformly at random.
    pub fn pick_server(&self) -> &str {
        self.servers
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or(HEATMAP_SERVERS[0])
    }

    /// Origin of the edge named `server`.
    pub fn edge_url(&self, server: &str) -> String {
        self.url_template.replace(SERVER_PLACEHOLDER, server)
    }

    /// Build the tile URL on the edge at `edge_url`.
    pub fn tile_url(&self, edge_url: &str, request: &TileRequest) -> String {
        let c = request.coords;
        format!(
            "{}/tiles-auth/{}/{}/{}/{}/{}@2x.png",
            edge_url, request.sport, request.heat, c.z, c.x, c.y
        )
    }
}
