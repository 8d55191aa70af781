//! Strava Tile Proxy - serves Strava heatmap tiles without a browser session.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strava_tile_proxy::{
    config::Config,
    server::{create_router, RouterConfig},
    session::Session,
    tile::TileProxy,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Strava Tile Proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Account: {}", config.email);
    info!("  Athlete: {}", config.athlete_id);
    info!("  Login site: {}", config.strava_url);
    info!("  Personal heatmap: {}", config.personal_heatmap_url);
    info!("  Global heatmap: {}", config.global_heatmap_url);
    info!("  Request timeout: {}s", config.request_timeout);

    let visibility = config.visibility();
    info!(
        "  Reveal: privacy zones={}, only me={}, followers only={}, public={}",
        visibility.reveal_privacy_zones,
        visibility.reveal_only_me,
        visibility.reveal_followers_only,
        visibility.reveal_public
    );
    if visibility.reveal_privacy_zones {
        warn!("  Privacy zones are revealed to anyone who can reach this proxy");
    }

    let session = match Session::with_timeout(config.credentials(), config.request_timeout()) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to build upstream HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // The first tile request triggers the login; nothing is fetched up front.
    let tile_proxy = TileProxy::new(
        session,
        config.personal_heatmap(),
        config.global_heatmap(),
    );

    let router = create_router(tile_proxy, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!("    curl -o tile.png http://{}/personal/10/163/395", addr);
    info!("    curl -o tile.png 'http://{}/global/10/163/395?color=blue&sport=ride'", addr);
    info!("");

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "strava_tile_proxy=debug,tower_http=debug"
    } else {
        "strava_tile_proxy=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}
