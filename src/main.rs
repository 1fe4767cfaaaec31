// Copyright 2026 Reelscout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::Parser;
use reelscout::cache::{self, ResponseCache};
use reelscout::extract::DEFAULT_ORIGIN;
use reelscout::renderer::gateway::{ChromiumFactory, RenderGateway};
use reelscout::rest::{self, AppState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Interval between cache sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser)]
#[command(
    name = "reelscout",
    about = "Headless-browser scraping API for movie/series catalog sites",
    version
)]
struct Cli {
    /// Listen port (falls back to the PORT env var, then 3001)
    #[arg(long)]
    port: Option<u16>,

    /// Enable verbose/debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "reelscout=debug"
    } else {
        "reelscout=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().context("bad log directive")?),
        )
        .init();

    let port = cli
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(3001);
    let origin =
        std::env::var("CATALOG_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());

    info!(
        "starting reelscout v{} (origin {origin})",
        env!("CARGO_PKG_VERSION")
    );

    let state = Arc::new(AppState {
        gateway: Arc::new(RenderGateway::new(Box::new(ChromiumFactory))),
        cache: Arc::new(ResponseCache::new(cache::DEFAULT_TTL)),
        origin,
        started_at: Instant::now(),
    });

    // Periodic sweep so expired entries do not pile up between lookups.
    let sweep_cache = Arc::clone(&state.cache);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_INTERVAL);
        tick.tick().await; // the first tick fires immediately
        loop {
            tick.tick().await;
            let removed = sweep_cache.cleanup_expired().await;
            if removed > 0 {
                debug!(removed, "cache sweep");
            }
        }
    });

    rest::start(port, Arc::clone(&state)).await?;

    info!(
        uptime_s = state.started_at.elapsed().as_secs(),
        active_tabs = state.gateway.active_contexts(),
        "closing browser"
    );
    if let Err(e) = state.gateway.shutdown().await {
        warn!("browser shutdown failed: {e}");
    }
    Ok(())
}
