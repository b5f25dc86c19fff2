//! Live match scheduling and odds-caching core.
//!
//! Architecture:
//! - Tokio async runtime for concurrent jobs and cache reads
//! - Rate-limited REST client for the upstream sports-data feed
//! - TTL caches for fixtures/leagues, live matches, and classified odds
//! - Kickoff check queue with bounded retry and a delayed-match set
//! - Diff-based cleanup sweeper evicting finished matches
//! - Event channel for a downstream real-time fan-out layer

mod api;
mod cache;
mod config;
mod data;
mod odds;
mod schedule;
mod service;

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{error, info};

use api::client::SportsFeedClient;
use config::Settings;
use data::models::LiveEvent;
use schedule::jobs::{self, JobContext, JobsConfig};
use schedule::queue::ScheduleQueue;
use schedule::sweeper::CleanupSweeper;
use service::LiveOddsService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration.
    let settings = Settings::from_env();

    // Initialize logging.
    init_logging(&settings);

    info!("=== Live Match & Odds Core ===");
    info!(
        feed_base_url = %settings.feed_base_url,
        refresh_at = ?settings.daily_refresh_at,
        "Configuration loaded"
    );

    // Validate settings.
    if let Err(errors) = settings.validate() {
        for e in &errors {
            error!(error = %e, "Configuration error");
        }
        anyhow::bail!("Configuration validation failed");
    }

    // Upstream feed client.
    let client = SportsFeedClient::new(
        &settings.feed_base_url,
        &settings.feed_api_key,
        settings.feed_rate_limit,
        settings.feed_max_retries,
        settings.feed_timeout_secs,
        settings.odds_timeout_secs,
    )?;

    // Event channel for the downstream fan-out layer.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<LiveEvent>();

    // Cache services, constructed once and shared by handle.
    let service = Arc::new(LiveOddsService::new(client, event_tx));
    let queue = Arc::new(Mutex::new(ScheduleQueue::new()));
    let sweeper = Arc::new(CleanupSweeper::new(
        service.live.clone(),
        service.odds.clone(),
    ));

    // Shutdown signal.
    let shutdown = Arc::new(Notify::new());
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
        info!("Shutdown signal received");
        shutdown_clone.notify_waiters();
    });

    let ctx = JobContext {
        service: service.clone(),
        queue,
        sweeper,
        config: JobsConfig {
            refresh_at: settings.daily_refresh_at,
            fixture_range_days: settings.fixture_range_days,
            kickoff_tick: Duration::from_secs(settings.kickoff_tick_secs),
            sweep_interval: Duration::from_secs(settings.sweep_interval_secs),
        },
        shutdown: shutdown.clone(),
    };

    // Prime the caches and today's kickoff plan before the jobs start.
    info!("Running initial refresh...");
    jobs::run_refresh(&ctx).await;

    let handles = jobs::spawn_all(ctx);
    info!(jobs = handles.len(), "Scheduler jobs started");

    // Drain live events. A real deployment hands these to the push/fan-out
    // layer; here they are logged.
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("Shutting down event loop...");
                break;
            }
            Some(event) = event_rx.recv() => {
                match event {
                    LiveEvent::MatchLive { fixture_id } => {
                        info!(fixture_id, "Event: match went live");
                    }
                    LiveEvent::OddsUpdated { fixture_id } => {
                        info!(fixture_id, "Event: odds updated");
                    }
                }
            }
        }
    }

    // Graceful shutdown.
    for handle in handles {
        let _ = handle.await;
    }
    info!("Core shutdown complete.");

    Ok(())
}

fn init_logging(settings: &Settings) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    if settings.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
