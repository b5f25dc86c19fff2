//! Background job loops driving the scheduling core.
//!
//! Three long-lived tasks: the daily wholesale refresh, the kickoff check
//! loop, and the combined cleanup/delayed sweep. Each job is one sequential
//! task, so iterations of the same job can never overlap (single-flight by
//! construction); a failed iteration logs and is retried on the job's next
//! natural interval.

use chrono::{Duration as ChronoDuration, NaiveTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::client::SportsFeedClient;
use crate::api::feed::UpstreamFeed;
use crate::config::RefreshTime;
use crate::data::models::LiveScore;
use crate::service::{DateRange, LiveOddsService};

use super::queue::ScheduleQueue;
use super::sweeper::CleanupSweeper;

#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub refresh_at: RefreshTime,
    pub fixture_range_days: i64,
    pub kickoff_tick: Duration,
    pub sweep_interval: Duration,
}

#[derive(Clone)]
pub struct JobContext {
    pub service: Arc<LiveOddsService<SportsFeedClient>>,
    pub queue: Arc<Mutex<ScheduleQueue>>,
    pub sweeper: Arc<CleanupSweeper>,
    pub config: JobsConfig,
    pub shutdown: Arc<Notify>,
}

/// Spawn all scheduler jobs. Handles resolve once shutdown is signalled.
pub fn spawn_all(ctx: JobContext) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(daily_refresh_loop(ctx.clone())),
        tokio::spawn(kickoff_check_loop(ctx.clone())),
        tokio::spawn(sweep_loop(ctx)),
    ]
}

fn today_range(days: i64) -> DateRange {
    let today = Utc::now().date_naive();
    DateRange {
        from: today,
        to: today + ChronoDuration::days(days),
    }
}

// =============================================================================
// Daily refresh
// =============================================================================

async fn daily_refresh_loop(ctx: JobContext) {
    info!(
        hour = ctx.config.refresh_at.hour,
        minute = ctx.config.refresh_at.minute,
        "Daily refresh job starting"
    );

    loop {
        let wait = until_next_refresh(ctx.config.refresh_at);
        tokio::select! {
            _ = ctx.shutdown.notified() => {
                info!("Daily refresh job received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                run_refresh(&ctx).await;
            }
        }
    }
}

/// Fetch-then-swap refresh plus re-planning of today's kickoff checks.
pub async fn run_refresh(ctx: &JobContext) {
    let range = today_range(ctx.config.fixture_range_days);
    match ctx.service.refresh_all(range).await {
        Ok(fixtures) => {
            let now = Utc::now();
            ctx.queue.lock().await.plan_day(&fixtures, now);
        }
        Err(e) => {
            // Previous cache contents stay in place; next cycle retries.
            warn!(error = %e, "Daily refresh failed, keeping previous caches");
        }
    }
}

fn until_next_refresh(at: RefreshTime) -> Duration {
    let now = Utc::now();
    let target_time = NaiveTime::from_hms_opt(at.hour, at.minute, 0)
        .unwrap_or(NaiveTime::MIN);
    let mut target = now.date_naive().and_time(target_time).and_utc();
    if target <= now {
        target += ChronoDuration::days(1);
    }
    (target - now).to_std().unwrap_or(Duration::from_secs(60))
}

// =============================================================================
// Kickoff checks
// =============================================================================

async fn kickoff_check_loop(ctx: JobContext) {
    info!(
        tick_secs = ctx.config.kickoff_tick.as_secs(),
        "Kickoff check job starting"
    );

    loop {
        tokio::select! {
            _ = ctx.shutdown.notified() => {
                info!("Kickoff check job received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(ctx.config.kickoff_tick) => {
                run_kickoff_checks(&ctx).await;
            }
        }
    }
}

async fn run_kickoff_checks(ctx: &JobContext) {
    let now = Utc::now();
    let due = ctx.queue.lock().await.take_due(now);
    if due.is_empty() {
        return;
    }
    debug!(buckets = due.len(), "Kickoff buckets due, querying live feed");

    let live = match ctx.service.feed().live_scores().await {
        Ok(live) => live,
        Err(e) => {
            // Put the buckets back untouched; the next tick retries without
            // consuming the retry budget.
            warn!(error = %e, "Livescore fetch failed, re-queueing due buckets");
            ctx.queue.lock().await.restore(due);
            return;
        }
    };

    let mut started = Vec::new();
    {
        let mut queue = ctx.queue.lock().await;
        for bucket in due {
            let outcome = queue.on_check_result(bucket, &live, now);
            started.extend(outcome.started);
        }
    }

    promote_started(ctx, &started, &live).await;
}

/// Move confirmed fixtures into the live cache and prefetch their odds.
async fn promote_started(ctx: &JobContext, started: &[i64], live: &[LiveScore]) {
    let now = Utc::now();

    for &fixture_id in started {
        let Some(score) = live.iter().find(|s| s.fixture_id == fixture_id) else {
            continue;
        };
        match ctx.service.fixtures.find(fixture_id) {
            Some(fixture) => ctx.service.confirm_live(fixture, score, now),
            None => warn!(fixture_id, "Started fixture missing from fixture store"),
        }
    }

    // Odds prefetch, concurrently per fixture.
    let fetches = started.iter().map(|&id| ctx.service.get_odds(id));
    let fetched = join_all(fetches).await;
    debug!(
        started = started.len(),
        odds_available = fetched.iter().filter(|o| o.is_some()).count(),
        "Promoted started fixtures"
    );
}

// =============================================================================
// Cleanup / delayed sweep
// =============================================================================

async fn sweep_loop(ctx: JobContext) {
    info!(
        interval_secs = ctx.config.sweep_interval.as_secs(),
        "Cleanup sweep job starting"
    );

    loop {
        tokio::select! {
            _ = ctx.shutdown.notified() => {
                info!("Cleanup sweep job received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(ctx.config.sweep_interval) => {
                run_sweep(&ctx).await;
            }
        }
    }
}

pub async fn run_sweep(ctx: &JobContext) {
    // Idle optimization: no upstream call when there is nothing to diff.
    {
        let queue = ctx.queue.lock().await;
        if !ctx.sweeper.needs_upstream(&queue) {
            debug!("Sweep idle, skipping livescore fetch");
            return;
        }
    }

    let live = match ctx.service.feed().live_scores().await {
        Ok(live) => live,
        Err(e) => {
            warn!(error = %e, "Livescore fetch failed, sweep retried next interval");
            return;
        }
    };
    let now = Utc::now();

    // Delayed matches that started meanwhile get promoted.
    let resolved = {
        let mut queue = ctx.queue.lock().await;
        queue.sweep_delayed(&live, now)
    };
    promote_started(ctx, &resolved.resolved, &live).await;

    // Renew timing snapshots for matches still reported live.
    for entry in ctx.service.live.all_entries(now) {
        if let Some(score) = live.iter().find(|s| s.fixture_id == entry.fixture.id) {
            ctx.service.confirm_live(entry.fixture, score, now);
        }
    }

    // Diff-based eviction of finished matches.
    let live_ids: Vec<i64> = live
        .iter()
        .filter(|s| s.has_started())
        .map(|s| s.fixture_id)
        .collect();
    let mut queue = ctx.queue.lock().await;
    ctx.sweeper.sweep(&live_ids, &mut queue, now);
}
