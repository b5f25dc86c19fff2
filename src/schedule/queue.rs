//! Kickoff scheduling state machine.
//!
//! Today's not-yet-started fixtures are grouped into buckets by kickoff
//! minute. Each bucket fires a check against the livescore feed at its
//! kickoff instant; fixtures not yet started are carried into a bounded
//! retry cycle (5-minute spacing, 10 retries), and fixtures reporting the
//! indefinite-delay state code move to a separate delayed set that is swept
//! on its own fixed interval.
//!
//! The queue is a plain synchronous state machine; the async job loops in
//! `schedule::jobs` own the upstream calls and feed results back in, which
//! keeps every transition independently testable.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::data::models::{Fixture, LiveScore};

/// Spacing between retry checks for a bucket.
pub fn retry_interval() -> Duration {
    Duration::minutes(5)
}

/// A bucket is abandoned after this many retries without confirmation.
pub const MAX_KICKOFF_RETRIES: u32 = 10;

/// Delayed entries are dropped past this age or check count.
pub fn delayed_max_age() -> Duration {
    Duration::hours(3)
}
pub const DELAYED_MAX_CHECKS: u32 = 20;

/// One kickoff-minute bucket of pending fixtures.
#[derive(Debug, Clone)]
pub struct KickoffBucket {
    pub kickoff: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub fixture_ids: Vec<i64>,
    pub retries: u32,
}

/// A fixture whose kickoff passed without upstream confirmation, flagged
/// indefinitely delayed. Excluded from the bucket retry cycle.
#[derive(Debug, Clone)]
pub struct DelayedMatchEntry {
    pub fixture_id: i64,
    pub expected_kickoff: DateTime<Utc>,
    pub checks: u32,
}

/// Result of applying one livescore check to a due bucket.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    /// Confirmed started; the caller promotes these into the live cache.
    pub started: Vec<i64>,
    /// Moved to the delayed set (indefinite-delay state code).
    pub delayed: Vec<i64>,
    /// Carried into a rescheduled bucket.
    pub retrying: Vec<i64>,
    /// Dropped after exhausting the retry bound.
    pub abandoned: Vec<i64>,
}

/// Result of one delayed-set sweep.
#[derive(Debug, Default)]
pub struct DelayedSweepOutcome {
    /// Now ticking; the caller promotes these into the live cache.
    pub resolved: Vec<i64>,
    /// Removed without resolving (no longer delayed, or entry went stale).
    pub cleared: Vec<i64>,
}

#[derive(Debug, Default)]
pub struct ScheduleQueue {
    buckets: Vec<KickoffBucket>,
    delayed: HashMap<i64, DelayedMatchEntry>,
}

impl ScheduleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan check buckets for today's fixtures. Fixtures that already kicked
    /// off are bucketed as immediately due, so a late daily refresh still
    /// checks them.
    pub fn plan_day(&mut self, fixtures: &[Fixture], now: DateTime<Utc>) {
        let today = now.date_naive();
        let mut by_minute: HashMap<DateTime<Utc>, Vec<i64>> = HashMap::new();

        for fixture in fixtures {
            if fixture.kickoff.date_naive() != today {
                continue;
            }
            let minute = truncate_to_minute(fixture.kickoff);
            by_minute.entry(minute).or_default().push(fixture.id);
        }

        self.buckets = by_minute
            .into_iter()
            .map(|(kickoff, fixture_ids)| KickoffBucket {
                kickoff,
                due_at: kickoff.max(truncate_to_minute(now)),
                fixture_ids,
                retries: 0,
            })
            .collect();
        self.buckets.sort_by_key(|b| b.due_at);

        info!(
            buckets = self.buckets.len(),
            "Planned kickoff checks for today"
        );
    }

    /// When the earliest bucket comes due, if any.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.buckets.iter().map(|b| b.due_at).min()
    }

    /// Remove and return all buckets due at `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<KickoffBucket> {
        let (due, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.buckets).into_iter().partition(|b| b.due_at <= now);
        self.buckets = rest;
        due
    }

    /// Apply one livescore snapshot to a bucket taken via `take_due`.
    ///
    /// Fixtures reporting an active period resolve as started; fixtures with
    /// the indefinite-delay code join the delayed set and never reschedule;
    /// the rest carry into a retry bucket 5 minutes out, until the retry
    /// bound is exhausted.
    pub fn on_check_result(
        &mut self,
        bucket: KickoffBucket,
        live: &[LiveScore],
        now: DateTime<Utc>,
    ) -> CheckOutcome {
        let mut outcome = CheckOutcome::default();
        let mut remaining = Vec::new();

        for fixture_id in bucket.fixture_ids {
            match live.iter().find(|s| s.fixture_id == fixture_id) {
                Some(score) if score.has_started() => outcome.started.push(fixture_id),
                Some(score) if score.is_indefinitely_delayed() => {
                    self.delayed.insert(
                        fixture_id,
                        DelayedMatchEntry {
                            fixture_id,
                            expected_kickoff: bucket.kickoff,
                            checks: 0,
                        },
                    );
                    outcome.delayed.push(fixture_id);
                }
                _ => remaining.push(fixture_id),
            }
        }

        if !remaining.is_empty() {
            if bucket.retries < MAX_KICKOFF_RETRIES {
                debug!(
                    kickoff = %bucket.kickoff,
                    retry = bucket.retries + 1,
                    pending = remaining.len(),
                    "Rescheduling kickoff check"
                );
                outcome.retrying = remaining.clone();
                self.buckets.push(KickoffBucket {
                    kickoff: bucket.kickoff,
                    due_at: now + retry_interval(),
                    fixture_ids: remaining,
                    retries: bucket.retries + 1,
                });
                self.buckets.sort_by_key(|b| b.due_at);
            } else {
                // Accepted gap: the live-feed diff or a later refresh will
                // still pick these up if they eventually start.
                warn!(
                    kickoff = %bucket.kickoff,
                    dropped = remaining.len(),
                    "Kickoff check retries exhausted, abandoning bucket"
                );
                outcome.abandoned = remaining;
            }
        }

        outcome
    }

    /// Re-examine the delayed set against a fresh livescore snapshot.
    ///
    /// Ticking entries resolve (the caller promotes them live); entries
    /// present upstream without the delay code are cleared without
    /// resolving; entries older than the age bound or checked too many
    /// times are dropped.
    pub fn sweep_delayed(
        &mut self,
        live: &[LiveScore],
        now: DateTime<Utc>,
    ) -> DelayedSweepOutcome {
        let mut outcome = DelayedSweepOutcome::default();

        self.delayed.retain(|fixture_id, entry| {
            entry.checks += 1;

            if let Some(score) = live.iter().find(|s| s.fixture_id == *fixture_id) {
                if score.ticking {
                    outcome.resolved.push(*fixture_id);
                    return false;
                }
                if !score.is_indefinitely_delayed() {
                    outcome.cleared.push(*fixture_id);
                    return false;
                }
            }

            if now - entry.expected_kickoff > delayed_max_age()
                || entry.checks > DELAYED_MAX_CHECKS
            {
                debug!(fixture_id, checks = entry.checks, "Dropping stale delayed match");
                outcome.cleared.push(*fixture_id);
                return false;
            }
            true
        });

        outcome
    }

    /// Put buckets taken via `take_due` back unchanged, e.g. after a failed
    /// livescore fetch. Does not consume retry budget.
    pub fn restore(&mut self, buckets: Vec<KickoffBucket>) {
        self.buckets.extend(buckets);
        self.buckets.sort_by_key(|b| b.due_at);
    }

    /// Safety-net removal used by the cleanup sweeper.
    pub fn remove_delayed(&mut self, fixture_id: i64) -> bool {
        self.delayed.remove(&fixture_id).is_some()
    }

    pub fn has_delayed(&self) -> bool {
        !self.delayed.is_empty()
    }

    pub fn delayed_ids(&self) -> Vec<i64> {
        self.delayed.keys().copied().collect()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}
