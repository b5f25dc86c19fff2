//! Client-side match clock derived from polled timing snapshots.
//!
//! The livescore feed is only polled every few minutes, so the elapsed time
//! shown to consumers has to advance locally between polls. The clock anchors
//! on each new snapshot exactly once (capturing the local-vs-feed offset at
//! that moment) and then adds only local wall-clock deltas; recomputing the
//! offset on every tick would accumulate drift.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::fmt;

use super::models::{Period, TimingSnapshot};

/// Elapsed time past this bound means the match is presumed over. Heuristic,
/// not an authoritative full-time signal.
const PRESUMED_FINISHED_MINUTES: i64 = 120;

/// Elapsed time for a live match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTime {
    Running { minute: u32, second: u32 },
    /// Past regulation outside the second half. Display policy: the fixed
    /// `90+` marker; literal stoppage time is shown only inside the second
    /// half.
    NinetyPlus,
    /// Presumed finished (elapsed exceeded the terminal bound).
    Finished,
}

impl fmt::Display for MatchTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { minute, second } => write!(f, "{minute}:{second:02}"),
            Self::NinetyPlus => write!(f, "90+"),
            Self::Finished => write!(f, "FT"),
        }
    }
}

/// Per-consumer clock state. One instance per displayed match.
#[derive(Debug, Default)]
pub struct MatchClock {
    /// (snapshot taken_at, local instant when that snapshot was anchored).
    anchor: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Feed-vs-local offset in seconds, captured once per snapshot.
    offset_secs: i64,
}

impl MatchClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the elapsed time at `now` for the given snapshot.
    pub fn elapsed(&mut self, now: DateTime<Utc>, snapshot: &TimingSnapshot) -> MatchTime {
        // Frozen clock (halftime, stoppage): report the snapshot verbatim,
        // or the elapsed value as of the snapshot when the feed gave no
        // precise clock. Either way the value must not advance with `now`.
        if !snapshot.ticking {
            if let Some((minute, second)) = snapshot.clock {
                return MatchTime::Running { minute, second };
            }
            let frozen_secs = (snapshot.taken_at - snapshot.started_at).num_seconds().max(0);
            return MatchTime::Running {
                minute: (frozen_secs / 60) as u32,
                second: (frozen_secs % 60) as u32,
            };
        }

        let total_secs = match snapshot.clock {
            Some((minute, second)) => {
                i64::from(minute) * 60 + i64::from(second) + self.local_delta_secs(now, snapshot)
            }
            // No precise clock from the feed: fall back to wall time since
            // the reported kickoff.
            None => (now - snapshot.started_at).num_seconds(),
        };
        let total_secs = total_secs.max(0);
        let minutes = total_secs / 60;

        if minutes > PRESUMED_FINISHED_MINUTES {
            return MatchTime::Finished;
        }
        if minutes >= 90 && snapshot.period != Period::SecondHalf {
            return MatchTime::NinetyPlus;
        }

        MatchTime::Running {
            minute: minutes as u32,
            second: (total_secs % 60) as u32,
        }
    }

    /// Seconds to add on top of the snapshot's own clock. The offset against
    /// the snapshot's `taken_at` is measured once when the snapshot is first
    /// seen; later calls only add local wall-clock progress.
    fn local_delta_secs(&mut self, now: DateTime<Utc>, snapshot: &TimingSnapshot) -> i64 {
        match self.anchor {
            Some((taken_at, anchored_at)) if taken_at == snapshot.taken_at => {
                self.offset_secs + (now - anchored_at).num_seconds()
            }
            _ => {
                self.offset_secs = (now - snapshot.taken_at).num_seconds();
                self.anchor = Some((snapshot.taken_at, now));
                self.offset_secs
            }
        }
    }
}
