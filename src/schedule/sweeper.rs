//! Cleanup of finished matches.
//!
//! The authoritative signal that a match ended is its absence from the
//! upstream "currently live" feed. The sweeper diffs the live cache against
//! that feed and evicts finished fixtures from both the live match cache and
//! the odds cache, plus any lingering delayed-set entry as a safety net.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::cache::live_cache::LiveMatchCache;
use crate::cache::odds_cache::OddsFetchCache;

use super::queue::ScheduleQueue;

pub struct CleanupSweeper {
    live: LiveMatchCache,
    odds: OddsFetchCache,
}

impl CleanupSweeper {
    pub fn new(live: LiveMatchCache, odds: OddsFetchCache) -> Self {
        Self { live, odds }
    }

    /// Idle optimization: no upstream call is worth making when there is
    /// nothing to diff and nothing delayed to re-check.
    pub fn needs_upstream(&self, queue: &ScheduleQueue) -> bool {
        !self.live.is_empty() || queue.has_delayed()
    }

    /// Evict every cached match absent from the currently-live id set.
    /// Returns the evicted fixture ids.
    pub fn sweep(
        &self,
        currently_live: &[i64],
        queue: &mut ScheduleQueue,
        now: DateTime<Utc>,
    ) -> Vec<i64> {
        let expired = self.live.prune_expired(now);
        if expired > 0 {
            debug!(expired, "Pruned TTL-expired live match entries");
        }

        let finished: Vec<i64> = self
            .live
            .ids(now)
            .into_iter()
            .filter(|id| !currently_live.contains(id))
            .collect();

        for &fixture_id in &finished {
            self.live.evict(fixture_id);
            self.odds.evict(fixture_id);
            queue.remove_delayed(fixture_id);
        }

        if !finished.is_empty() {
            info!(evicted = finished.len(), "Swept finished matches from caches");
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::odds_cache::OddsCacheEntry;
    use crate::data::models::{Fixture, LiveMatchEntry, Period, TimingSnapshot};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
    }

    fn entry(fixture_id: i64) -> LiveMatchEntry {
        LiveMatchEntry {
            fixture: Fixture {
                id: fixture_id,
                kickoff: t0(),
                home: "Home".to_string(),
                away: "Away".to_string(),
                league_id: 1,
                odds: vec![],
            },
            timing: TimingSnapshot {
                started_at: t0(),
                clock: Some((10, 0)),
                period: Period::FirstHalf,
                taken_at: t0(),
                ticking: true,
            },
            sections: None,
        }
    }

    fn odds_entry() -> OddsCacheEntry {
        OddsCacheEntry {
            sections: vec![],
            categories: vec![],
            fetched_at: t0(),
        }
    }

    #[test]
    fn test_diff_evicts_exactly_the_finished() {
        let live = LiveMatchCache::new();
        let odds = OddsFetchCache::new();
        let mut queue = ScheduleQueue::new();

        for id in [1, 2, 3] {
            live.upsert(entry(id), t0());
            odds.store(id, odds_entry());
        }

        let sweeper = CleanupSweeper::new(live.clone(), odds.clone());
        // Upstream reports only 1 and 3 still live: evict exactly 2.
        let evicted = sweeper.sweep(&[1, 3], &mut queue, t0());

        assert_eq!(evicted, vec![2]);
        assert!(live.get(1, t0()).is_some());
        assert!(live.get(2, t0()).is_none());
        assert!(live.get(3, t0()).is_some());
        assert!(odds.contains(1));
        assert!(!odds.contains(2));
        assert!(odds.contains(3));
    }

    #[test]
    fn test_idle_when_nothing_cached() {
        let sweeper = CleanupSweeper::new(LiveMatchCache::new(), OddsFetchCache::new());
        let queue = ScheduleQueue::new();
        assert!(!sweeper.needs_upstream(&queue));
    }

    #[test]
    fn test_not_idle_with_live_entries() {
        let live = LiveMatchCache::new();
        live.upsert(entry(1), t0());
        let sweeper = CleanupSweeper::new(live, OddsFetchCache::new());
        assert!(sweeper.needs_upstream(&ScheduleQueue::new()));
    }
}
