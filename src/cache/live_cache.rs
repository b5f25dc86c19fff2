//! Cache of matches currently believed live.
//!
//! TTL expiry (5 minutes without renewal) is only a backstop; the primary
//! eviction path is the cleanup sweeper diffing against the upstream live
//! feed. A live match is renewed far more often than its TTL via timing and
//! odds updates.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::data::models::LiveMatchEntry;

pub fn live_match_ttl() -> Duration {
    Duration::minutes(5)
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: LiveMatchEntry,
    renewed_at: DateTime<Utc>,
}

/// Shared, clonable live match cache. At most one entry per fixture id.
#[derive(Debug, Clone, Default)]
pub struct LiveMatchCache {
    inner: Arc<RwLock<HashMap<i64, StoredEntry>>>,
}

impl LiveMatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or renew an entry, resetting its TTL.
    ///
    /// Last-write-wins by snapshot timestamp: an update carrying an older
    /// `taken_at` than the stored one is discarded, so overlapping scheduled
    /// checks can never roll the cache back behind the most recent
    /// successful upstream read.
    pub fn upsert(&self, entry: LiveMatchEntry, now: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.get(&entry.fixture.id) {
            if entry.timing.taken_at < existing.entry.timing.taken_at {
                debug!(
                    fixture_id = entry.fixture.id,
                    "Discarding stale live match update"
                );
                return false;
            }
        }
        inner.insert(
            entry.fixture.id,
            StoredEntry {
                entry,
                renewed_at: now,
            },
        );
        true
    }

    pub fn get(&self, fixture_id: i64, now: DateTime<Utc>) -> Option<LiveMatchEntry> {
        let inner = self.inner.read().unwrap();
        let stored = inner.get(&fixture_id)?;
        if now - stored.renewed_at > live_match_ttl() {
            return None;
        }
        Some(stored.entry.clone())
    }

    /// All unexpired entries.
    pub fn all_entries(&self, now: DateTime<Utc>) -> Vec<LiveMatchEntry> {
        let inner = self.inner.read().unwrap();
        inner
            .values()
            .filter(|s| now - s.renewed_at <= live_match_ttl())
            .map(|s| s.entry.clone())
            .collect()
    }

    /// Fixture ids of unexpired entries.
    pub fn ids(&self, now: DateTime<Utc>) -> Vec<i64> {
        let inner = self.inner.read().unwrap();
        inner
            .iter()
            .filter(|(_, s)| now - s.renewed_at <= live_match_ttl())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn evict(&self, fixture_id: i64) -> bool {
        self.inner.write().unwrap().remove(&fixture_id).is_some()
    }

    /// Drop entries past their TTL. Run opportunistically by the sweeper.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write().unwrap();
        let before = inner.len();
        inner.retain(|_, s| now - s.renewed_at <= live_match_ttl());
        before - inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}
