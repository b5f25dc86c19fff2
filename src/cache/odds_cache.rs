//! Per-fixture cache of the most recent classified odds pull.
//!
//! Entries are served fresh within a 3-minute TTL. Past the TTL the entry is
//! not discarded: it stays available as a stale fallback, because serving
//! last-known-good odds beats serving nothing when the upstream feed is
//! flaky.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::data::models::{BettingSection, CategorySummary, ClassifiedOdds};

pub fn odds_ttl() -> Duration {
    Duration::minutes(3)
}

/// One fixture's cached classification result.
#[derive(Debug, Clone)]
pub struct OddsCacheEntry {
    pub sections: Vec<BettingSection>,
    pub categories: Vec<CategorySummary>,
    pub fetched_at: DateTime<Utc>,
}

impl OddsCacheEntry {
    pub fn from_classified(classified: &ClassifiedOdds, sections: Vec<BettingSection>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            sections,
            categories: classified.categories.clone(),
            fetched_at,
        }
    }
}

/// Lookup result distinguishing "serve as-is" from "refresh required".
#[derive(Debug, Clone)]
pub enum OddsLookup {
    /// Within TTL; serve without touching upstream.
    Fresh(OddsCacheEntry),
    /// Past TTL; a refresh must be attempted, but this entry is the fallback
    /// if the refresh fails.
    Stale(OddsCacheEntry),
    Miss,
}

/// Shared, clonable odds cache keyed by fixture id.
#[derive(Debug, Clone, Default)]
pub struct OddsFetchCache {
    inner: Arc<RwLock<HashMap<i64, OddsCacheEntry>>>,
}

impl OddsFetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, fixture_id: i64, now: DateTime<Utc>) -> OddsLookup {
        let inner = self.inner.read().unwrap();
        match inner.get(&fixture_id) {
            Some(entry) if now - entry.fetched_at <= odds_ttl() => {
                OddsLookup::Fresh(entry.clone())
            }
            Some(entry) => OddsLookup::Stale(entry.clone()),
            None => OddsLookup::Miss,
        }
    }

    /// Upsert by fixture id. Older fetches never overwrite newer ones.
    pub fn store(&self, fixture_id: i64, entry: OddsCacheEntry) -> bool {
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.get(&fixture_id) {
            if entry.fetched_at < existing.fetched_at {
                return false;
            }
        }
        inner.insert(fixture_id, entry);
        true
    }

    pub fn evict(&self, fixture_id: i64) -> bool {
        self.inner.write().unwrap().remove(&fixture_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    pub fn contains(&self, fixture_id: i64) -> bool {
        self.inner.read().unwrap().contains_key(&fixture_id)
    }
}
