//! TTL cache for upcoming fixtures (per date-range key) and league metadata.
//!
//! Refreshed wholesale once a day and read-through on miss by the service
//! layer. Refresh is fetch-then-swap: new data fully replaces the old sets
//! only once the fetch has succeeded, so a failed refresh never leaves the
//! store empty. Entries past the TTL are not discarded either: they stay
//! available as a stale fallback for when the re-fetch fails.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::data::models::{Fixture, League};

/// Fixtures and leagues live for a day plus a margin so the daily refresh
/// always lands before expiry.
pub fn fixtures_ttl() -> Duration {
    Duration::hours(24) + Duration::minutes(20)
}

/// League name substrings that sort first, in this order.
pub const POPULAR_LEAGUES: &[&str] = &[
    "Premier League",
    "Champions League",
    "La Liga",
    "Serie A",
    "Bundesliga",
    "Ligue 1",
    "Europa League",
    "World Cup",
];

/// Lookup result distinguishing "serve as-is" from "refresh required".
#[derive(Debug, Clone)]
pub enum StoreLookup<T> {
    /// Within TTL; serve without touching upstream.
    Fresh(T),
    /// Past TTL; a refresh must be attempted, but this value is the fallback
    /// if the refresh fails.
    Stale(T),
    Miss,
}

#[derive(Debug, Clone)]
struct CachedFixtures {
    fixtures: Vec<Fixture>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CachedLeagues {
    leagues: Vec<League>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    fixtures: HashMap<String, CachedFixtures>,
    leagues: Option<CachedLeagues>,
}

/// Shared, clonable fixture/league store. All state lives behind one lock;
/// callers never coordinate locking themselves.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    inner: Arc<RwLock<Inner>>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached fixtures for a date-range key.
    pub fn lookup_fixtures(&self, key: &str, now: DateTime<Utc>) -> StoreLookup<Vec<Fixture>> {
        let inner = self.inner.read().unwrap();
        match inner.fixtures.get(key) {
            Some(cached) if now - cached.fetched_at <= fixtures_ttl() => {
                StoreLookup::Fresh(cached.fixtures.clone())
            }
            Some(cached) => {
                debug!(key, "Fixture cache entry past TTL");
                StoreLookup::Stale(cached.fixtures.clone())
            }
            None => StoreLookup::Miss,
        }
    }

    pub fn store_fixtures(&self, key: &str, fixtures: Vec<Fixture>, now: DateTime<Utc>) {
        let mut inner = self.inner.write().unwrap();
        inner.fixtures.insert(
            key.to_string(),
            CachedFixtures {
                fixtures,
                fetched_at: now,
            },
        );
    }

    /// Cached league list, popular leagues first.
    pub fn lookup_leagues(&self, now: DateTime<Utc>) -> StoreLookup<Vec<League>> {
        let inner = self.inner.read().unwrap();
        match inner.leagues.as_ref() {
            Some(cached) if now - cached.fetched_at <= fixtures_ttl() => {
                StoreLookup::Fresh(cached.leagues.clone())
            }
            Some(cached) => StoreLookup::Stale(cached.leagues.clone()),
            None => StoreLookup::Miss,
        }
    }

    pub fn store_leagues(&self, mut leagues: Vec<League>, now: DateTime<Utc>) {
        sort_popular_first(&mut leagues);
        let mut inner = self.inner.write().unwrap();
        inner.leagues = Some(CachedLeagues {
            leagues,
            fetched_at: now,
        });
    }

    /// Atomically replace both caches with freshly fetched data
    /// (fetch-then-swap tail of the daily refresh).
    pub fn swap_all(
        &self,
        fixtures: Vec<(String, Vec<Fixture>)>,
        mut leagues: Vec<League>,
        now: DateTime<Utc>,
    ) {
        sort_popular_first(&mut leagues);
        let mut inner = self.inner.write().unwrap();
        inner.fixtures = fixtures
            .into_iter()
            .map(|(key, fixtures)| {
                (
                    key,
                    CachedFixtures {
                        fixtures,
                        fetched_at: now,
                    },
                )
            })
            .collect();
        inner.leagues = Some(CachedLeagues {
            leagues,
            fetched_at: now,
        });
    }

    /// Find a fixture by id across all cached date-range sets. Used when a
    /// scheduled check resolves a fixture id as started.
    pub fn find(&self, fixture_id: i64) -> Option<Fixture> {
        let inner = self.inner.read().unwrap();
        inner
            .fixtures
            .values()
            .flat_map(|c| c.fixtures.iter())
            .find(|f| f.id == fixture_id)
            .cloned()
    }
}

fn popularity_rank(name: &str) -> usize {
    POPULAR_LEAGUES
        .iter()
        .position(|p| name.contains(p))
        .unwrap_or(POPULAR_LEAGUES.len())
}

fn sort_popular_first(leagues: &mut [League]) {
    leagues.sort_by_key(|l| popularity_rank(&l.name));
}
