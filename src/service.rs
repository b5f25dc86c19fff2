//! Consumer-facing service over the caches and the upstream feed.
//!
//! This is the surface the (out-of-scope) API/UI layers consume:
//! `list_fixtures`, `list_leagues`, `live_matches`, `get_odds`, plus the
//! `LiveEvent` channel for the real-time fan-out layer. Every read prefers a
//! cached (possibly stale) answer over surfacing an upstream failure; hard
//! "not available" is returned only when no cached value exists at all.

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::errors::FeedError;
use crate::api::feed::UpstreamFeed;
use crate::cache::fixture_store::{FixtureStore, StoreLookup};
use crate::cache::live_cache::LiveMatchCache;
use crate::cache::odds_cache::{OddsCacheEntry, OddsFetchCache, OddsLookup};
use crate::data::models::{
    BettingSection, CategorySummary, Fixture, League, LiveEvent, LiveMatchEntry, LiveScore,
    TimingSnapshot,
};
use crate::odds::classifier;

/// A fixtures-by-date-range cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }
}

/// Classified odds as served to consumers. `stale` is set when the entry is
/// past its TTL and the refresh attempt failed.
#[derive(Debug, Clone)]
pub struct OddsView {
    pub sections: Vec<BettingSection>,
    pub categories: Vec<CategorySummary>,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

impl OddsView {
    fn from_entry(entry: OddsCacheEntry, stale: bool) -> Self {
        Self {
            sections: entry.sections,
            categories: entry.categories,
            fetched_at: entry.fetched_at,
            stale,
        }
    }
}

pub struct LiveOddsService<F> {
    feed: F,
    pub fixtures: FixtureStore,
    pub live: LiveMatchCache,
    pub odds: OddsFetchCache,
    events: mpsc::UnboundedSender<LiveEvent>,
}

impl<F: UpstreamFeed> LiveOddsService<F> {
    pub fn new(feed: F, events: mpsc::UnboundedSender<LiveEvent>) -> Self {
        Self {
            feed,
            fixtures: FixtureStore::new(),
            live: LiveMatchCache::new(),
            odds: OddsFetchCache::new(),
            events,
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    // =========================================================================
    // Fixtures and leagues
    // =========================================================================

    /// Fixtures for a date range: cached if fresh, otherwise fetched page by
    /// page and cached under the range key. A failed fetch falls back to the
    /// stale cached set; an empty list is returned only on a true miss
    /// (never an error).
    pub async fn list_fixtures(&self, range: DateRange) -> Vec<Fixture> {
        let now = Utc::now();
        let key = range.cache_key();

        let stale_fallback = match self.fixtures.lookup_fixtures(&key, now) {
            StoreLookup::Fresh(fixtures) => return fixtures,
            StoreLookup::Stale(fixtures) => Some(fixtures),
            StoreLookup::Miss => None,
        };

        match self.fetch_fixture_range(range).await {
            Ok(fixtures) => {
                self.fixtures.store_fixtures(&key, fixtures.clone(), now);
                fixtures
            }
            Err(e) => {
                warn!(key, error = %e, stale_available = stale_fallback.is_some(), "Fixture fetch failed");
                stale_fallback.unwrap_or_default()
            }
        }
    }

    /// League list, popular leagues first. Same availability policy as
    /// `list_fixtures`.
    pub async fn list_leagues(&self) -> Vec<League> {
        let now = Utc::now();

        let stale_fallback = match self.fixtures.lookup_leagues(now) {
            StoreLookup::Fresh(leagues) => return leagues,
            StoreLookup::Stale(leagues) => Some(leagues),
            StoreLookup::Miss => None,
        };

        match self.feed.leagues().await {
            Ok(leagues) => {
                self.fixtures.store_leagues(leagues, now);
                // Stored copy is the sorted one.
                match self.fixtures.lookup_leagues(now) {
                    StoreLookup::Fresh(sorted) => sorted,
                    _ => Vec::new(),
                }
            }
            Err(e) => {
                warn!(error = %e, stale_available = stale_fallback.is_some(), "League fetch failed");
                stale_fallback.unwrap_or_default()
            }
        }
    }

    /// Daily refresh: fetch new fixture and league sets fully, then swap
    /// them in. A failed fetch leaves the previous cache contents intact.
    pub async fn refresh_all(&self, range: DateRange) -> Result<Vec<Fixture>, FeedError> {
        let fixtures = self.fetch_fixture_range(range).await?;
        let leagues = self.feed.leagues().await?;

        info!(
            fixtures = fixtures.len(),
            leagues = leagues.len(),
            key = %range.cache_key(),
            "Daily refresh fetched, swapping caches"
        );
        self.fixtures
            .swap_all(vec![(range.cache_key(), fixtures.clone())], leagues, Utc::now());
        Ok(fixtures)
    }

    async fn fetch_fixture_range(&self, range: DateRange) -> Result<Vec<Fixture>, FeedError> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let batch = self.feed.fixtures_page(range.from, range.to, page).await?;
            let count = batch.fixtures.len();
            all.extend(batch.fixtures);
            debug!(page, batch = count, total = all.len(), "Fetched fixtures page");

            if !batch.has_more {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    // =========================================================================
    // Live matches
    // =========================================================================

    /// All matches currently believed live.
    pub fn live_matches(&self) -> Vec<LiveMatchEntry> {
        self.live.all_entries(Utc::now())
    }

    /// Promote a fixture into the live cache from a livescore report. The
    /// fan-out channel is notified only when the entry is created; timing
    /// renewals of an already-live match stay silent.
    pub fn confirm_live(&self, fixture: Fixture, score: &LiveScore, now: DateTime<Utc>) {
        let fixture_id = fixture.id;
        let timing = TimingSnapshot {
            started_at: score.started_at.unwrap_or(fixture.kickoff),
            clock: match (score.minute, score.second) {
                (Some(m), Some(s)) => Some((m, s)),
                _ => None,
            },
            period: score.period,
            taken_at: now,
            ticking: score.ticking,
        };

        // Carry forward previously fetched odds, if any.
        let existing = self.live.get(fixture_id, now);
        let was_live = existing.is_some();
        let sections = existing.and_then(|entry| entry.sections);

        let entry = LiveMatchEntry {
            fixture,
            timing,
            sections,
        };
        if self.live.upsert(entry, now) && !was_live {
            info!(fixture_id, "Match confirmed live");
            let _ = self.events.send(LiveEvent::MatchLive { fixture_id });
        }
    }

    // =========================================================================
    // Odds
    // =========================================================================

    /// Classified odds for a fixture.
    ///
    /// Served from cache within the TTL; otherwise a fresh pull is
    /// attempted. A failed refresh falls back to the stale entry (flagged),
    /// and returns `None` only when nothing was ever cached.
    pub async fn get_odds(&self, fixture_id: i64) -> Option<OddsView> {
        let now = Utc::now();

        let stale_fallback = match self.odds.lookup(fixture_id, now) {
            OddsLookup::Fresh(entry) => return Some(OddsView::from_entry(entry, false)),
            OddsLookup::Stale(entry) => Some(entry),
            OddsLookup::Miss => None,
        };

        match self.feed.fixture_odds(fixture_id).await {
            Ok(raw) => {
                let groups = classifier::group_by_market(&classifier::filter_allowed(raw));
                let classified = classifier::classify(groups);
                let sections = classifier::transform_to_betting_data(&classified);
                let entry = OddsCacheEntry::from_classified(&classified, sections, now);

                self.odds.store(fixture_id, entry.clone());
                self.attach_odds_to_live(fixture_id, &entry.sections, now);
                let _ = self.events.send(LiveEvent::OddsUpdated { fixture_id });

                Some(OddsView::from_entry(entry, false))
            }
            Err(e) => {
                warn!(fixture_id, error = %e, "Odds fetch failed");
                // Stale-but-available beats empty.
                stale_fallback.map(|entry| OddsView::from_entry(entry, true))
            }
        }
    }

    fn attach_odds_to_live(
        &self,
        fixture_id: i64,
        sections: &[BettingSection],
        now: DateTime<Utc>,
    ) {
        if let Some(mut entry) = self.live.get(fixture_id, now) {
            entry.sections = Some(sections.to_vec());
            entry.timing.taken_at = now;
            self.live.upsert(entry, now);
        }
    }
}
