//! End-to-end pipeline tests over a scripted upstream feed.
//!
//! Covers the cross-module behavior the unit tests can't: read-through fetch
//! counting, stale-odds fallback on upstream failure, and the full
//! kickoff -> retry -> live -> odds -> clock scenario.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use livematch_core::api::errors::FeedError;
use livematch_core::api::feed::{FixturesPage, UpstreamFeed};
use livematch_core::cache::odds_cache::OddsCacheEntry;
use livematch_core::data::match_clock::{MatchClock, MatchTime};
use livematch_core::data::models::{
    Fixture, League, LiveEvent, LiveScore, Period, RawOdd, TimingSnapshot,
};
use livematch_core::schedule::queue::ScheduleQueue;
use livematch_core::schedule::sweeper::CleanupSweeper;
use livematch_core::service::{DateRange, LiveOddsService};

// =============================================================================
// Scripted feed
// =============================================================================

#[derive(Default)]
struct MockInner {
    fixtures: Mutex<Vec<Fixture>>,
    odds: Mutex<Vec<RawOdd>>,
    live: Mutex<Vec<LiveScore>>,
    fail_odds: AtomicBool,
    fail_fixtures: AtomicBool,
    fail_leagues: AtomicBool,
    fixture_calls: AtomicUsize,
    odds_calls: AtomicUsize,
    league_calls: AtomicUsize,
}

#[derive(Clone, Default)]
struct MockFeed(Arc<MockInner>);

impl MockFeed {
    fn set_fixtures(&self, fixtures: Vec<Fixture>) {
        *self.0.fixtures.lock().unwrap() = fixtures;
    }

    fn set_odds(&self, odds: Vec<RawOdd>) {
        *self.0.odds.lock().unwrap() = odds;
    }

    fn fail_odds(&self, fail: bool) {
        self.0.fail_odds.store(fail, Ordering::SeqCst);
    }

    fn fail_fixtures(&self, fail: bool) {
        self.0.fail_fixtures.store(fail, Ordering::SeqCst);
    }

    fn fail_leagues(&self, fail: bool) {
        self.0.fail_leagues.store(fail, Ordering::SeqCst);
    }

    fn fixture_calls(&self) -> usize {
        self.0.fixture_calls.load(Ordering::SeqCst)
    }

    fn odds_calls(&self) -> usize {
        self.0.odds_calls.load(Ordering::SeqCst)
    }
}

impl UpstreamFeed for MockFeed {
    async fn fixtures_page(
        &self,
        _from: NaiveDate,
        _to: NaiveDate,
        _page: u32,
    ) -> Result<FixturesPage, FeedError> {
        self.0.fixture_calls.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_fixtures.load(Ordering::SeqCst) {
            return Err(FeedError::Timeout("simulated fixtures timeout".to_string()));
        }
        Ok(FixturesPage {
            fixtures: self.0.fixtures.lock().unwrap().clone(),
            has_more: false,
        })
    }

    async fn leagues(&self) -> Result<Vec<League>, FeedError> {
        self.0.league_calls.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_leagues.load(Ordering::SeqCst) {
            return Err(FeedError::Timeout("simulated leagues timeout".to_string()));
        }
        Ok(vec![League {
            id: 1,
            name: "Premier League".to_string(),
            logo: String::new(),
            country: "England".to_string(),
        }])
    }

    async fn live_scores(&self) -> Result<Vec<LiveScore>, FeedError> {
        Ok(self.0.live.lock().unwrap().clone())
    }

    async fn fixture_odds(&self, _fixture_id: i64) -> Result<Vec<RawOdd>, FeedError> {
        self.0.odds_calls.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_odds.load(Ordering::SeqCst) {
            return Err(FeedError::Timeout("simulated odds timeout".to_string()));
        }
        Ok(self.0.odds.lock().unwrap().clone())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn fixture(id: i64, kickoff: DateTime<Utc>) -> Fixture {
    Fixture {
        id,
        kickoff,
        home: "Home FC".to_string(),
        away: "Away FC".to_string(),
        league_id: 1,
        odds: vec![],
    }
}

fn match_winner_odds() -> Vec<RawOdd> {
    vec![
        RawOdd {
            id: 1,
            market_id: 1,
            market_name: "Match Winner".to_string(),
            label: "Home".to_string(),
            value: dec!(1.85),
            suspended: false,
        },
        RawOdd {
            id: 2,
            market_id: 1,
            market_name: "Match Winner".to_string(),
            label: "Away".to_string(),
            value: dec!(4.20),
            suspended: false,
        },
    ]
}

fn started_score(fixture_id: i64, minute: u32, second: u32) -> LiveScore {
    LiveScore {
        fixture_id,
        period: Period::FirstHalf,
        ticking: true,
        state_code: 1,
        minute: Some(minute),
        second: Some(second),
        started_at: None,
    }
}

fn make_service(feed: MockFeed) -> (LiveOddsService<MockFeed>, mpsc::UnboundedReceiver<LiveEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LiveOddsService::new(feed, tx), rx)
}

fn this_week() -> DateRange {
    let today = Utc::now().date_naive();
    DateRange {
        from: today,
        to: today + Duration::days(7),
    }
}

// =============================================================================
// Read-through and TTL
// =============================================================================

#[tokio::test]
async fn repeat_fixture_reads_within_ttl_hit_upstream_once() {
    let feed = MockFeed::default();
    feed.set_fixtures(vec![fixture(1, Utc::now() + Duration::hours(2))]);
    let (service, _rx) = make_service(feed.clone());

    let first = service.list_fixtures(this_week()).await;
    let second = service.list_fixtures(this_week()).await;

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    // Second read served from cache.
    assert_eq!(feed.fixture_calls(), 1);
}

#[tokio::test]
async fn expired_fixture_entry_triggers_one_refetch() {
    let feed = MockFeed::default();
    feed.set_fixtures(vec![fixture(1, Utc::now() + Duration::hours(2))]);
    let (service, _rx) = make_service(feed.clone());

    // Seed an entry fetched well past the 24h20m TTL.
    let range = this_week();
    service.fixtures.store_fixtures(
        &range.cache_key(),
        vec![fixture(99, Utc::now())],
        Utc::now() - Duration::hours(25),
    );

    let fixtures = service.list_fixtures(range).await;

    // Stale entry was not served; exactly one upstream fetch replaced it.
    assert_eq!(fixtures[0].id, 1);
    assert_eq!(feed.fixture_calls(), 1);
}

#[tokio::test]
async fn fixture_fetch_failure_yields_empty_not_error() {
    // A feed with no scripted pages still answers; an empty list is the
    // contract, never a panic or error surface.
    let feed = MockFeed::default();
    let (service, _rx) = make_service(feed);
    let fixtures = service.list_fixtures(this_week()).await;
    assert!(fixtures.is_empty());
}

#[tokio::test]
async fn leagues_sorted_and_cached() {
    let feed = MockFeed::default();
    let (service, _rx) = make_service(feed.clone());

    let leagues = service.list_leagues().await;
    let again = service.list_leagues().await;

    assert_eq!(leagues[0].name, "Premier League");
    assert_eq!(again.len(), leagues.len());
    assert_eq!(feed.0.league_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fixture_refetch_failure_serves_stale_set() {
    let feed = MockFeed::default();
    feed.fail_fixtures(true);
    let (service, _rx) = make_service(feed.clone());

    // Seed a set fetched well past the 24h20m TTL, then make the re-fetch
    // time out. The stale set must still be served, not an empty list.
    let range = this_week();
    service.fixtures.store_fixtures(
        &range.cache_key(),
        vec![fixture(99, Utc::now())],
        Utc::now() - Duration::hours(25),
    );

    let fixtures = service.list_fixtures(range).await;

    assert_eq!(fixtures.len(), 1);
    assert_eq!(fixtures[0].id, 99);
    assert_eq!(feed.fixture_calls(), 1);
}

#[tokio::test]
async fn league_refetch_failure_serves_stale_list() {
    let feed = MockFeed::default();
    let (service, _rx) = make_service(feed.clone());

    service.fixtures.store_leagues(
        vec![League {
            id: 9,
            name: "Serie A".to_string(),
            logo: String::new(),
            country: "Italy".to_string(),
        }],
        Utc::now() - Duration::hours(25),
    );

    feed.fail_leagues(true);
    let leagues = service.list_leagues().await;

    assert_eq!(leagues.len(), 1);
    assert_eq!(leagues[0].name, "Serie A");
}

// =============================================================================
// Odds: stale fallback
// =============================================================================

#[tokio::test]
async fn odds_refetch_failure_serves_previous_entry() {
    let feed = MockFeed::default();
    feed.set_odds(match_winner_odds());
    let (service, _rx) = make_service(feed.clone());

    // Seed a cache entry older than the 3-minute TTL so a refresh is due.
    service.odds.store(
        500,
        OddsCacheEntry {
            sections: vec![],
            categories: vec![],
            fetched_at: Utc::now() - Duration::minutes(5),
        },
    );
    let seeded_at = Utc::now() - Duration::minutes(5);

    // Upstream now times out; the stale entry must come back, flagged.
    feed.fail_odds(true);
    let view = service.get_odds(500).await.expect("stale entry expected");

    assert!(view.stale);
    assert!(view.fetched_at <= seeded_at + Duration::seconds(1));
    assert_eq!(feed.odds_calls(), 1);
}

#[tokio::test]
async fn odds_failure_with_no_cache_is_not_available() {
    let feed = MockFeed::default();
    feed.fail_odds(true);
    let (service, _rx) = make_service(feed);

    assert!(service.get_odds(500).await.is_none());
}

#[tokio::test]
async fn fresh_odds_served_without_upstream_call() {
    let feed = MockFeed::default();
    feed.set_odds(match_winner_odds());
    let (service, _rx) = make_service(feed.clone());

    let first = service.get_odds(500).await.unwrap();
    let second = service.get_odds(500).await.unwrap();

    assert!(!first.stale);
    assert!(!second.stale);
    assert_eq!(first.sections.len(), 1);
    // Second read inside the TTL never hits upstream.
    assert_eq!(feed.odds_calls(), 1);
}

// =============================================================================
// Full kickoff scenario
// =============================================================================

#[tokio::test]
async fn kickoff_to_live_to_odds_to_clock() {
    let feed = MockFeed::default();
    feed.set_odds(match_winner_odds());
    let (service, mut rx) = make_service(feed.clone());

    // Fixture 500 kicks off at T (this minute).
    let t = Utc::now().with_second(0).unwrap().with_nanosecond(0).unwrap();
    let fx = fixture(500, t);
    feed.set_fixtures(vec![fx.clone()]);
    service.list_fixtures(this_week()).await;

    let mut queue = ScheduleQueue::new();
    queue.plan_day(&[fx.clone()], t);

    // At T the check finds it not yet live: carried into retry.
    let bucket = queue.take_due(t).pop().expect("bucket due at kickoff");
    let outcome = queue.on_check_result(bucket, &[], t);
    assert!(outcome.started.is_empty());
    assert_eq!(outcome.retrying, vec![500]);

    // At T+5m the retry finds it live at 0:10, ticking.
    let t5 = t + Duration::minutes(5);
    let score = started_score(500, 0, 10);
    let bucket = queue.take_due(t5).pop().expect("retry bucket due");
    let outcome = queue.on_check_result(bucket, &[score.clone()], t5);
    assert_eq!(outcome.started, vec![500]);

    let resolved = service.fixtures.find(500).expect("fixture in store");
    service.confirm_live(resolved, &score, t5);

    // A live entry now exists and the event was emitted.
    let entry = service.live.get(500, t5).expect("live entry created");
    assert_eq!(rx.try_recv(), Ok(LiveEvent::MatchLive { fixture_id: 500 }));

    // getOdds triggers exactly one upstream fetch.
    let view = service.get_odds(500).await.expect("odds available");
    assert_eq!(feed.odds_calls(), 1);
    assert_eq!(view.sections[0].title, "Match Winner");

    // The clock at T+5m30s reads 0:40 (baseline 0:10 plus 30s).
    let mut clock = MatchClock::new();
    let at = clock.elapsed(t5 + Duration::seconds(30), &entry.timing);
    assert_eq!(at, MatchTime::Running { minute: 0, second: 40 });
    assert_eq!(at.to_string(), "0:40");
}

#[tokio::test]
async fn sweep_evicts_finished_from_both_caches() {
    let feed = MockFeed::default();
    feed.set_odds(match_winner_odds());
    let (service, _rx) = make_service(feed.clone());
    let now = Utc::now();

    for id in [1, 2, 3] {
        service.confirm_live(fixture(id, now), &started_score(id, 10, 0), now);
        service.get_odds(id).await;
    }

    let sweeper = CleanupSweeper::new(service.live.clone(), service.odds.clone());
    let mut queue = ScheduleQueue::new();
    let evicted = sweeper.sweep(&[1, 3], &mut queue, now);

    assert_eq!(evicted, vec![2]);
    assert!(service.live.get(1, now).is_some());
    assert!(service.live.get(2, now).is_none());
    assert!(service.odds.contains(3));
    assert!(!service.odds.contains(2));
}

#[tokio::test]
async fn renewal_of_live_match_emits_nothing() {
    let feed = MockFeed::default();
    let (service, mut rx) = make_service(feed);
    let now = Utc::now();

    service.confirm_live(fixture(500, now), &started_score(500, 0, 10), now);
    assert_eq!(rx.try_recv(), Ok(LiveEvent::MatchLive { fixture_id: 500 }));

    // A later-snapshot renewal of the same match must stay silent; the
    // fan-out layer hears about each match going live exactly once.
    let later = now + Duration::minutes(2);
    service.confirm_live(fixture(500, now), &started_score(500, 2, 10), later);

    assert!(rx.try_recv().is_err());
    let entry = service.live.get(500, later).unwrap();
    assert_eq!(entry.timing.clock, Some((2, 10)));
}

#[tokio::test]
async fn odds_update_attaches_to_live_entry() {
    let feed = MockFeed::default();
    feed.set_odds(match_winner_odds());
    let (service, mut rx) = make_service(feed);
    let now = Utc::now();

    service.confirm_live(fixture(500, now), &started_score(500, 0, 10), now);
    let _ = rx.try_recv(); // MatchLive

    assert!(service.live.get(500, now).unwrap().sections.is_none());
    service.get_odds(500).await.unwrap();

    let entry = service.live.get(500, Utc::now()).unwrap();
    assert!(entry.sections.is_some());
    assert_eq!(rx.try_recv(), Ok(LiveEvent::OddsUpdated { fixture_id: 500 }));
}

// =============================================================================
// TimingSnapshot construction from a livescore report
// =============================================================================

#[tokio::test]
async fn confirm_live_builds_snapshot_from_score() {
    let feed = MockFeed::default();
    let (service, _rx) = make_service(feed);
    let now = Utc::now();

    let mut score = started_score(500, 37, 12);
    score.started_at = Some(now - Duration::minutes(38));
    service.confirm_live(fixture(500, now - Duration::minutes(40)), &score, now);

    let timing: TimingSnapshot = service.live.get(500, now).unwrap().timing;
    assert_eq!(timing.clock, Some((37, 12)));
    assert_eq!(timing.period, Period::FirstHalf);
    assert!(timing.ticking);
    assert_eq!(timing.taken_at, now);
    assert_eq!(timing.started_at, now - Duration::minutes(38));
}
