//! Upstream feed seam.
//!
//! The caches and service layer talk to the sports-data provider through
//! this trait so tests can substitute a scripted feed and assert on call
//! counts. `SportsFeedClient` is the production implementation.

use std::future::Future;

use chrono::NaiveDate;

use crate::data::models::{Fixture, League, LiveScore, RawOdd};

use super::errors::FeedError;

/// One page of the paginated fixtures-by-date-range feed, already converted
/// to the internal fixture shape.
#[derive(Debug, Clone, Default)]
pub struct FixturesPage {
    pub fixtures: Vec<Fixture>,
    pub has_more: bool,
}

/// The four upstream endpoints this core consumes.
pub trait UpstreamFeed: Send + Sync {
    /// Fixtures for a date range, one page at a time (1-based pages).
    fn fixtures_page(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        page: u32,
    ) -> impl Future<Output = Result<FixturesPage, FeedError>> + Send;

    /// All leagues.
    fn leagues(&self) -> impl Future<Output = Result<Vec<League>, FeedError>> + Send;

    /// The currently-live fixture set with period/ticking/state data.
    fn live_scores(&self) -> impl Future<Output = Result<Vec<LiveScore>, FeedError>> + Send;

    /// Raw market odds for one fixture. Short-timeout path.
    fn fixture_odds(
        &self,
        fixture_id: i64,
    ) -> impl Future<Output = Result<Vec<RawOdd>, FeedError>> + Send;
}
