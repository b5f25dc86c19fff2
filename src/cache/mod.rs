//! Shared in-memory caches: fixtures/leagues, live matches, odds.

pub mod fixture_store;
pub mod live_cache;
pub mod odds_cache;
