//! Async REST client for the sports-data provider.
//!
//! Features:
//! - Rate limiting (configurable, default 10 req/sec)
//! - Automatic retries with exponential backoff on 5xx/network errors
//! - Typed responses converted to internal domain models
//! - A short-timeout path for per-fixture odds, since downstream consumers
//!   poll every few seconds and must not wait out a long hang

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::data::models::{Fixture, League, LiveScore, Period, RawOdd};
use crate::data::time_parse::parse_feed_timestamp;

use super::errors::FeedError;
use super::feed::{FixturesPage, UpstreamFeed};

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct SportsFeedClient {
    base_url: String,
    api_key: String,
    client: Client,
    odds_client: Client,
    rate_limiter: Arc<DirectLimiter>,
    max_retries: u32,
}

impl SportsFeedClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        rate_limit: u32,
        max_retries: u32,
        timeout_secs: u64,
        odds_timeout_secs: u64,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(20)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| FeedError::Network(e.to_string()))?;

        let odds_client = Client::builder()
            .timeout(Duration::from_secs(odds_timeout_secs))
            .build()
            .map_err(|e| FeedError::Network(e.to_string()))?;

        let quota =
            Quota::per_second(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::new(10).unwrap()));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            odds_client,
            rate_limiter,
            max_retries,
        })
    }

    /// Create with default settings (10 req/s, 3 retries, 15s/5s timeouts).
    pub fn with_defaults(base_url: &str, api_key: &str) -> Result<Self, FeedError> {
        Self::new(base_url, api_key, 10, 3, 15, 5)
    }

    // =========================================================================
    // Core request method
    // =========================================================================

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        client: &Client,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<FeedError> = None;

        for attempt in 0..self.max_retries {
            self.rate_limiter.until_ready().await;

            debug!(path, attempt = attempt + 1, "Feed request");

            let result = client
                .get(&url)
                .query(&[("apikey", self.api_key.as_str())])
                .query(params)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response
                            .text()
                            .await
                            .map_err(|e| FeedError::Network(e.to_string()))?;
                        return serde_json::from_str(&text)
                            .map_err(|e| FeedError::Deserialization(e.to_string()));
                    }

                    // Rate limit — always retry.
                    if status.as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(1);
                        warn!(retry_after, attempt = attempt + 1, "Rate limited");
                        tokio::time::sleep(Duration::from_secs(retry_after)).await;
                        last_error = Some(FeedError::RateLimited { retry_after });
                        continue;
                    }

                    // Server errors — retry with backoff.
                    if status.as_u16() >= 500 {
                        let delay_ms = 500 * 2u64.pow(attempt);
                        warn!(
                            status_code = status.as_u16(),
                            delay_ms,
                            attempt = attempt + 1,
                            "Server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        last_error = Some(FeedError::Http {
                            status_code: status.as_u16(),
                            message: status.to_string(),
                        });
                        continue;
                    }

                    // Client errors — don't retry.
                    let body = response.text().await.unwrap_or_default();
                    return Err(FeedError::Http {
                        status_code: status.as_u16(),
                        message: body,
                    });
                }
                Err(e) => {
                    let delay_ms = 500 * 2u64.pow(attempt);
                    warn!(error = %e, delay_ms, attempt = attempt + 1, "Network error, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                    if e.is_timeout() {
                        last_error = Some(FeedError::Timeout(e.to_string()));
                    } else {
                        last_error = Some(FeedError::Network(e.to_string()));
                    }
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or(FeedError::MaxRetriesExceeded {
            attempts: self.max_retries,
            last_error: "unknown".to_string(),
        }))
    }
}

// =============================================================================
// Feed response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    #[serde(default)]
    data: Vec<RawFixture>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    id: i64,
    starting_at: String,
    #[serde(default)]
    home_name: String,
    #[serde(default)]
    away_name: String,
    #[serde(default)]
    league_id: i64,
    #[serde(default)]
    odds: Vec<RawFixtureOdd>,
}

#[derive(Debug, Deserialize)]
struct RawFixtureOdd {
    id: i64,
    market_id: i64,
    #[serde(default)]
    market_description: String,
    #[serde(default)]
    label: String,
    value: Decimal,
    #[serde(default)]
    suspended: bool,
}

#[derive(Debug, Deserialize)]
struct LeaguesResponse {
    #[serde(default)]
    data: Vec<RawLeague>,
}

#[derive(Debug, Deserialize)]
struct RawLeague {
    id: i64,
    name: String,
    #[serde(default)]
    image_path: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct LiveScoresResponse {
    #[serde(default)]
    data: Vec<RawLiveScore>,
}

#[derive(Debug, Deserialize)]
struct RawLiveScore {
    fixture_id: i64,
    #[serde(default)]
    period: Option<RawPeriod>,
    #[serde(default)]
    state_code: i32,
    #[serde(default)]
    started_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPeriod {
    #[serde(default)]
    description: String,
    #[serde(default)]
    ticking: bool,
    #[serde(default)]
    minutes: Option<u32>,
    #[serde(default)]
    seconds: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OddsResponse {
    #[serde(default)]
    data: Vec<RawFixtureOdd>,
}

// =============================================================================
// Conversions
// =============================================================================

fn convert_fixture(raw: RawFixture) -> Option<Fixture> {
    // One malformed record must not abort a whole refresh.
    let kickoff: DateTime<Utc> = match parse_feed_timestamp(&raw.starting_at) {
        Ok(instant) => instant,
        Err(e) => {
            warn!(fixture_id = raw.id, error = %e, "Skipping fixture with bad kickoff timestamp");
            return None;
        }
    };

    Some(Fixture {
        id: raw.id,
        kickoff,
        home: raw.home_name,
        away: raw.away_name,
        league_id: raw.league_id,
        odds: raw.odds.into_iter().map(convert_odd).collect(),
    })
}

fn convert_odd(raw: RawFixtureOdd) -> RawOdd {
    RawOdd {
        id: raw.id,
        market_id: raw.market_id,
        market_name: raw.market_description,
        label: raw.label,
        value: raw.value,
        suspended: raw.suspended,
    }
}

fn parse_period(description: &str) -> Period {
    match description.to_lowercase().as_str() {
        "1st-half" | "first-half" | "1st_half" => Period::FirstHalf,
        "half-time" | "halftime" => Period::HalfTime,
        "2nd-half" | "second-half" | "2nd_half" => Period::SecondHalf,
        "extra-time" | "et" => Period::ExtraTime,
        "penalties" => Period::Penalties,
        "" | "not-started" | "ns" => Period::NotStarted,
        _ => Period::Other,
    }
}

fn convert_live_score(raw: RawLiveScore) -> LiveScore {
    let (period, ticking, minute, second) = match raw.period {
        Some(p) => (parse_period(&p.description), p.ticking, p.minutes, p.seconds),
        None => (Period::NotStarted, false, None, None),
    };

    let started_at = raw
        .started_at
        .as_deref()
        .and_then(|s| parse_feed_timestamp(s).ok());

    LiveScore {
        fixture_id: raw.fixture_id,
        period,
        ticking,
        state_code: raw.state_code,
        minute,
        second,
        started_at,
    }
}

// =============================================================================
// UpstreamFeed implementation
// =============================================================================

impl UpstreamFeed for SportsFeedClient {
    async fn fixtures_page(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        page: u32,
    ) -> Result<FixturesPage, FeedError> {
        let response: FixturesResponse = self
            .request(
                &self.client,
                &format!("/fixtures/between/{from}/{to}"),
                &[
                    ("page", page.to_string()),
                    ("include", "odds;participants".to_string()),
                ],
            )
            .await?;

        let has_more = response.pagination.map(|p| p.has_more).unwrap_or(false);
        let fixtures = response
            .data
            .into_iter()
            .filter_map(convert_fixture)
            .collect();

        Ok(FixturesPage { fixtures, has_more })
    }

    async fn leagues(&self) -> Result<Vec<League>, FeedError> {
        let response: LeaguesResponse = self
            .request(
                &self.client,
                "/leagues",
                &[("include", "country".to_string())],
            )
            .await?;

        Ok(response
            .data
            .into_iter()
            .map(|raw| League {
                id: raw.id,
                name: raw.name,
                logo: raw.image_path,
                country: raw.country,
            })
            .collect())
    }

    async fn live_scores(&self) -> Result<Vec<LiveScore>, FeedError> {
        let response: LiveScoresResponse = self
            .request(
                &self.client,
                "/livescores/inplay",
                &[("include", "periods".to_string())],
            )
            .await?;

        Ok(response.data.into_iter().map(convert_live_score).collect())
    }

    async fn fixture_odds(&self, fixture_id: i64) -> Result<Vec<RawOdd>, FeedError> {
        let response: OddsResponse = self
            .request(
                &self.odds_client,
                &format!("/odds/pre-match/by-fixture/{fixture_id}"),
                &[],
            )
            .await?;

        Ok(response.data.into_iter().map(convert_odd).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period_labels() {
        assert_eq!(parse_period("1st-half"), Period::FirstHalf);
        assert_eq!(parse_period("Half-Time"), Period::HalfTime);
        assert_eq!(parse_period("2nd-half"), Period::SecondHalf);
        assert_eq!(parse_period(""), Period::NotStarted);
        assert_eq!(parse_period("golden-goal"), Period::Other);
    }

    #[test]
    fn test_convert_fixture_skips_bad_timestamp() {
        let raw = RawFixture {
            id: 9,
            starting_at: "not a time".to_string(),
            home_name: "A".to_string(),
            away_name: "B".to_string(),
            league_id: 1,
            odds: vec![],
        };
        assert!(convert_fixture(raw).is_none());
    }

    #[test]
    fn test_convert_live_score_without_period_block() {
        let raw = RawLiveScore {
            fixture_id: 7,
            period: None,
            state_code: 1,
            started_at: None,
        };
        let score = convert_live_score(raw);
        assert_eq!(score.period, Period::NotStarted);
        assert!(!score.has_started());
    }
}
