//! Core domain models for the live match and odds pipeline.
//!
//! These are the internal shapes the caches and scheduler operate on, after
//! upstream DTOs have been normalized by the feed client.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream livescore state code for an indefinitely delayed fixture.
/// Observed feed convention; fixtures carrying it are excluded from retry.
pub const STATE_INDEFINITE_DELAY: i32 = 16;

// =============================================================================
// Fixtures and leagues
// =============================================================================

/// A scheduled match. Immutable once cached for a date-range key; replaced
/// wholesale on refresh, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub id: i64,
    pub kickoff: DateTime<Utc>,
    pub home: String,
    pub away: String,
    pub league_id: i64,
    /// Pre-classification odds flattened from the fixtures feed.
    #[serde(default)]
    pub odds: Vec<RawOdd>,
}

/// League metadata. Read-only to everything outside the fixture store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub logo: String,
    pub country: String,
}

/// A single outcome price within a betting market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOdd {
    pub id: i64,
    pub market_id: i64,
    pub market_name: String,
    pub label: String,
    pub value: Decimal,
    #[serde(default)]
    pub suspended: bool,
}

// =============================================================================
// Live state
// =============================================================================

/// Match period as reported by the livescore feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    NotStarted,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    Penalties,
    #[serde(other)]
    Other,
}

impl Period {
    /// Whether this period means the match has actually started.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::NotStarted)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::FirstHalf => "first_half",
            Self::HalfTime => "half_time",
            Self::SecondHalf => "second_half",
            Self::ExtraTime => "extra_time",
            Self::Penalties => "penalties",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// One fixture's entry in the upstream "currently live" feed.
#[derive(Debug, Clone)]
pub struct LiveScore {
    pub fixture_id: i64,
    pub period: Period,
    /// True while the match clock is advancing (false at halftime/stoppages).
    pub ticking: bool,
    pub state_code: i32,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
}

impl LiveScore {
    pub fn is_indefinitely_delayed(&self) -> bool {
        self.state_code == STATE_INDEFINITE_DELAY
    }

    /// A fixture counts as started once the feed reports it in an active
    /// period without the indefinite-delay code.
    pub fn has_started(&self) -> bool {
        self.period.is_active() && !self.is_indefinitely_delayed()
    }
}

/// Timing state captured from one livescore poll, used by `MatchClock` to
/// advance the elapsed time client-side between polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingSnapshot {
    pub started_at: DateTime<Utc>,
    /// Precise elapsed (minute, second) if the feed supplied one.
    pub clock: Option<(u32, u32)>,
    pub period: Period,
    pub taken_at: DateTime<Utc>,
    pub ticking: bool,
}

/// A fixture confirmed live, as held by the live match cache.
#[derive(Debug, Clone)]
pub struct LiveMatchEntry {
    pub fixture: Fixture,
    pub timing: TimingSnapshot,
    /// Last classified odds pull, if any has succeeded yet.
    pub sections: Option<Vec<BettingSection>>,
}

// =============================================================================
// Classified betting data
// =============================================================================

/// Raw odds grouped by market, the classifier's input unit.
#[derive(Debug, Clone)]
pub struct MarketGroup {
    pub market_id: i64,
    pub description: String,
    pub odds: Vec<RawOdd>,
}

/// One display category in the classified output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub label: String,
    pub count: usize,
}

/// Markets assigned to a single category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryOdds {
    pub label: String,
    #[serde(skip)]
    pub markets: Vec<MarketGroup>,
    pub count: usize,
}

/// Classifier output: non-empty categories plus per-category market data.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedOdds {
    pub categories: Vec<CategorySummary>,
    pub by_category: std::collections::HashMap<String, CategoryOdds>,
}

/// A flattened, client-ready betting section.
#[derive(Debug, Clone, Serialize)]
pub struct BettingSection {
    pub category: String,
    pub title: String,
    pub options: Vec<BettingOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BettingOption {
    pub id: i64,
    pub label: String,
    pub value: Decimal,
    pub suspended: bool,
    pub market_id: i64,
}

// =============================================================================
// Events
// =============================================================================

/// Push hook payload for the downstream real-time fan-out layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// A fixture was confirmed live and entered the live match cache.
    MatchLive { fixture_id: i64 },
    /// A fixture's classified odds were created or replaced.
    OddsUpdated { fixture_id: i64 },
}
