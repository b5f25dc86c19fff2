//! Configuration management.
//!
//! Loads settings from environment variables and .env file.

#![allow(dead_code)]

use std::str::FromStr;

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Settings {
    // Upstream feed
    pub feed_base_url: String,
    pub feed_api_key: String,
    pub feed_rate_limit: u32,
    pub feed_max_retries: u32,
    pub feed_timeout_secs: u64,
    /// Odds fetches get a shorter timeout; consumers poll every few seconds.
    pub odds_timeout_secs: u64,

    // Scheduling
    /// Wall-clock (UTC) time of the daily wholesale refresh, "HH:MM".
    pub daily_refresh_at: RefreshTime,
    /// How far ahead the fixture range fetch looks, in days.
    pub fixture_range_days: i64,
    /// Granularity of the kickoff-check loop (how often due buckets are
    /// polled for), in seconds.
    pub kickoff_tick_secs: u64,
    /// Interval of the cleanup/delayed sweep, in seconds.
    pub sweep_interval_secs: u64,

    // Logging
    pub log_level: String,
    pub log_json: bool,
}

/// A fixed wall-clock UTC time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTime {
    pub hour: u32,
    pub minute: u32,
}

impl FromStr for RefreshTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid refresh time: {s}"))?;
        let hour: u32 = h.parse().map_err(|_| format!("Invalid refresh hour: {h}"))?;
        let minute: u32 = m.parse().map_err(|_| format!("Invalid refresh minute: {m}"))?;
        if hour > 23 || minute > 59 {
            return Err(format!("Refresh time out of range: {s}"));
        }
        Ok(Self { hour, minute })
    }
}

impl Settings {
    /// Load settings from environment variables (and .env file).
    pub fn from_env() -> Self {
        // Try to load .env file (ignore if not found).
        let _ = dotenvy::dotenv();

        Self {
            feed_base_url: env_str("FEED_BASE_URL", "https://api.sportsdata.example/v3"),
            feed_api_key: env_str("FEED_API_KEY", ""),
            feed_rate_limit: env_u32("FEED_RATE_LIMIT", 10),
            feed_max_retries: env_u32("FEED_MAX_RETRIES", 3),
            feed_timeout_secs: env_u64("FEED_TIMEOUT_SECONDS", 15),
            odds_timeout_secs: env_u64("ODDS_TIMEOUT_SECONDS", 5),

            daily_refresh_at: env_str("DAILY_REFRESH_AT", "04:30")
                .parse()
                .unwrap_or(RefreshTime { hour: 4, minute: 30 }),
            fixture_range_days: env_i64("FIXTURE_RANGE_DAYS", 7),
            kickoff_tick_secs: env_u64("KICKOFF_TICK_SECONDS", 20),
            sweep_interval_secs: env_u64("SWEEP_INTERVAL_SECONDS", 300),

            log_level: env_str("LOG_LEVEL", "info"),
            log_json: env_bool("LOG_JSON", false),
        }
    }

    /// Validate configuration for critical requirements.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.feed_api_key.is_empty() {
            errors.push("FEED_API_KEY is required".to_string());
        }
        if self.fixture_range_days < 1 {
            errors.push("FIXTURE_RANGE_DAYS must be at least 1".to_string());
        }
        if self.kickoff_tick_secs == 0 {
            errors.push("KICKOFF_TICK_SECONDS must be positive".to_string());
        }
        if self.sweep_interval_secs == 0 {
            errors.push("SWEEP_INTERVAL_SECONDS must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// =============================================================================
// Environment helpers
// =============================================================================

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
