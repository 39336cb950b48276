//! Regulator configuration.
//!
//! All knobs are environment variables with the exact names below; the
//! regulator binary loads them once at startup and refuses to run on any
//! invalid value. There is no module-level implicit configuration: one
//! immutable [`RegulatorConfig`] is threaded through every constructor.
//!
//! | Variable | Default |
//! |---|---|
//! | `MIN_CRAWL_RPS` | `5` |
//! | `MAX_CRAWL_RPS` | `200` |
//! | `MAX_CRAWL_SIZE` | `100000000` |
//! | `TICK_SECONDS` | `1` |
//! | `CATALOG_URL` | required |
//! | `CATALOG_TIMEOUT_SECONDS` | `5` |
//! | `STORE_DSN` | `redis://localhost:6379` |
//! | `TEMP_HALT_MIN_SAMPLES` | `10` |
//! | `TEMP_HALT_THRESHOLD_RATIO` | `0.25` |
//! | `TEMP_HALT_TTL_SECONDS` | `300` |
//! | `HARD_HALT_SAMPLE_SIZE` | `50` |
//!
//! `HARD_HALT_SAMPLE_SIZE` may be lowered but never raised past the
//! recent-request list width the workers actually write
//! ([`floodgate_types::schema::RECENT_REQUESTS_CAP`]); a larger value could
//! never be satisfied and would silently disable the hard breaker, so it is
//! rejected at startup instead.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use floodgate_types::schema::RECENT_REQUESTS_CAP;

/// Configuration errors are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required configuration variable {var} is not set")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Immutable configuration for the rate regulator and its breakers.
#[derive(Debug, Clone)]
pub struct RegulatorConfig {
    /// Floor crawl rate in requests per second.
    pub min_crawl_rps: u32,
    /// Ceiling crawl rate in requests per second.
    pub max_crawl_rps: u32,
    /// Image count at or above which a source is crawled at the ceiling.
    pub max_crawl_size: u64,
    /// Regulator tick period. One second makes `currtokens` mean
    /// "requests permitted in the next second".
    pub tick: Duration,
    /// Base URL of the catalog service exposing `/v1/sources`.
    pub catalog_url: String,
    /// Timeout for the catalog fetch.
    pub catalog_timeout: Duration,
    /// Shared-store connection string.
    pub store_dsn: String,
    /// Minimum window population before a temporary halt can trip.
    pub temp_halt_min_samples: usize,
    /// Failure ratio at which a temporary halt trips.
    pub temp_halt_threshold_ratio: f64,
    /// How long a temporary halt lasts; each halted domain carries its own
    /// expiry deadline.
    pub temp_halt_ttl: Duration,
    /// How many trailing recent-request entries the hard breaker inspects.
    /// At most the shared list width, which is what reporters trim to.
    pub hard_halt_sample_size: usize,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            min_crawl_rps: 5,
            max_crawl_rps: 200,
            max_crawl_size: 100_000_000,
            tick: Duration::from_secs(1),
            catalog_url: "http://localhost:8000".to_string(),
            catalog_timeout: Duration::from_secs(5),
            store_dsn: "redis://localhost:6379".to_string(),
            temp_halt_min_samples: 10,
            temp_halt_threshold_ratio: 0.25,
            temp_halt_ttl: Duration::from_secs(300),
            hard_halt_sample_size: RECENT_REQUESTS_CAP,
        }
    }
}

impl RegulatorConfig {
    /// Loads configuration from the environment and validates it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            min_crawl_rps: parse_var("MIN_CRAWL_RPS", defaults.min_crawl_rps)?,
            max_crawl_rps: parse_var("MAX_CRAWL_RPS", defaults.max_crawl_rps)?,
            max_crawl_size: parse_var("MAX_CRAWL_SIZE", defaults.max_crawl_size)?,
            tick: Duration::from_secs(parse_var("TICK_SECONDS", 1u64)?),
            catalog_url: require_var("CATALOG_URL")?,
            catalog_timeout: Duration::from_secs(parse_var("CATALOG_TIMEOUT_SECONDS", 5u64)?),
            store_dsn: parse_var("STORE_DSN", defaults.store_dsn)?,
            temp_halt_min_samples: parse_var(
                "TEMP_HALT_MIN_SAMPLES",
                defaults.temp_halt_min_samples,
            )?,
            temp_halt_threshold_ratio: parse_var(
                "TEMP_HALT_THRESHOLD_RATIO",
                defaults.temp_halt_threshold_ratio,
            )?,
            temp_halt_ttl: Duration::from_secs(parse_var("TEMP_HALT_TTL_SECONDS", 300u64)?),
            hard_halt_sample_size: parse_var(
                "HARD_HALT_SAMPLE_SIZE",
                defaults.hard_halt_sample_size,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the regulator cannot safely run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_crawl_rps == 0 {
            return Err(invalid("MIN_CRAWL_RPS", "must be at least 1"));
        }
        if self.max_crawl_rps < self.min_crawl_rps {
            return Err(invalid(
                "MAX_CRAWL_RPS",
                "must be greater than or equal to MIN_CRAWL_RPS",
            ));
        }
        if self.max_crawl_size == 0 {
            return Err(invalid("MAX_CRAWL_SIZE", "must be positive"));
        }
        if self.tick.is_zero() {
            return Err(invalid("TICK_SECONDS", "must be positive"));
        }
        if Url::parse(&self.catalog_url).is_err() {
            return Err(invalid("CATALOG_URL", "must be an absolute URL"));
        }
        if self.temp_halt_min_samples == 0 {
            return Err(invalid("TEMP_HALT_MIN_SAMPLES", "must be at least 1"));
        }
        if !(self.temp_halt_threshold_ratio > 0.0 && self.temp_halt_threshold_ratio <= 1.0) {
            return Err(invalid(
                "TEMP_HALT_THRESHOLD_RATIO",
                "must be within (0, 1]",
            ));
        }
        if self.hard_halt_sample_size == 0 {
            return Err(invalid("HARD_HALT_SAMPLE_SIZE", "must be at least 1"));
        }
        if self.hard_halt_sample_size > RECENT_REQUESTS_CAP {
            return Err(invalid(
                "HARD_HALT_SAMPLE_SIZE",
                &format!(
                    "must not exceed {RECENT_REQUESTS_CAP}, the recent-request list width"
                ),
            ));
        }
        Ok(())
    }
}

fn invalid(var: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}

fn require_var(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { var }),
    }
}

fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
