//! Health-aware circuit breaking.
//!
//! Two breakers run in parallel per domain. The hard breaker watches the
//! recent-request list for a solid run of server errors and excludes the
//! domain until an operator intervenes. The temporary breaker watches the
//! one-minute window for an elevated failure ratio and excludes the domain
//! behind a store-side TTL, so it heals on its own.

use floodgate_config::RegulatorConfig;
use floodgate_types::schema::{self, member_outcome, FAILED, LAST_50_REQUESTS, STATUS_60S};
use floodgate_types::{MonotonicClock, SharedStore, StoreResult};

/// Outcome of one breaker evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Refill the bucket normally.
    Healthy,
    /// Exclude indefinitely, pending operator action.
    HardHalt,
    /// Exclude until the store-side TTL lapses.
    TempHalt,
}

/// Evaluates both breakers for a domain. The hard breaker wins when both
/// would trip.
pub async fn evaluate_breakers(
    store: &dyn SharedStore,
    clock: &MonotonicClock,
    domain: &str,
    config: &RegulatorConfig,
) -> StoreResult<Verdict> {
    if hard_halt_tripped(store, domain, config).await? {
        return Ok(Verdict::HardHalt);
    }
    if temp_halt_tripped(store, clock, domain, config).await? {
        return Ok(Verdict::TempHalt);
    }
    Ok(Verdict::Healthy)
}

/// A domain hard-halts when the last `hard_halt_sample_size` entries of the
/// recent-request list all encode a server error (status ≥ 500). Mixed 5xx
/// codes all count toward the same threshold. The sample size is validated
/// at startup to never exceed the list width reporters actually write
/// ([`floodgate_types::schema::RECENT_REQUESTS_CAP`]), so the breaker can
/// always see enough history to trip.
async fn hard_halt_tripped(
    store: &dyn SharedStore,
    domain: &str,
    config: &RegulatorConfig,
) -> StoreResult<bool> {
    let entries = store
        .list_range(
            &schema::prefixed(LAST_50_REQUESTS, domain),
            -(config.hard_halt_sample_size as isize),
            -1,
        )
        .await?;
    if entries.len() < config.hard_halt_sample_size {
        return Ok(false);
    }
    let server_errors = entries.iter().filter(|e| is_server_error(e)).count();
    Ok(server_errors >= config.hard_halt_sample_size)
}

/// A domain temp-halts when the one-minute window holds enough samples and
/// the failure share reaches the configured ratio.
async fn temp_halt_tripped(
    store: &dyn SharedStore,
    clock: &MonotonicClock,
    domain: &str,
    config: &RegulatorConfig,
) -> StoreResult<bool> {
    let now = clock.now_secs();
    let members = store
        .window_range(
            &schema::prefixed(STATUS_60S, domain),
            now - schema::ONE_MINUTE as f64,
            f64::INFINITY,
        )
        .await?;

    let outcomes: Vec<u8> = members.iter().filter_map(|m| member_outcome(m)).collect();
    let total = outcomes.len();
    if total < config.temp_halt_min_samples {
        return Ok(false);
    }
    let failures = outcomes.iter().filter(|o| **o == FAILED).count();
    Ok(failures as f64 >= config.temp_halt_threshold_ratio * total as f64)
}

fn is_server_error(entry: &str) -> bool {
    entry.parse::<u16>().map(|code| code >= 500).unwrap_or(false)
}
