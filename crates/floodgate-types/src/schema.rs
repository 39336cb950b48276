//! Key names and encodings for the shared store.
//!
//! The schema is the only contract between the worker fleet and the
//! regulator; both sides depend on these exact key names.
//!
//! Per-domain keys are built by prefixing a canonical domain
//! (`{registrable}.{suffix}`, see [`crate::Tld`]):
//!
//! - `status60s:{domain}` / `status1hr:{domain}` / `status12hr:{domain}` —
//!   sliding windows of request outcomes, scored by a monotonic timestamp
//! - `statuslast50req:{domain}` — capped list of the most recent status codes
//! - `currtokens:{domain}` — the domain's token bucket for the current tick
//! - `resize_errors:{domain}` / `num_resized:{domain}` — per-domain counters
//!
//! Global keys: `resize_errors`, `num_resized`, `known_tlds`, `halted`
//! (plain set), `temp_halted` (sorted set of domain scored by its expiry
//! deadline in wall-clock seconds).

/// Sliding-window key prefixes.
pub const STATUS_60S: &str = "status60s:";
pub const STATUS_1HR: &str = "status1hr:";
pub const STATUS_12HR: &str = "status12hr:";

/// Capped list of the most recent request outcomes per domain.
pub const LAST_50_REQUESTS: &str = "statuslast50req:";

/// Entries kept in the recent-request list.
///
/// This is the one width both sides of the schema agree on: reporters trim
/// the list to it on every write, and the hard breaker's configurable
/// sample size is validated to never exceed it.
pub const RECENT_REQUESTS_CAP: usize = 50;

/// Window intervals in seconds.
pub const ONE_MINUTE: u64 = 60;
pub const ONE_HOUR: u64 = ONE_MINUTE * 60;
pub const TWELVE_HOURS: u64 = ONE_HOUR * 12;

/// Every sliding window a reporter writes, paired with its interval.
pub const WINDOW_PAIRS: [(&str, u64); 3] = [
    (STATUS_60S, ONE_MINUTE),
    (STATUS_1HR, ONE_HOUR),
    (STATUS_12HR, TWELVE_HOURS),
];

/// Global and per-domain counters. Monotonic, never reset.
pub const ERROR_COUNT: &str = "resize_errors";
pub const TLD_ERRORS: &str = "resize_errors:";
pub const SUCCESS_COUNT: &str = "num_resized";
pub const TLD_SUCCESS: &str = "num_resized:";

/// Token bucket prefix. Overwritten by the regulator, decremented by workers.
pub const CURR_TOKENS: &str = "currtokens:";

/// Set of every domain any worker has ever observed.
pub const KNOWN_TLDS: &str = "known_tlds";

/// Domains excluded indefinitely, pending operator action.
pub const HALTED: &str = "halted";

/// Domains excluded temporarily. A sorted set: each member is a domain
/// scored by the wall-clock second its halt lapses, so every domain expires
/// on its own schedule and the system self-heals per domain.
pub const TEMP_HALTED: &str = "temp_halted";

/// Window member outcome values.
pub const SUCCEEDED: u8 = 1;
pub const FAILED: u8 = 0;

/// Builds a per-domain key from a schema prefix.
pub fn prefixed(prefix: &str, domain: &str) -> String {
    format!("{prefix}{domain}")
}

/// Encodes a sliding-window member.
///
/// A sorted set cannot hold duplicate members, so the outcome value alone is
/// not enough: the reporter's instance id and a per-instance sequence number
/// make each sample unique. Readers only parse the outcome prefix.
pub fn window_member(outcome: u8, instance: &str, seq: u64) -> String {
    format!("{outcome}:{instance}:{seq}")
}

/// Parses the outcome prefix of a window member, if well formed.
pub fn member_outcome(member: &str) -> Option<u8> {
    match member.split(':').next() {
        Some("1") => Some(SUCCEEDED),
        Some("0") => Some(FAILED),
        _ => None,
    }
}
