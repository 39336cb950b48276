//! The floodgate rate regulator.
//!
//! A single long-running task that reconciles catalog size data with
//! worker-reported health, one tick at a time: fetch the source list,
//! compute each known domain's target rate, run the circuit breakers, and
//! overwrite the token buckets the workers drain.

mod breaker;
mod catalog;
mod rates;
mod regulator;

pub use breaker::{evaluate_breakers, Verdict};
pub use catalog::{CatalogClient, CatalogError};
pub use rates::compute_crawl_rate;
pub use regulator::RateRegulator;
