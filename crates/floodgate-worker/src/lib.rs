//! Worker-side pieces of the floodgate control plane.
//!
//! A fetch worker touches the control plane exactly twice per task: it asks
//! the [`TokenConsumer`] for permission before the outbound request, and it
//! reports the outcome to the [`StatsManager`] afterwards. Everything else
//! (rates, breakers, halts) is the regulator's business, reached only
//! through the shared store.

mod stats;
mod tokens;

pub use stats::StatsManager;
pub use tokens::{Acquire, TokenConsumer, TokenConsumerConfig};
