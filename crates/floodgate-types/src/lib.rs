//! Shared types for the floodgate crawl rate-limit control plane.
//!
//! Everything the regulator and the worker fleet agree on lives here: the
//! key-value schema both sides read and write, the domain canonicaliser that
//! produces schema keys, the catalog source model, and the store port the
//! adapters in `floodgate-store` implement.

pub mod clock;
pub mod error;
pub mod outcome;
pub mod schema;
pub mod source;
pub mod store;
pub mod tld;

pub use clock::{unix_time_secs, MonotonicClock};
pub use error::StoreError;
pub use outcome::ErrorCode;
pub use source::Source;
pub use store::{SharedStore, StoreBatch, StoreCommand, StoreResult};
pub use tld::Tld;
