//! Shared-store adapters for the floodgate control plane.
//!
//! [`RedisStore`] is the production adapter: one multiplexed connection
//! shared by every task in the process, batches committed as atomic
//! `MULTI`/`EXEC` pipelines. [`MemoryStore`] implements the same port
//! in-process for tests and single-instance runs.

mod memory;
mod redis_store;
mod retry;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use retry::RetryPolicy;
