//! The shared-store port.
//!
//! The control plane never talks to Redis directly; it talks to
//! [`SharedStore`], and `floodgate-store` supplies the Redis and in-memory
//! adapters. Multi-key updates are expressed as a [`StoreBatch`] so adapters
//! can commit them atomically: a batch that is dropped without being
//! committed writes nothing, which is what makes cancellation at any await
//! point safe.

use async_trait::async_trait;

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// One command inside a transactional batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// Increment an integer key by one.
    Incr { key: String },
    /// Overwrite an integer key.
    Set { key: String, value: i64 },
    /// Add a scored member to a sorted set, updating the score if present.
    ZAdd {
        key: String,
        member: String,
        score: f64,
    },
    /// Remove sorted-set members with score at or below `cutoff`.
    ZRemBelow { key: String, cutoff: f64 },
    /// Append to the tail of a list.
    RPush { key: String, value: String },
    /// Trim a list to the inclusive index range, negative indices from tail.
    LTrim {
        key: String,
        start: isize,
        stop: isize,
    },
    /// Add a member to a set.
    SAdd { key: String, member: String },
    /// Delete a key.
    Del { key: String },
}

/// Accumulates commands for one atomic commit.
///
/// Mirrors a transactional pipeline: commands are buffered in order and
/// either all land or none do.
#[derive(Debug, Clone, Default)]
pub struct StoreBatch {
    commands: Vec<StoreCommand>,
}

impl StoreBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(StoreCommand::Incr { key: key.into() });
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.commands.push(StoreCommand::Set {
            key: key.into(),
            value,
        });
        self
    }

    pub fn zadd(&mut self, key: impl Into<String>, member: impl Into<String>, score: f64) -> &mut Self {
        self.commands.push(StoreCommand::ZAdd {
            key: key.into(),
            member: member.into(),
            score,
        });
        self
    }

    pub fn zrem_below(&mut self, key: impl Into<String>, cutoff: f64) -> &mut Self {
        self.commands.push(StoreCommand::ZRemBelow {
            key: key.into(),
            cutoff,
        });
        self
    }

    pub fn rpush(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(StoreCommand::RPush {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn ltrim(&mut self, key: impl Into<String>, start: isize, stop: isize) -> &mut Self {
        self.commands.push(StoreCommand::LTrim {
            key: key.into(),
            start,
            stop,
        });
        self
    }

    pub fn sadd(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.commands.push(StoreCommand::SAdd {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.commands.push(StoreCommand::Del { key: key.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn commands(&self) -> &[StoreCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<StoreCommand> {
        self.commands
    }
}

/// The command surface the control plane requires from the shared store.
///
/// Per-key operations are linearizable on the store side; no further
/// ordering is assumed across keys outside of a committed batch.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Commit a batch atomically. An empty batch is a no-op.
    async fn commit(&self, batch: StoreBatch) -> StoreResult<()>;

    /// Atomically increment an integer key, returning the new value.
    /// Missing keys count up from zero.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// Atomically decrement an integer key, returning the new value.
    async fn decr(&self, key: &str) -> StoreResult<i64>;

    /// Read an integer key, `None` if absent.
    async fn get_i64(&self, key: &str) -> StoreResult<Option<i64>>;

    /// Overwrite an integer key.
    async fn set_i64(&self, key: &str, value: i64) -> StoreResult<()>;

    /// Read a list slice; negative indices count from the tail.
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>>;

    /// Length of a list, zero if absent.
    async fn list_len(&self, key: &str) -> StoreResult<usize>;

    /// Sorted-set members with score in `[min, max]`, ascending by score.
    /// Infinite bounds are honoured.
    async fn window_range(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>>;

    /// Score of a sorted-set member, `None` if the key or member is absent.
    async fn zset_score(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;

    /// Add a member to a set. Returns `true` if it was newly added.
    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Set membership test.
    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// All members of a set.
    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_preserves_command_order() {
        let mut batch = StoreBatch::new();
        batch
            .incr("resize_errors")
            .zadd("status60s:example.com", "0:abc:1", 12.5)
            .zrem_below("status60s:example.com", -47.5)
            .rpush("statuslast50req:example.com", "500")
            .ltrim("statuslast50req:example.com", -50, -1);

        assert_eq!(batch.len(), 5);
        assert_eq!(
            batch.commands()[0],
            StoreCommand::Incr {
                key: "resize_errors".to_string()
            }
        );
        assert!(matches!(
            batch.commands()[4],
            StoreCommand::LTrim { start: -50, stop: -1, .. }
        ));
    }

    #[test]
    fn empty_batch_is_empty() {
        let batch = StoreBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
