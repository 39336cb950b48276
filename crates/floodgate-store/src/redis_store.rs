//! Redis adapter for the shared store.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use tracing::info;

use floodgate_types::{SharedStore, StoreBatch, StoreCommand, StoreError, StoreResult};

/// Redis-backed [`SharedStore`].
///
/// The multiplexed connection is a cheap handle; each operation clones it,
/// so the adapter can be shared behind an `Arc` across every worker task and
/// the regulator without locking.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the store at `dsn` (e.g. `redis://localhost:6379`).
    pub async fn connect(dsn: &str) -> StoreResult<Self> {
        info!(dsn = %dsn, "connecting to shared store");
        let client =
            redis::Client::open(dsn).map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!("shared store connection established");
        Ok(Self { conn })
    }
}

fn command_err(e: redis::RedisError) -> StoreError {
    StoreError::Command(e.to_string())
}

/// Formats a score bound for `ZRANGEBYSCORE`/`ZREMRANGEBYSCORE`.
fn score_bound(value: f64) -> String {
    if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn commit(&self, batch: StoreBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in batch.into_commands() {
            match command {
                StoreCommand::Incr { key } => {
                    pipe.incr(key, 1i64).ignore();
                }
                StoreCommand::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                StoreCommand::ZAdd { key, member, score } => {
                    pipe.zadd(key, member, score).ignore();
                }
                StoreCommand::ZRemBelow { key, cutoff } => {
                    pipe.zrembyscore(key, "-inf", score_bound(cutoff)).ignore();
                }
                StoreCommand::RPush { key, value } => {
                    pipe.rpush(key, value).ignore();
                }
                StoreCommand::LTrim { key, start, stop } => {
                    pipe.ltrim(key, start, stop).ignore();
                }
                StoreCommand::SAdd { key, member } => {
                    pipe.sadd(key, member).ignore();
                }
                StoreCommand::Del { key } => {
                    pipe.del(key).ignore();
                }
            }
        }
        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(command_err)?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1i64).await.map_err(command_err)
    }

    async fn decr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        conn.decr(key, 1i64).await.map_err(command_err)
    }

    async fn get_i64(&self, key: &str) -> StoreResult<Option<i64>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(command_err)
    }

    async fn set_i64(&self, key: &str, value: i64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await.map_err(command_err)?;
        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(key, start, stop).await.map_err(command_err)
    }

    async fn list_len(&self, key: &str) -> StoreResult<usize> {
        let mut conn = self.conn.clone();
        conn.llen(key).await.map_err(command_err)
    }

    async fn window_range(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.zrangebyscore(key, score_bound(min), score_bound(max))
            .await
            .map_err(command_err)
    }

    async fn zset_score(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let mut conn = self.conn.clone();
        conn.zscore(key, member).await.map_err(command_err)
    }

    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        conn.sadd(key, member).await.map_err(command_err)
    }

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        conn.sismember(key, member).await.map_err(command_err)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(command_err)
    }
}
