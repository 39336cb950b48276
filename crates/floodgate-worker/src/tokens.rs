//! Token-bucket consumption for outbound fetches.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, trace};

use floodgate_store::RetryPolicy;
use floodgate_types::schema::{self, CURR_TOKENS, HALTED, TEMP_HALTED};
use floodgate_types::{unix_time_secs, SharedStore, StoreResult};

/// Result of a token acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// A token was consumed; the fetch may proceed.
    Token,
    /// The domain is halted; the caller should re-enqueue the task without
    /// touching the bucket.
    Halted,
}

#[derive(Debug, Clone)]
pub struct TokenConsumerConfig {
    /// How long to wait before re-trying an empty bucket. The regulator
    /// refills once per tick, so anything well under a tick works.
    pub empty_backoff: Duration,
}

impl Default for TokenConsumerConfig {
    fn default() -> Self {
        Self {
            empty_backoff: Duration::from_millis(200),
        }
    }
}

/// Consumes one token per outbound request from `currtokens:{domain}`.
///
/// The decrement is the store's atomic primitive, so consumers across many
/// worker processes commute with each other and with the regulator's
/// per-tick overwrite. A decrement that would push the bucket below zero is
/// compensated immediately, keeping the observable value non-negative.
pub struct TokenConsumer {
    store: Arc<dyn SharedStore>,
    config: TokenConsumerConfig,
    retry: RetryPolicy,
}

impl TokenConsumer {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self::with_config(store, TokenConsumerConfig::default())
    }

    pub fn with_config(store: Arc<dyn SharedStore>, config: TokenConsumerConfig) -> Self {
        Self {
            store,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Blocks until a token is available for `domain`, or reports that the
    /// domain is halted.
    ///
    /// Transient store failures are retried with backoff; an error that
    /// survives the retries bubbles up for the caller to log. Every wait is
    /// an await point, so the surrounding task can be cancelled at any time
    /// without leaving partial state behind.
    pub async fn acquire(&self, domain: &str) -> StoreResult<Acquire> {
        let key = schema::prefixed(CURR_TOKENS, domain);
        loop {
            if self.is_halted(domain).await? {
                debug!(domain = %domain, "domain is halted, skipping task");
                return Ok(Acquire::Halted);
            }
            let remaining = self.retry.run(|| self.store.decr(&key)).await?;
            if remaining >= 0 {
                trace!(domain = %domain, remaining = remaining, "token acquired");
                return Ok(Acquire::Token);
            }
            // Bucket was empty: undo the decrement and wait for the next
            // regulator refill.
            self.retry.run(|| self.store.incr(&key)).await?;
            trace!(domain = %domain, "bucket empty, backing off");
            sleep(self.config.empty_backoff).await;
        }
    }

    async fn is_halted(&self, domain: &str) -> StoreResult<bool> {
        let hard = self
            .retry
            .run(|| self.store.set_contains(HALTED, domain))
            .await?;
        if hard {
            return Ok(true);
        }
        // A temporary halt is a per-domain deadline; a lapsed one no longer
        // excludes the domain even before the regulator prunes it.
        let deadline = self
            .retry
            .run(|| self.store.zset_score(TEMP_HALTED, domain))
            .await?;
        Ok(deadline.is_some_and(|until| until > unix_time_secs()))
    }
}
