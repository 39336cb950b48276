//! Publishes per-request statistics to the shared store.
//!
//! Workers report what happened; they never interpret it. Each call commits
//! one atomic batch so counters, windows and the recent-request list can
//! never drift out of step, even if the surrounding task is cancelled
//! mid-operation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use floodgate_store::RetryPolicy;
use floodgate_types::schema::{
    self, ERROR_COUNT, FAILED, KNOWN_TLDS, LAST_50_REQUESTS, RECENT_REQUESTS_CAP, SUCCEEDED,
    SUCCESS_COUNT, TLD_ERRORS, TLD_SUCCESS, WINDOW_PAIRS,
};
use floodgate_types::{ErrorCode, MonotonicClock, SharedStore, StoreBatch, StoreResult, Tld};

/// Status recorded in the recent-request list for successful fetches.
const STATUS_OK: &str = "200";

/// Worker-side statistics reporter.
pub struct StatsManager {
    store: Arc<dyn SharedStore>,
    clock: MonotonicClock,
    retry: RetryPolicy,
    known_tlds: RwLock<HashSet<String>>,
    /// Distinguishes this reporter's window members from other workers'.
    instance: String,
    seq: AtomicU64,
}

impl StatsManager {
    pub fn new(store: Arc<dyn SharedStore>, clock: MonotonicClock) -> Self {
        let mut instance = Uuid::new_v4().simple().to_string();
        instance.truncate(8);
        Self {
            store,
            clock,
            retry: RetryPolicy::default(),
            known_tlds: RwLock::new(HashSet::new()),
            instance,
            seq: AtomicU64::new(0),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Records a successful fetch for the domain.
    pub async fn record_success(&self, tld: &Tld) -> StoreResult<()> {
        let domain = tld.key();
        let mut batch = StoreBatch::new();
        batch.incr(SUCCESS_COUNT);
        batch.incr(schema::prefixed(TLD_SUCCESS, &domain));
        self.push_window_samples(&mut batch, &domain, SUCCEEDED);
        self.push_recent_request(&mut batch, &domain, STATUS_OK);
        self.commit(batch).await
    }

    /// Records a failed fetch for the domain.
    ///
    /// Benign codes (`404`, undecodable image) are counted but kept out of
    /// the sliding windows so they cannot trip a breaker; the source served
    /// a valid response and only the image itself was broken.
    pub async fn record_error(&self, tld: &Tld, code: Option<ErrorCode>) -> StoreResult<()> {
        let domain = tld.key();
        let mut batch = StoreBatch::new();
        batch.incr(ERROR_COUNT);
        batch.incr(schema::prefixed(TLD_ERRORS, &domain));

        let mut affects_rate_limiting = true;
        if let Some(code) = &code {
            batch.incr(format!("{TLD_ERRORS}{domain}:{code}"));
            if code.is_benign() {
                affects_rate_limiting = false;
            }
            self.push_recent_request(&mut batch, &domain, &code.to_string());
        }
        if affects_rate_limiting {
            self.push_window_samples(&mut batch, &domain, FAILED);
        }
        self.commit(batch).await
    }

    /// Registers a domain in `known_tlds` on first sight.
    ///
    /// Idempotent: repeated calls are no-ops once the in-memory mirror has
    /// seen the domain.
    pub async fn update_tlds(&self, tld: &Tld) -> StoreResult<()> {
        let domain = tld.key();
        if self.known_tlds.read().contains(&domain) {
            return Ok(());
        }
        self.retry
            .run(|| self.store.set_add(KNOWN_TLDS, &domain))
            .await?;
        self.known_tlds.write().insert(domain.clone());
        debug!(domain = %domain, "registered new domain");
        Ok(())
    }

    /// Inserts an outcome into all three sliding windows and trims each to
    /// its interval.
    fn push_window_samples(&self, batch: &mut StoreBatch, domain: &str, outcome: u8) {
        let now = self.clock.now_secs();
        let member = schema::window_member(
            outcome,
            &self.instance,
            self.seq.fetch_add(1, Ordering::Relaxed),
        );
        for (prefix, interval) in WINDOW_PAIRS {
            let key = schema::prefixed(prefix, domain);
            batch.zadd(&key, &member, now);
            batch.zrem_below(&key, now - interval as f64);
        }
    }

    /// Appends a status to the recent-request list, dropping the oldest
    /// entries beyond the cap.
    fn push_recent_request(&self, batch: &mut StoreBatch, domain: &str, status: &str) {
        let key = schema::prefixed(LAST_50_REQUESTS, domain);
        batch.rpush(&key, status);
        batch.ltrim(&key, -(RECENT_REQUESTS_CAP as isize), -1);
    }

    async fn commit(&self, batch: StoreBatch) -> StoreResult<()> {
        self.retry.run(|| self.store.commit(batch.clone())).await
    }
}
