//! The control loop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use floodgate_config::RegulatorConfig;
use floodgate_types::schema::{self, CURR_TOKENS, HALTED, KNOWN_TLDS, TEMP_HALTED};
use floodgate_types::{unix_time_secs, MonotonicClock, SharedStore, Source, StoreBatch, Tld};

use crate::breaker::{evaluate_breakers, Verdict};
use crate::catalog::CatalogClient;
use crate::rates::compute_crawl_rate;

/// The rate regulator task.
///
/// One instance runs per deployment. Each tick it polls the catalog,
/// recomputes every known domain's target rate, applies the circuit
/// breakers, and overwrites the token buckets. Buckets are overwritten, not
/// topped up, which bounds any burst to a single tick's budget.
pub struct RateRegulator {
    config: RegulatorConfig,
    store: Arc<dyn SharedStore>,
    catalog: CatalogClient,
    clock: MonotonicClock,
    running: Arc<AtomicBool>,
}

impl RateRegulator {
    pub fn new(
        config: RegulatorConfig,
        store: Arc<dyn SharedStore>,
        catalog: CatalogClient,
        clock: MonotonicClock,
    ) -> Self {
        Self {
            config,
            store,
            catalog,
            clock,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Runs the regulation loop until [`RateRegulator::stop`] is called.
    ///
    /// No error escapes the loop: a failed tick is logged and the loop
    /// sleeps to the next one.
    pub async fn run(&self) {
        self.running.store(true, Ordering::Relaxed);
        info!(
            tick_secs = self.config.tick.as_secs(),
            min_rps = self.config.min_crawl_rps,
            max_rps = self.config.max_crawl_rps,
            "rate regulator started"
        );

        while self.running.load(Ordering::Relaxed) {
            if let Err(e) = self.tick().await {
                warn!(error = %e, "tick skipped");
            }
            sleep(self.config.tick).await;
        }

        info!("rate regulator stopped");
    }

    /// Requests a cooperative stop; the loop exits after the current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// One pass over the catalog.
    pub async fn tick(&self) -> Result<()> {
        let sources = self
            .catalog
            .fetch_sources()
            .await
            .context("fetching source catalog")?;

        let known: HashSet<String> = self
            .store
            .set_members(KNOWN_TLDS)
            .await
            .context("reading known domains")?
            .into_iter()
            .collect();
        let halted: HashSet<String> = self
            .store
            .set_members(HALTED)
            .await
            .context("reading halted domains")?
            .into_iter()
            .collect();

        for source in &sources {
            // cancellation point between sources, never mid-batch
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = self.regulate_source(source, &known, &halted).await {
                warn!(
                    source = %source.source_name,
                    error = %e,
                    "source skipped this tick"
                );
            }
        }
        Ok(())
    }

    async fn regulate_source(
        &self,
        source: &Source,
        known: &HashSet<String>,
        halted: &HashSet<String>,
    ) -> Result<()> {
        let domain = Tld::from_url(&source.source_url).key();

        if !known.contains(&domain) {
            debug!(domain = %domain, "no worker has observed this domain yet");
            return Ok(());
        }
        if halted.contains(&domain) {
            debug!(domain = %domain, "domain is halted, refill skipped");
            return Ok(());
        }

        let target_rps = compute_crawl_rate(source.image_count, &self.config);
        let tokens_key = schema::prefixed(CURR_TOKENS, &domain);

        match evaluate_breakers(self.store.as_ref(), &self.clock, &domain, &self.config).await? {
            Verdict::HardHalt => {
                let mut batch = StoreBatch::new();
                batch.sadd(HALTED, &domain).set(&tokens_key, 0);
                self.store.commit(batch).await?;
                warn!(domain = %domain, "hard halt: sustained server errors");
            }
            Verdict::TempHalt => {
                // Each domain gets its own deadline; writing one domain's
                // halt must not extend any other domain's exclusion. Lapsed
                // entries are pruned in the same batch.
                let now = unix_time_secs();
                let mut batch = StoreBatch::new();
                batch
                    .zrem_below(TEMP_HALTED, now)
                    .zadd(TEMP_HALTED, &domain, now + self.config.temp_halt_ttl.as_secs_f64())
                    .set(&tokens_key, 0);
                self.store.commit(batch).await?;
                warn!(
                    domain = %domain,
                    ttl_secs = self.config.temp_halt_ttl.as_secs(),
                    "temporary halt: elevated failure ratio"
                );
            }
            Verdict::Healthy => {
                self.store.set_i64(&tokens_key, target_rps as i64).await?;
                debug!(
                    domain = %domain,
                    target_rps = target_rps,
                    image_count = source.image_count,
                    "bucket refilled"
                );
            }
        }
        Ok(())
    }
}
