use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, error, warn};
use prometheus::Registry;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::appender::InstanceResolver;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::scrape::metrics::Metrics;
use crate::scrape::scrape_loop::ScrapeLoop;
use crate::scrape::{JobKey, ScrapeConfig};

/// Runtime state of one active job. Owned exclusively by the scraper's job
/// table; never shared.
struct RunningJob {
    config: ScrapeConfig,
    generation: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RunningJob {
    /// Cancels the loop and waits for it to fully terminate, including any
    /// in-flight transaction.
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            error!("scrape loop terminated abnormally: {}", err);
        }
    }
}

/// The scheduler. Owns the set of running scrape jobs, reconciles applied
/// configuration against it, and exposes lifecycle control.
pub struct Scraper {
    resolver: Arc<dyn InstanceResolver>,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<Metrics>,
    // Single serializing lock around the job table; all diffs observe a
    // total order.
    jobs: Mutex<AHashMap<JobKey, RunningJob>>,
    generation: AtomicU64,
}

impl Scraper {
    pub fn new(resolver: Arc<dyn InstanceResolver>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_registry(resolver, fetcher, None)
    }

    pub fn with_registry(
        resolver: Arc<dyn InstanceResolver>,
        fetcher: Arc<dyn Fetcher>,
        registry: Option<&Registry>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            metrics: Arc::new(Metrics::new(registry)),
            jobs: Mutex::new(AHashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Reconciles the running jobs against `configs`.
    ///
    /// Jobs absent from `configs` are stopped; new or structurally changed
    /// specs are (re)started. Unchanged specs are left untouched, so applying
    /// the same list twice is a no-op. Jobs whose instance cannot be resolved
    /// (or whose spec fails validation) are reported in an aggregated
    /// [`Error::Apply`] without preventing sibling jobs from starting.
    pub async fn apply_config(&self, configs: Vec<ScrapeConfig>) -> Result<()> {
        let mut jobs = self.jobs.lock().await;

        let mut desired: AHashMap<JobKey, ScrapeConfig> = AHashMap::with_capacity(configs.len());
        for config in configs {
            let key = config.key();
            if desired.insert(key.clone(), config).is_some() {
                warn!("duplicate scrape config; job={}, keeping the last one", key);
            }
        }

        // Stop phase first: removed and changed jobs terminate fully before
        // any start, so two jobs with one key never coexist.
        let stale: Vec<JobKey> = jobs
            .iter()
            .filter(|(key, job)| desired.get(key) != Some(&job.config))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            if let Some(job) = jobs.remove(&key) {
                debug!("stopping scrape job; job={}", key);
                job.stop().await;
            }
        }

        let mut errs = Vec::new();
        for (key, config) in desired {
            if jobs.contains_key(&key) {
                continue; // unchanged
            }
            if let Err(err) = config.validate() {
                warn!("rejecting scrape job; job={}: {}", key, err);
                errs.push(err);
                continue;
            }
            // Existence check only; the loop re-resolves the sink each tick.
            if let Err(err) = self.resolver.resolve(&key.instance) {
                warn!("failed to start scrape job; job={}: {}", key, err);
                errs.push(err);
                continue;
            }

            let generation = self.generation.fetch_add(1, Ordering::Relaxed);
            let cancel = CancellationToken::new();
            let scrape_loop = ScrapeLoop::new(
                key.clone(),
                config.clone(),
                Arc::clone(&self.resolver),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.metrics),
            );
            let handle = tokio::spawn(scrape_loop.run(cancel.clone()));
            debug!("started scrape job; job={} generation={}", key, generation);
            jobs.insert(
                key,
                RunningJob {
                    config,
                    generation,
                    cancel,
                    handle,
                },
            );
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(Error::Apply(errs))
        }
    }

    /// Cancels every running job and blocks until each has fully terminated.
    /// Idempotent.
    pub async fn stop(&self) {
        let mut jobs = self.jobs.lock().await;
        for (key, job) in jobs.drain() {
            debug!("stopping scrape job; job={}", key);
            job.stop().await;
        }
    }

    /// Currently running jobs with their generation markers. A job keeps its
    /// generation for as long as it runs; a restart assigns a new one.
    pub async fn active_jobs(&self) -> Vec<(JobKey, u64)> {
        let jobs = self.jobs.lock().await;
        let mut active: Vec<_> = jobs
            .iter()
            .map(|(key, job)| (key.clone(), job.generation))
            .collect();
        active.sort();
        active
    }
}
