use std::sync::Arc;

use ahash::AHashMap;
use futures::future;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::appender::{Appender, InstanceResolver};
use crate::discover::TargetGroup;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, ScrapeResult};
use crate::scrape::metrics::Metrics;
use crate::scrape::target::{targets_from_group, ResolvedTarget};
use crate::scrape::{JobKey, ScrapeConfig};

/// The self-contained execution loop of one running scrape job: discovery
/// intake, the scrape ticker, and cancellation, multiplexed on one task.
pub(crate) struct ScrapeLoop {
    key: JobKey,
    config: ScrapeConfig,
    resolver: Arc<dyn InstanceResolver>,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<Metrics>,
    // source -> latest group for that source
    groups: AHashMap<String, TargetGroup>,
}

impl ScrapeLoop {
    pub(crate) fn new(
        key: JobKey,
        config: ScrapeConfig,
        resolver: Arc<dyn InstanceResolver>,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            key,
            config,
            resolver,
            fetcher,
            metrics,
            groups: AHashMap::new(),
        }
    }

    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let discoverer = self.config.discovery.discoverer();
        let disc_cancel = cancel.child_token();
        let disc_handle = tokio::spawn({
            let disc_cancel = disc_cancel.clone();
            async move { discoverer.run(tx, disc_cancel).await }
        });

        let mut ticker = time::interval_at(
            time::Instant::now() + self.config.scrape_interval,
            self.config.scrape_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut intake_open = true;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                update = rx.recv(), if intake_open => match update {
                    Some(groups) => self.sync(groups),
                    None => {
                        debug!("discovery channel closed; job={}", self.key);
                        intake_open = false;
                    }
                },
                _ = ticker.tick() => self.scrape_tick(&cancel).await,
            }
        }

        disc_cancel.cancel();
        let _ = disc_handle.await;
        debug!("scrape loop stopped; job={}", self.key);
    }

    /// Applies a discovery update: last writer wins per source, an empty
    /// group removes its source.
    fn sync(&mut self, groups: Vec<TargetGroup>) {
        for group in groups {
            debug!(
                "target group update; job={} source={} targets={}",
                self.key,
                group.source,
                group.targets.len()
            );
            if group.targets.is_empty() {
                self.groups.remove(&group.source);
            } else {
                self.groups.insert(group.source.clone(), group);
            }
        }
    }

    fn snapshot(&self) -> Vec<ResolvedTarget> {
        let mut targets = Vec::new();
        for group in self.groups.values() {
            targets.extend(targets_from_group(group, &self.config));
        }
        targets
    }

    /// One fetch -> append -> commit/rollback cycle over the current target
    /// snapshot. Ticks are strictly sequential: this future completes before
    /// the loop polls the ticker again.
    async fn scrape_tick(&mut self, cancel: &CancellationToken) {
        let targets = self.snapshot();
        if targets.is_empty() {
            return;
        }

        let timeout = self.config.scrape_timeout;
        let fetches = targets.into_iter().map(|target| {
            let fetcher = Arc::clone(&self.fetcher);
            let cancel = cancel.clone();
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => Err(Error::Canceled),
                    fetched = time::timeout(timeout, fetcher.fetch(&target)) => {
                        match fetched {
                            Ok(result) => result,
                            Err(_) => Err(Error::Timeout(target.address().to_string())),
                        }
                    }
                }
            }
        });
        let results = future::join_all(fetches).await;

        // No commit may happen once cancellation has been observed.
        if cancel.is_cancelled() {
            return;
        }

        let job = self.key.job.as_str();
        self.metrics.scrapes.with_label_values(&[job]).inc();

        // Resolved fresh every tick so instance restarts are picked up.
        let sink = match self.resolver.resolve(&self.key.instance) {
            Ok(sink) => sink,
            Err(err) => {
                warn!("dropping scrape results; job={}: {}", self.key, err);
                self.metrics.scrape_failures.with_label_values(&[job]).inc();
                return;
            }
        };

        let mut app = sink.appender();
        match append_results(app.as_mut(), &results, &self.key) {
            Ok(appended) => match app.commit() {
                Ok(()) => {
                    self.metrics
                        .appended_samples
                        .with_label_values(&[job])
                        .inc_by(appended as f64);
                }
                Err(err) => {
                    warn!("commit failed, rolling back; job={}: {}", self.key, err);
                    if let Err(err) = app.rollback() {
                        warn!("rollback failed; job={}: {}", self.key, err);
                    }
                    self.metrics.rollbacks.with_label_values(&[job]).inc();
                    self.metrics.scrape_failures.with_label_values(&[job]).inc();
                }
            },
            Err(err) => {
                warn!("append failed, rolling back; job={}: {}", self.key, err);
                if let Err(err) = app.rollback() {
                    warn!("rollback failed; job={}: {}", self.key, err);
                }
                self.metrics.rollbacks.with_label_values(&[job]).inc();
                self.metrics.scrape_failures.with_label_values(&[job]).inc();
            }
        }
    }
}

/// Appends every successfully fetched result into the open transaction.
/// Per-target fetch failures are skipped; the first append error aborts and
/// the caller rolls the whole transaction back.
fn append_results(
    app: &mut dyn Appender,
    results: &[Result<ScrapeResult>],
    key: &JobKey,
) -> Result<u64> {
    let mut appended = 0u64;
    for result in results {
        match result {
            Ok(scrape) => {
                for sample in &scrape.samples {
                    app.append(&sample.labels, sample.timestamp_ms, sample.value)?;
                    appended += 1;
                }
                for exemplar in &scrape.exemplars {
                    app.append_exemplar(&exemplar.labels, exemplar)?;
                }
            }
            Err(err) => debug!("target fetch failed; job={}: {}", key, err),
        }
    }
    Ok(appended)
}
