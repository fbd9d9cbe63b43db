//! Scheduler
//!
//! Runs the pipeline cycle (crawl, raw upsert, classification, final upsert,
//! notification) on a fixed interval or a cron schedule, and on demand. A
//! single-flight flag guarantees that timer ticks and manual triggers never
//! run two cycles at once; a trigger that finds a cycle running is dropped.

mod driver;
mod guard;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use radar_core::dto::raw_job::RawStatusUpdate;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::crawl::JobFetcher;
use crate::error::CycleError;
use crate::notify::Notifier;
use crate::processor::{Decision, JobProcessor};
use crate::store::{JobStore, RawJobStore};

pub use driver::Cadence;
use guard::FlightGuard;

/// Periodic and on-demand pipeline runner
pub struct Scheduler {
    fetcher: Arc<dyn JobFetcher>,
    raw_store: Arc<dyn RawJobStore>,
    job_store: Arc<dyn JobStore>,
    processor: Arc<dyn JobProcessor>,
    notifier: Option<Arc<dyn Notifier>>,
    cadence: Cadence,
    cycle_timeout: Duration,
    batch_size: i64,
    running: AtomicBool,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    /// * `config` - Cadence and per-cycle deadline
    /// * `batch_size` - Pending raw jobs classified per cycle
    pub fn new(
        fetcher: Arc<dyn JobFetcher>,
        raw_store: Arc<dyn RawJobStore>,
        job_store: Arc<dyn JobStore>,
        processor: Arc<dyn JobProcessor>,
        config: &SchedulerConfig,
        batch_size: i64,
    ) -> Self {
        Self {
            fetcher,
            raw_store,
            job_store,
            processor,
            notifier: None,
            cadence: Cadence::parse(&config.interval),
            cycle_timeout: config.cycle_timeout(),
            batch_size: if batch_size <= 0 { 20 } else { batch_size },
            running: AtomicBool::new(false),
        }
    }

    /// Announces newly created jobs through `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Runs one cycle unless one is already running
    ///
    /// Returns the number of final jobs created. A trigger that arrives while
    /// a cycle is in flight returns `Ok(0)` without doing anything.
    pub async fn run_once(&self) -> Result<usize, CycleError> {
        let Some(_guard) = FlightGuard::acquire(&self.running) else {
            debug!("Cycle already running, trigger dropped");
            return Ok(0);
        };

        match tokio::time::timeout(self.cycle_timeout, self.cycle()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Cycle exceeded its {:?} deadline", self.cycle_timeout);
                Err(CycleError::Timeout(self.cycle_timeout))
            }
        }
    }

    async fn cycle(&self) -> Result<usize, CycleError> {
        let candidates = self.fetcher.fetch().await?;
        let fetched = candidates.len();

        let raw = self.raw_store.upsert_raw(candidates).await?;
        let pending = self.raw_store.list_pending(self.batch_size).await?;

        let mut accepted = Vec::new();
        let mut rejected = 0;

        for raw_job in &pending {
            let outcome = self
                .processor
                .process(raw_job)
                .await
                .map_err(|source| CycleError::Process {
                    id: raw_job.id,
                    source,
                })?;

            let update = match outcome.decision {
                Decision::Accepted(job) => {
                    accepted.push(job);
                    RawStatusUpdate::processed(outcome.trace)
                }
                Decision::Rejected { reason } => {
                    rejected += 1;
                    RawStatusUpdate::rejected(reason, outcome.trace)
                }
            };

            self.raw_store.update_status(raw_job.id, update).await?;
        }

        if accepted.is_empty() {
            info!(
                "Cycle finished: fetched={} new_raw={} classified={} rejected={} created=0",
                fetched,
                raw.created,
                pending.len(),
                rejected
            );
            return Ok(0);
        }

        let upsert = self.job_store.upsert_jobs(accepted).await?;

        info!(
            "Cycle finished: fetched={} new_raw={} classified={} rejected={} created={}",
            fetched,
            raw.created,
            pending.len(),
            rejected,
            upsert.created
        );

        if let Some(notifier) = &self.notifier {
            if !upsert.new_jobs.is_empty() {
                if let Err(e) = notifier.notify(&upsert.new_jobs).await {
                    warn!(
                        "Stored {} new job(s) but notification failed: {}",
                        upsert.created, e
                    );
                    return Err(e.into());
                }
            }
        }

        Ok(upsert.created)
    }
}
