//! Scheduler drivers
//!
//! Fixed intervals feed ticks through a channel. After every cycle the queued
//! ticks are drained, so a burst that piled up during a long cycle leads to a
//! single follow-up cycle. Cron schedules sleep until the next matching
//! minute in local time.

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Scheduler;
use crate::config::parse_duration;
use crate::cron::CronSchedule;
use crate::error::CycleError;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// How periodic cycles are triggered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cadence {
    Interval(Duration),
    Cron(CronSchedule),
}

impl Cadence {
    /// Parses a duration (e.g., "2h", "1h30m") or a five-field cron expression
    ///
    /// Anything else falls back to a two-hour interval.
    pub fn parse(schedule: &str) -> Self {
        let schedule = schedule.trim();

        if let Some(period) = parse_duration(schedule) {
            return Cadence::Interval(period);
        }

        match schedule.parse::<CronSchedule>() {
            Ok(schedule) => Cadence::Cron(schedule),
            Err(e) => {
                warn!(
                    "Invalid schedule {:?} ({}), falling back to every {}",
                    schedule,
                    e,
                    humantime::format_duration(DEFAULT_INTERVAL)
                );
                Cadence::Interval(DEFAULT_INTERVAL)
            }
        }
    }
}

impl Scheduler {
    /// Runs cycles on the configured cadence until `cancel` fires
    ///
    /// A cycle error ends the loop and is returned. A cycle in flight when
    /// `cancel` fires runs to completion or to its own deadline.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CycleError> {
        match &self.cadence {
            Cadence::Interval(period) => {
                info!(
                    "Starting scheduler (interval: {})",
                    humantime::format_duration(*period)
                );

                let (tx, rx) = mpsc::channel(1);
                let ticker_cancel = cancel.child_token();
                let ticker = tokio::spawn(forward_ticks(*period, tx, ticker_cancel.clone()));

                let result = self.run_with_ticks(rx, cancel).await;

                ticker_cancel.cancel();
                if let Err(e) = ticker.await {
                    warn!("Ticker task failed: {}", e);
                }
                result
            }
            Cadence::Cron(schedule) => {
                info!("Starting scheduler (cron)");
                self.run_cron(schedule, cancel).await
            }
        }
    }

    /// Runs one cycle per received tick, coalescing ticks queued meanwhile
    ///
    /// Returns when `cancel` fires, when the tick channel closes or when a
    /// cycle fails.
    pub async fn run_with_ticks(
        &self,
        mut ticks: mpsc::Receiver<()>,
        cancel: CancellationToken,
    ) -> Result<(), CycleError> {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Scheduler stopped");
                    return Ok(());
                }
                tick = ticks.recv() => {
                    if tick.is_none() {
                        debug!("Tick source closed");
                        return Ok(());
                    }

                    let created = self.run_once().await?;
                    debug!("Scheduled cycle created {} job(s)", created);

                    let mut coalesced = 0;
                    while ticks.try_recv().is_ok() {
                        coalesced += 1;
                    }
                    if coalesced > 0 {
                        debug!("Coalesced {} queued tick(s)", coalesced);
                    }
                }
            }
        }
    }

    async fn run_cron(
        &self,
        schedule: &CronSchedule,
        cancel: CancellationToken,
    ) -> Result<(), CycleError> {
        let mut fired = None;

        loop {
            let now = Local::now();
            let next = next_fire(schedule, &now, fired.as_ref()).ok_or(CycleError::NoSchedule)?;
            let wait = (next - now).to_std().unwrap_or_default();
            debug!("Next cron run at {}", next.to_rfc3339());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Scheduler stopped");
                    return Ok(());
                }
                _ = time::sleep(wait) => {
                    fired = Some(next);
                    let created = self.run_once().await?;
                    debug!("Cron cycle created {} job(s)", created);
                }
            }
        }
    }
}

/// Next cron time after `now`, scanning from the last fired minute when the
/// timer woke before the wall clock reached it
fn next_fire<Tz: TimeZone>(
    schedule: &CronSchedule,
    now: &DateTime<Tz>,
    fired: Option<&DateTime<Tz>>,
) -> Option<DateTime<Tz>> {
    let from = match fired {
        Some(fired) if fired > now => fired,
        _ => now,
    };
    schedule.next_after(from)
}

/// Sends a tick every `period`, starting one period from now
async fn forward_ticks(period: Duration, ticks: mpsc::Sender<()>, cancel: CancellationToken) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {
                // A full channel already holds a pending tick
                if ticks.try_send(()).is_err() && ticks.is_closed() {
                    return;
                }
            }
        }
    }
}
