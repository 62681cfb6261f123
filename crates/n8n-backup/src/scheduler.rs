//! Runs backup cycles on a cron schedule.
//!

use core::time::Duration;
use std::thread::sleep;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::{
    cycle::{BackupReport, CycleError, Pipeline},
    schedule::{Schedule, ScheduleError},
};

/// Owns the run loop.
pub struct Scheduler {
    schedule: Schedule,
    pipeline: Pipeline,
    run_on_start: bool,
}

impl Scheduler {
    /// Create a scheduler.
    ///
    /// Fails if the schedule never fires, so the loop always has a next run.
    pub fn new(
        schedule: Schedule,
        pipeline: Pipeline,
        run_on_start: bool,
    ) -> Result<Self, ScheduleError> {
        if schedule.next_after(Utc::now()).is_none() {
            return Err(ScheduleError::NeverFires);
        }

        Ok(Self {
            schedule,
            pipeline,
            run_on_start,
        })
    }

    /// The next fire time strictly after `now` and how long to sleep until it.
    ///
    /// The delay is never negative.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Duration)> {
        let next = self.schedule.next_after(now)?;
        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
        Some((next, delay))
    }

    /// Run the initial cycle if enabled.
    ///
    /// A failure is logged and returned, it never stops the scheduler.
    pub fn run_initial(&self) -> Option<Result<BackupReport, CycleError>> {
        if !self.run_on_start {
            return None;
        }

        info!("Running initial backup on start");
        let result = self.pipeline.run_backup();
        if result.is_err() {
            error!("Initial backup failed, but continuing to schedule future backups.");
        }

        Some(result)
    }

    /// Run one scheduled cycle.
    ///
    /// A failure is logged and returned, the next cycle is still scheduled.
    pub fn tick(&self) -> Result<BackupReport, CycleError> {
        let result = self.pipeline.run_backup();
        if result.is_err() {
            error!("Backup failed. Will retry at next scheduled time.");
        }

        result
    }

    /// Run backups forever.
    pub fn run(&self) -> ! {
        let _ = self.run_initial();

        loop {
            let Some((next, delay)) = self.next_delay(Utc::now()) else {
                // Only reachable if the schedule stopped firing after startup.
                error!(
                    "Schedule '{}' has no future runs, checking again in an hour",
                    self.schedule
                );
                sleep(Duration::from_secs(60 * 60));
                continue;
            };

            let hours = delay.as_secs_f64() / 3600.0;
            info!(
                "Next backup scheduled at {} (in {hours:.1}h)",
                next.format("%Y-%m-%d %H:%M:%S UTC")
            );
            sleep(delay);

            let _ = self.tick();
        }
    }
}
