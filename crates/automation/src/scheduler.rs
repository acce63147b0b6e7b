//! Wall-clock scheduling for the automation jobs.
//!
//! Two independent background tasks: an interval loop for the hourly
//! auto-logout pass and a sleep-until-time loop for the daily auto-absent
//! pass. A pass that fails logs and waits for the next trigger; there is
//! no retry queue — the next scheduled run is the retry.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};
use tokio::task::JoinHandle;
use tracing::{error, info};

use database::Database;

use crate::{auto_absent, auto_logout};

/// Scheduler configuration.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// How often the auto-logout pass runs.
    pub logout_interval: Duration,
    /// Local time of day the auto-absent pass runs.
    pub absent_run_time: NaiveTime,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            logout_interval: Duration::from_secs(60 * 60),
            // Late enough that the workday is over everywhere the platform
            // is deployed, early enough to land before midnight.
            absent_run_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
        }
    }
}

impl SchedulerConfig {
    /// Set the auto-logout interval.
    pub fn with_logout_interval(mut self, interval: Duration) -> Self {
        self.logout_interval = interval;
        self
    }

    /// Set the daily auto-absent run time.
    pub fn with_absent_run_time(mut self, time: NaiveTime) -> Self {
        self.absent_run_time = time;
        self
    }
}

/// Handles to the running automation tasks.
pub struct Scheduler {
    logout_task: JoinHandle<()>,
    absent_task: JoinHandle<()>,
}

impl Scheduler {
    /// Stop both automation loops.
    pub fn shutdown(&self) {
        self.logout_task.abort();
        self.absent_task.abort();
    }
}

/// Spawn the automation loops.
pub fn start(db: Database, config: SchedulerConfig) -> Scheduler {
    info!(
        logout_interval = ?config.logout_interval,
        absent_run_time = %config.absent_run_time,
        "starting attendance automation"
    );

    let logout_db = db.clone();
    let logout_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.logout_interval);
        loop {
            interval.tick().await;
            let now = Local::now().fixed_offset();
            if let Err(e) = auto_logout::run(&logout_db, now).await {
                error!(error = %e, "auto-logout pass failed");
            }
        }
    });

    let absent_task = tokio::spawn(async move {
        loop {
            let wait = until_next(config.absent_run_time, Local::now());
            tokio::time::sleep(wait).await;
            let date = Local::now().format("%Y-%m-%d").to_string();
            if let Err(e) = auto_absent::run(&db, &date).await {
                error!(error = %e, "auto-absent pass failed");
            }
        }
    });

    Scheduler {
        logout_task,
        absent_task,
    }
}

/// Duration until the next occurrence of `target` local time.
fn until_next(target: NaiveTime, now: DateTime<Local>) -> Duration {
    let today = now.date_naive().and_time(target);
    let next = if now.naive_local() < today {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now.naive_local()).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn until_next_same_day() {
        let now = Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let target = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        assert_eq!(until_next(target, now), Duration::from_secs(14 * 60 * 60));
    }

    #[test]
    fn until_next_rolls_to_tomorrow() {
        let now = Local.with_ymd_and_hms(2025, 3, 10, 23, 30, 0).unwrap();
        let target = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        assert_eq!(
            until_next(target, now),
            Duration::from_secs(23 * 60 * 60 + 30 * 60)
        );
    }
}
