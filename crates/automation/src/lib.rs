//! Scheduled attendance automation for Shiftline.
//!
//! Two batch jobs keep attendance records honest without human input:
//!
//! - **Auto-logout** (hourly): force-closes clock-ins left open past each
//!   organization's configured end-of-day cutoff.
//! - **Auto-absent** (daily): writes an `absent` record for every active
//!   employee who never showed up that day.
//!
//! Both jobs are stateless between runs and naturally idempotent; the
//! [`scheduler`] wires them to wall-clock triggers.
//!
//! # Example
//!
//! ```no_run
//! use automation::scheduler::{self, SchedulerConfig};
//! use database::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:shiftline.db?mode=rwc").await?;
//! let handle = scheduler::start(db, SchedulerConfig::default());
//! // ... serve traffic ...
//! handle.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod auto_absent;
pub mod auto_logout;
pub mod error;
pub mod scheduler;

pub use error::{AutomationError, Result};
pub use scheduler::{Scheduler, SchedulerConfig};

/// What one automation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Organizations visited.
    pub organizations: usize,
    /// Records closed (auto-logout) or created (auto-absent).
    pub records_affected: usize,
    /// Organizations whose unit of work failed and was skipped.
    pub failures: usize,
}
