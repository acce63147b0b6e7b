//! Auto-logout: force-close open clock-ins past each organization's cutoff.
//!
//! For every automated organization, the cutoff is
//! `end_time hour + auto_logout_offset_hours`. Once the current hour
//! reaches the cutoff, every attendance record for the day that has a
//! clock-in and no clock-out gets a synthesized clock-out at exactly
//! `cutoff:00` and its elapsed hours computed from that. The
//! `clock_out IS NULL` query filter makes a repeat run in the same hour a
//! natural no-op.

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use tracing::{debug, error, info};

use database::models::Organization;
use database::{attendance, organization, Database};

use crate::error::{AutomationError, Result};
use crate::RunSummary;

/// Run one auto-logout pass for every automated organization.
///
/// `now` is the wall-clock instant the pass represents; each
/// organization's unit of work is independently error-isolated, so one
/// misconfigured tenant never blocks the rest of the run.
pub async fn run(db: &Database, now: DateTime<FixedOffset>) -> Result<RunSummary> {
    let orgs = organization::list_automated(db.pool()).await?;
    let mut summary = RunSummary {
        organizations: orgs.len(),
        ..RunSummary::default()
    };

    for org in orgs {
        match run_for_org(db, &org, now).await {
            Ok(closed) => summary.records_affected += closed,
            Err(e) => {
                error!(org_id = %org.id, error = %e, "auto-logout failed for organization");
                summary.failures += 1;
            }
        }
    }

    info!(
        organizations = summary.organizations,
        closed = summary.records_affected,
        failures = summary.failures,
        "auto-logout pass complete"
    );
    Ok(summary)
}

async fn run_for_org(
    db: &Database,
    org: &Organization,
    now: DateTime<FixedOffset>,
) -> Result<usize> {
    let cutoff_hour = cutoff_hour(org)?;
    if now.hour() < cutoff_hour {
        debug!(org_id = %org.id, cutoff_hour, "before cutoff, nothing to do");
        return Ok(0);
    }

    // Clock-out is synthesized at exactly cutoff:00 of the current day,
    // regardless of how late in the day the pass actually runs.
    let clock_out = NaiveTime::from_hms_opt(cutoff_hour, 0, 0)
        .and_then(|t| now.with_time(t).single())
        .ok_or_else(|| AutomationError::BadEndTime {
            org_id: org.id.clone(),
            end_time: org.end_time.clone(),
        })?
        .to_rfc3339();

    let date = now.format("%Y-%m-%d").to_string();
    let open = attendance::find_open_for_date(db.pool(), &org.id, &date).await?;

    let mut closed = 0;
    for record in open {
        let Some(clock_in) = &record.clock_in else {
            continue;
        };
        let total_hours = attendance::elapsed_hours(clock_in, &clock_out)?;
        let did_close = attendance::close_record(
            db.pool(),
            record.id,
            &clock_out,
            total_hours,
            attendance::STATUS_AUTO_CLOSED,
        )
        .await?;
        if did_close {
            debug!(
                org_id = %org.id,
                employee_id = %record.employee_id,
                total_hours,
                "force-closed open clock-in"
            );
            closed += 1;
        }
    }

    Ok(closed)
}

/// The hour of day (0-23+) at which the organization's open clock-ins are
/// force-closed. A cutoff past midnight means the job never fires that
/// day, matching an end-of-day window that spills over.
fn cutoff_hour(org: &Organization) -> Result<u32> {
    let end = NaiveTime::parse_from_str(&org.end_time, "%H:%M").map_err(|_| {
        AutomationError::BadEndTime {
            org_id: org.id.clone(),
            end_time: org.end_time.clone(),
        }
    })?;
    Ok(end.hour() + org.auto_logout_offset_hours.max(0) as u32)
}
