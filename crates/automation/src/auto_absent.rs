//! Auto-absent: create `absent` records for employees with no attendance.
//!
//! Runs once a day near end-of-day. Create-if-missing all the way down:
//! the insert is a no-op for any employee who already has a record for the
//! date, so re-running the pass (restart, overlapping schedule) creates
//! nothing extra.

use tracing::{debug, error, info};

use database::models::Organization;
use database::{attendance, employee, organization, Database};

use crate::error::Result;
use crate::RunSummary;

/// Run one auto-absent pass for every automated organization.
///
/// `date` is the calendar day being closed out ("YYYY-MM-DD"). Per-tenant
/// failures are logged and skipped.
pub async fn run(db: &Database, date: &str) -> Result<RunSummary> {
    let orgs = organization::list_automated(db.pool()).await?;
    let mut summary = RunSummary {
        organizations: orgs.len(),
        ..RunSummary::default()
    };

    for org in orgs {
        match run_for_org(db, &org, date).await {
            Ok(created) => summary.records_affected += created,
            Err(e) => {
                error!(org_id = %org.id, error = %e, "auto-absent failed for organization");
                summary.failures += 1;
            }
        }
    }

    info!(
        organizations = summary.organizations,
        created = summary.records_affected,
        failures = summary.failures,
        "auto-absent pass complete"
    );
    Ok(summary)
}

async fn run_for_org(db: &Database, org: &Organization, date: &str) -> Result<usize> {
    let employees = employee::list_active_for_org(db.pool(), &org.id).await?;

    let mut created = 0;
    for emp in employees {
        if attendance::create_absent(db.pool(), &org.id, &emp.id, date).await? {
            debug!(org_id = %org.id, employee_id = %emp.id, date, "marked absent");
            created += 1;
        }
    }

    Ok(created)
}
