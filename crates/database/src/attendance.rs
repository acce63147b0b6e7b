//! Attendance record operations.
//!
//! Records are scoped by `(employee_id, date)` with `date` as a plain
//! "YYYY-MM-DD" string, so "today" queries never depend on timezone-aware
//! range scans. A day is *open* while `clock_in` is set and `clock_out` is
//! still NULL; both the clock-out endpoint and the auto-logout job close
//! days through the guarded updates below, which keeps re-runs no-ops.

use chrono::DateTime;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::AttendanceRecord;

/// Status for a day the employee worked.
pub const STATUS_PRESENT: &str = "present";
/// Status for a day with no attendance at all (written by auto-absent).
pub const STATUS_ABSENT: &str = "absent";
/// Status for a day force-closed by the auto-logout job.
pub const STATUS_AUTO_CLOSED: &str = "auto_closed";

const SECS_PER_HOUR: f64 = 3600.0;

/// Elapsed hours between two RFC 3339 timestamps, clamped to >= 0.
pub fn elapsed_hours(clock_in: &str, clock_out: &str) -> Result<f64> {
    let start = DateTime::parse_from_rfc3339(clock_in).map_err(|_| DatabaseError::InvalidState {
        entity: "AttendanceRecord",
        id: clock_in.to_string(),
        reason: "unparseable clock_in timestamp",
    })?;
    let end = DateTime::parse_from_rfc3339(clock_out).map_err(|_| DatabaseError::InvalidState {
        entity: "AttendanceRecord",
        id: clock_out.to_string(),
        reason: "unparseable clock_out timestamp",
    })?;

    let hours = (end - start).num_seconds() as f64 / SECS_PER_HOUR;
    Ok(hours.max(0.0))
}

/// Clock an employee in for the given day.
///
/// Creates the day's record, or fills in `clock_in` on an existing record
/// that has none (an absent day the employee showed up for late). Fails if
/// the employee already clocked in that day.
pub async fn clock_in(
    pool: &SqlitePool,
    org_id: &str,
    employee_id: &str,
    date: &str,
    timestamp: &str,
) -> Result<AttendanceRecord> {
    match get_for_date(pool, employee_id, date).await? {
        None => {
            sqlx::query(
                r#"
                INSERT INTO attendance (org_id, employee_id, date, clock_in, status)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(org_id)
            .bind(employee_id)
            .bind(date)
            .bind(timestamp)
            .bind(STATUS_PRESENT)
            .execute(pool)
            .await?;
        }
        Some(existing) if existing.clock_in.is_none() => {
            sqlx::query(
                r#"
                UPDATE attendance
                SET clock_in = ?, status = ?
                WHERE id = ?
                "#,
            )
            .bind(timestamp)
            .bind(STATUS_PRESENT)
            .bind(existing.id)
            .execute(pool)
            .await?;
        }
        Some(existing) => {
            return Err(DatabaseError::InvalidState {
                entity: "AttendanceRecord",
                id: existing.id.to_string(),
                reason: "already clocked in",
            });
        }
    }

    get_for_date(pool, employee_id, date)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "AttendanceRecord",
            id: format!("{employee_id}/{date}"),
        })
}

/// Clock an employee out, computing `total_hours` from the stored clock-in.
pub async fn clock_out(
    pool: &SqlitePool,
    employee_id: &str,
    date: &str,
    timestamp: &str,
) -> Result<AttendanceRecord> {
    let record =
        get_for_date(pool, employee_id, date)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "AttendanceRecord",
                id: format!("{employee_id}/{date}"),
            })?;

    let clock_in = match (&record.clock_in, &record.clock_out) {
        (Some(clock_in), None) => clock_in,
        _ => {
            return Err(DatabaseError::InvalidState {
                entity: "AttendanceRecord",
                id: record.id.to_string(),
                reason: "no open clock-in",
            });
        }
    };

    let total_hours = elapsed_hours(clock_in, timestamp)?;
    close_record(pool, record.id, timestamp, total_hours, STATUS_PRESENT).await?;

    get_for_date(pool, employee_id, date)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "AttendanceRecord",
            id: record.id.to_string(),
        })
}

/// Get an employee's record for a day, if any.
pub async fn get_for_date(
    pool: &SqlitePool,
    employee_id: &str,
    date: &str,
) -> Result<Option<AttendanceRecord>> {
    let record = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, org_id, employee_id, date, clock_in, clock_out, total_hours, status, created_at
        FROM attendance
        WHERE employee_id = ? AND date = ?
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// All records in an organization for a day that are clocked in but not out.
pub async fn find_open_for_date(
    pool: &SqlitePool,
    org_id: &str,
    date: &str,
) -> Result<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, org_id, employee_id, date, clock_in, clock_out, total_hours, status, created_at
        FROM attendance
        WHERE org_id = ? AND date = ? AND clock_in IS NOT NULL AND clock_out IS NULL
        "#,
    )
    .bind(org_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Close an open record with a synthesized or real clock-out.
///
/// The `clock_out IS NULL` guard makes this safe against concurrent closes:
/// whichever write lands first wins and the other becomes a no-op. Returns
/// whether this call closed the record.
pub async fn close_record(
    pool: &SqlitePool,
    id: i64,
    clock_out: &str,
    total_hours: f64,
    status: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET clock_out = ?, total_hours = ?, status = ?
        WHERE id = ? AND clock_out IS NULL
        "#,
    )
    .bind(clock_out)
    .bind(total_hours)
    .bind(status)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Create an `absent` record for a day with no attendance.
///
/// Create-if-missing: the UNIQUE(employee_id, date) constraint turns a
/// concurrent duplicate into a no-op. Returns whether a record was created.
pub async fn create_absent(
    pool: &SqlitePool,
    org_id: &str,
    employee_id: &str,
    date: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (org_id, employee_id, date, status)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(employee_id, date) DO NOTHING
        "#,
    )
    .bind(org_id)
    .bind(employee_id)
    .bind(date)
    .bind(STATUS_ABSENT)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// List an organization's records for a day.
pub async fn list_for_org_date(
    pool: &SqlitePool,
    org_id: &str,
    date: &str,
) -> Result<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, org_id, employee_id, date, clock_in, clock_out, total_hours, status, created_at
        FROM attendance
        WHERE org_id = ? AND date = ?
        ORDER BY employee_id
        "#,
    )
    .bind(org_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
