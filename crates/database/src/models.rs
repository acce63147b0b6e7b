//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tenant organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    /// Organization UUID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Workday end as "HH:MM" local time (e.g., "18:00").
    pub end_time: String,
    /// Hours past `end_time` before open clock-ins are force-closed.
    pub auto_logout_offset_hours: i64,
    /// Whether the attendance automation jobs touch this organization.
    pub automation_enabled: bool,
    /// Inactive organizations are skipped everywhere.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: String,
}

/// An employee belonging to an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Employee {
    /// Employee UUID.
    pub id: String,
    /// Owning organization.
    pub org_id: String,
    /// Display name.
    pub name: String,
    /// Inactive employees are excluded from automation.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: String,
}

/// One employee's attendance for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning organization.
    pub org_id: String,
    /// Employee the record belongs to.
    pub employee_id: String,
    /// Calendar day, "YYYY-MM-DD".
    pub date: String,
    /// Clock-in timestamp (RFC 3339), if the employee clocked in.
    pub clock_in: Option<String>,
    /// Clock-out timestamp (RFC 3339); NULL while the day is still open.
    pub clock_out: Option<String>,
    /// Elapsed hours between clock-in and clock-out.
    pub total_hours: Option<f64>,
    /// One of `present`, `absent`, `auto_closed`.
    pub status: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// A persisted chat message.
///
/// Durable history is written through the REST surface; the realtime relay
/// never touches this table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoredMessage {
    /// Client-assigned message UUID (also used for client-side dedup).
    pub id: String,
    /// Room the message was sent to.
    pub room_id: String,
    /// Sender user ID.
    pub sender_id: String,
    /// Sender display name at send time.
    pub sender_name: String,
    /// Direct-message recipient, if any.
    pub receiver_id: Option<String>,
    /// Message body.
    pub body: String,
    /// Send timestamp.
    pub sent_at: String,
}
