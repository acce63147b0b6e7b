//! Automation error types.

use thiserror::Error;

/// Errors that can occur while running an automation pass.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Storage error.
    #[error("database error: {0}")]
    Database(#[from] database::DatabaseError),

    /// An organization's configured end time could not be parsed.
    #[error("organization {org_id} has an invalid end_time: {end_time}")]
    BadEndTime { org_id: String, end_time: String },
}

/// Result type for automation operations.
pub type Result<T> = std::result::Result<T, AutomationError>;
