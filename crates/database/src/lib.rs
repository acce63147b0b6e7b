//! SQLite persistence layer for Shiftline.
//!
//! This crate provides async database operations for organizations,
//! employees, attendance records, and chat message history using SQLx with
//! SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, models::Organization, organization};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:shiftline.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let org = Organization {
//!         id: "7b6a2f90-32cf-4d47-9b5e-cf24a35f2ab1".to_string(),
//!         name: "Acme Logistics".to_string(),
//!         end_time: "18:00".to_string(),
//!         auto_logout_offset_hours: 2,
//!         automation_enabled: true,
//!         active: true,
//!         created_at: String::new(),
//!     };
//!     organization::create_organization(db.pool(), &org).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod attendance;
pub mod employee;
pub mod error;
pub mod message;
pub mod models;
pub mod organization;

pub use error::{DatabaseError, Result};
pub use models::{AttendanceRecord, Employee, Organization, StoredMessage};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Sized for concurrent REST traffic plus the automation jobs.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist, or
    /// `sqlite::memory:` for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn test_org(id: &str) -> Organization {
        Organization {
            id: id.to_string(),
            name: "Test Org".to_string(),
            end_time: "18:00".to_string(),
            auto_logout_offset_hours: 2,
            automation_enabled: true,
            active: true,
            created_at: String::new(),
        }
    }

    fn test_employee(id: &str, org_id: &str) -> Employee {
        Employee {
            id: id.to_string(),
            org_id: org_id.to_string(),
            name: "Alice".to_string(),
            active: true,
            created_at: String::new(),
        }
    }

    #[tokio::test]
    async fn test_organization_crud() {
        let db = test_db().await;

        let org = test_org("org-1");
        organization::create_organization(db.pool(), &org).await.unwrap();

        let fetched = organization::get_organization(db.pool(), "org-1").await.unwrap();
        assert_eq!(fetched.name, "Test Org");
        assert_eq!(fetched.end_time, "18:00");
        assert!(fetched.automation_enabled);

        // Duplicate id
        let result = organization::create_organization(db.pool(), &org).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));

        let active = organization::list_active(db.pool()).await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_list_automated_skips_disabled_orgs() {
        let db = test_db().await;

        organization::create_organization(db.pool(), &test_org("org-1")).await.unwrap();

        let mut disabled = test_org("org-2");
        disabled.automation_enabled = false;
        organization::create_organization(db.pool(), &disabled).await.unwrap();

        let mut inactive = test_org("org-3");
        inactive.active = false;
        organization::create_organization(db.pool(), &inactive).await.unwrap();

        let automated = organization::list_automated(db.pool()).await.unwrap();
        assert_eq!(automated.len(), 1);
        assert_eq!(automated[0].id, "org-1");
    }

    #[tokio::test]
    async fn test_employee_crud() {
        let db = test_db().await;

        organization::create_organization(db.pool(), &test_org("org-1")).await.unwrap();
        employee::create_employee(db.pool(), &test_employee("emp-1", "org-1")).await.unwrap();

        let mut inactive = test_employee("emp-2", "org-1");
        inactive.active = false;
        employee::create_employee(db.pool(), &inactive).await.unwrap();

        let fetched = employee::get_employee(db.pool(), "emp-1").await.unwrap();
        assert_eq!(fetched.name, "Alice");

        let active = employee::list_active_for_org(db.pool(), "org-1").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "emp-1");

        let missing = employee::get_employee(db.pool(), "nope").await;
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_clock_in_and_out() {
        let db = test_db().await;

        organization::create_organization(db.pool(), &test_org("org-1")).await.unwrap();
        employee::create_employee(db.pool(), &test_employee("emp-1", "org-1")).await.unwrap();

        let record = attendance::clock_in(
            db.pool(),
            "org-1",
            "emp-1",
            "2025-03-10",
            "2025-03-10T09:00:00+00:00",
        )
        .await
        .unwrap();
        assert_eq!(record.status, attendance::STATUS_PRESENT);
        assert!(record.clock_out.is_none());

        // Double clock-in is rejected
        let result = attendance::clock_in(
            db.pool(),
            "org-1",
            "emp-1",
            "2025-03-10",
            "2025-03-10T09:05:00+00:00",
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::InvalidState { .. })));

        let closed = attendance::clock_out(
            db.pool(),
            "emp-1",
            "2025-03-10",
            "2025-03-10T17:30:00+00:00",
        )
        .await
        .unwrap();
        assert_eq!(closed.clock_out.as_deref(), Some("2025-03-10T17:30:00+00:00"));
        assert!((closed.total_hours.unwrap() - 8.5).abs() < 1e-9);

        // Second clock-out finds no open record
        let result = attendance::clock_out(
            db.pool(),
            "emp-1",
            "2025-03-10",
            "2025-03-10T18:00:00+00:00",
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_clock_in_upgrades_absent_record() {
        let db = test_db().await;

        organization::create_organization(db.pool(), &test_org("org-1")).await.unwrap();
        employee::create_employee(db.pool(), &test_employee("emp-1", "org-1")).await.unwrap();

        assert!(attendance::create_absent(db.pool(), "org-1", "emp-1", "2025-03-10")
            .await
            .unwrap());

        let record = attendance::clock_in(
            db.pool(),
            "org-1",
            "emp-1",
            "2025-03-10",
            "2025-03-10T11:00:00+00:00",
        )
        .await
        .unwrap();
        assert_eq!(record.status, attendance::STATUS_PRESENT);
        assert!(record.clock_in.is_some());
    }

    #[tokio::test]
    async fn test_create_absent_is_create_if_missing() {
        let db = test_db().await;

        organization::create_organization(db.pool(), &test_org("org-1")).await.unwrap();
        employee::create_employee(db.pool(), &test_employee("emp-1", "org-1")).await.unwrap();

        assert!(attendance::create_absent(db.pool(), "org-1", "emp-1", "2025-03-10")
            .await
            .unwrap());
        // Second run is a no-op
        assert!(!attendance::create_absent(db.pool(), "org-1", "emp-1", "2025-03-10")
            .await
            .unwrap());

        let records = attendance::list_for_org_date(db.pool(), "org-1", "2025-03-10")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, attendance::STATUS_ABSENT);
    }

    #[tokio::test]
    async fn test_close_record_guard() {
        let db = test_db().await;

        organization::create_organization(db.pool(), &test_org("org-1")).await.unwrap();
        employee::create_employee(db.pool(), &test_employee("emp-1", "org-1")).await.unwrap();

        let record = attendance::clock_in(
            db.pool(),
            "org-1",
            "emp-1",
            "2025-03-10",
            "2025-03-10T09:00:00+00:00",
        )
        .await
        .unwrap();

        let closed = attendance::close_record(
            db.pool(),
            record.id,
            "2025-03-10T20:00:00+00:00",
            11.0,
            attendance::STATUS_AUTO_CLOSED,
        )
        .await
        .unwrap();
        assert!(closed);

        // Already closed: the guard turns the second close into a no-op
        let closed_again = attendance::close_record(
            db.pool(),
            record.id,
            "2025-03-10T21:00:00+00:00",
            12.0,
            attendance::STATUS_AUTO_CLOSED,
        )
        .await
        .unwrap();
        assert!(!closed_again);

        let stored = attendance::get_for_date(db.pool(), "emp-1", "2025-03-10")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.clock_out.as_deref(), Some("2025-03-10T20:00:00+00:00"));
    }

    #[tokio::test]
    async fn test_elapsed_hours_clamps_negative() {
        let hours = attendance::elapsed_hours(
            "2025-03-10T20:00:00+00:00",
            "2025-03-10T09:00:00+00:00",
        )
        .unwrap();
        assert_eq!(hours, 0.0);
    }

    #[tokio::test]
    async fn test_message_history() {
        let db = test_db().await;

        let msg = StoredMessage {
            id: "msg-1".to_string(),
            room_id: "team-1".to_string(),
            sender_id: "user-a".to_string(),
            sender_name: "Alice".to_string(),
            receiver_id: None,
            body: "hello".to_string(),
            sent_at: "2025-03-10T09:00:00+00:00".to_string(),
        };
        message::create_message(db.pool(), &msg).await.unwrap();

        let result = message::create_message(db.pool(), &msg).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));

        let listed = message::list_for_room(db.pool(), "team-1", 50).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].body, "hello");

        assert!(message::delete_message(db.pool(), "msg-1").await.unwrap());
        assert!(!message::delete_message(db.pool(), "msg-1").await.unwrap());
    }
}
