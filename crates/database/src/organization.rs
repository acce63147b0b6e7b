//! Organization CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Organization;

/// Create a new organization.
pub async fn create_organization(pool: &SqlitePool, org: &Organization) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO organizations (id, name, end_time, auto_logout_offset_hours, automation_enabled, active)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&org.id)
    .bind(&org.name)
    .bind(&org.end_time)
    .bind(org.auto_logout_offset_hours)
    .bind(org.automation_enabled)
    .bind(org.active)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Organization",
                    id: org.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get an organization by ID.
pub async fn get_organization(pool: &SqlitePool, id: &str) -> Result<Organization> {
    sqlx::query_as::<_, Organization>(
        r#"
        SELECT id, name, end_time, auto_logout_offset_hours, automation_enabled, active, created_at
        FROM organizations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Organization",
        id: id.to_string(),
    })
}

/// List all active organizations.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Organization>> {
    let orgs = sqlx::query_as::<_, Organization>(
        r#"
        SELECT id, name, end_time, auto_logout_offset_hours, automation_enabled, active, created_at
        FROM organizations
        WHERE active = 1
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(orgs)
}

/// List active organizations with attendance automation enabled.
pub async fn list_automated(pool: &SqlitePool) -> Result<Vec<Organization>> {
    let orgs = sqlx::query_as::<_, Organization>(
        r#"
        SELECT id, name, end_time, auto_logout_offset_hours, automation_enabled, active, created_at
        FROM organizations
        WHERE active = 1 AND automation_enabled = 1
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(orgs)
}
