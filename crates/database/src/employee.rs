//! Employee CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Employee;

/// Create a new employee.
pub async fn create_employee(pool: &SqlitePool, employee: &Employee) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO employees (id, org_id, name, active)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&employee.id)
    .bind(&employee.org_id)
    .bind(&employee.name)
    .bind(employee.active)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Employee",
                    id: employee.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get an employee by ID.
pub async fn get_employee(pool: &SqlitePool, id: &str) -> Result<Employee> {
    sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, org_id, name, active, created_at
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Employee",
        id: id.to_string(),
    })
}

/// List active employees of an organization.
pub async fn list_active_for_org(pool: &SqlitePool, org_id: &str) -> Result<Vec<Employee>> {
    let employees = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, org_id, name, active, created_at
        FROM employees
        WHERE org_id = ? AND active = 1
        ORDER BY created_at
        "#,
    )
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    Ok(employees)
}
