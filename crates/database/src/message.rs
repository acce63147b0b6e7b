//! Chat message history.
//!
//! Written by the REST surface only. The realtime relay broadcasts live
//! copies of these messages but never reads or writes this table.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::StoredMessage;

/// Persist a message.
pub async fn create_message(pool: &SqlitePool, message: &StoredMessage) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO messages (id, room_id, sender_id, sender_name, receiver_id, body, sent_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.id)
    .bind(&message.room_id)
    .bind(&message.sender_id)
    .bind(&message.sender_name)
    .bind(&message.receiver_id)
    .bind(&message.body)
    .bind(&message.sent_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "StoredMessage",
                    id: message.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// List a room's messages, oldest first, capped at `limit`.
pub async fn list_for_room(
    pool: &SqlitePool,
    room_id: &str,
    limit: i64,
) -> Result<Vec<StoredMessage>> {
    let messages = sqlx::query_as::<_, StoredMessage>(
        r#"
        SELECT id, room_id, sender_id, sender_name, receiver_id, body, sent_at
        FROM messages
        WHERE room_id = ?
        ORDER BY sent_at
        LIMIT ?
        "#,
    )
    .bind(room_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// Delete a message by ID. Returns whether it existed.
pub async fn delete_message(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM messages
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
