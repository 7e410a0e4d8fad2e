use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppResult, db};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: Uuid,
    pub created_at: i64,
}

/// One history row as it goes over the wire: author display name joined in,
/// `is_read` scoped to the user the page was fetched for.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageView {
    pub id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: i64,
    pub is_read: bool,
}

/// Inserts the message and the author's own read receipt in one transaction.
pub async fn create_message(
    db_pool: &SqlitePool,
    room_id: Uuid,
    author_id: &str,
    content: &str,
) -> AppResult<StoredMessage> {
    let id = Uuid::now_v7();
    let created_at = db::now_millis();

    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO messages (id,room_id,author_id,content,created_at) VALUES (?,?,?,?,?)")
        .bind(id.to_string())
        .bind(room_id.to_string())
        .bind(author_id)
        .bind(content)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT OR IGNORE INTO read_receipts (message_id,user_id,read_at) VALUES (?,?,?)")
        .bind(id.to_string())
        .bind(author_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StoredMessage { id, created_at })
}

/// Newest-first page of non-deleted messages, strictly older than `before`
/// when given. Ties on created_at fall back to insertion order.
pub async fn list_messages(
    db_pool: &SqlitePool,
    room_id: Uuid,
    user_id: &str,
    limit: i64,
    before: Option<i64>,
) -> AppResult<Vec<MessageView>> {
    let rows = match before {
        Some(before) => {
            sqlx::query_as(
                "SELECT m.id, u.username AS author_name, m.content, m.created_at,
                        EXISTS(SELECT 1 FROM read_receipts r
                               WHERE r.message_id = m.id AND r.user_id = ?) AS is_read
                 FROM messages m JOIN users u ON u.id = m.author_id
                 WHERE m.room_id = ? AND m.is_deleted = 0 AND m.created_at < ?
                 ORDER BY m.created_at DESC, m.seq DESC
                 LIMIT ?",
            )
            .bind(user_id)
            .bind(room_id.to_string())
            .bind(before)
            .bind(limit)
            .fetch_all(db_pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT m.id, u.username AS author_name, m.content, m.created_at,
                        EXISTS(SELECT 1 FROM read_receipts r
                               WHERE r.message_id = m.id AND r.user_id = ?) AS is_read
                 FROM messages m JOIN users u ON u.id = m.author_id
                 WHERE m.room_id = ? AND m.is_deleted = 0
                 ORDER BY m.created_at DESC, m.seq DESC
                 LIMIT ?",
            )
            .bind(user_id)
            .bind(room_id.to_string())
            .bind(limit)
            .fetch_all(db_pool)
            .await?
        }
    };
    Ok(rows)
}

/// Records that `user_id` has read one message. A second call for the same
/// pair is a no-op. Returns whether a receipt was created.
pub async fn mark_message_read(
    db_pool: &SqlitePool,
    user_id: &str,
    message_id: Uuid,
) -> AppResult<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO read_receipts (message_id,user_id,read_at)
         SELECT id, ?, ? FROM messages WHERE id = ? AND is_deleted = 0",
    )
    .bind(user_id)
    .bind(db::now_millis())
    .bind(message_id.to_string())
    .execute(db_pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Receipts for every message in the room authored by someone else that the
/// user has not read yet. Returns how many were created.
pub async fn bulk_mark_room_read(
    db_pool: &SqlitePool,
    user_id: &str,
    room_id: Uuid,
) -> AppResult<u64> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO read_receipts (message_id,user_id,read_at)
         SELECT m.id, ?, ? FROM messages m
         WHERE m.room_id = ? AND m.author_id <> ? AND m.is_deleted = 0",
    )
    .bind(user_id)
    .bind(db::now_millis())
    .bind(room_id.to_string())
    .bind(user_id)
    .execute(db_pool)
    .await?;
    Ok(result.rows_affected())
}

/// Flags a message as deleted. It stays in the table but drops out of
/// history and receipt queries.
pub async fn soft_delete_message(db_pool: &SqlitePool, message_id: Uuid) -> AppResult<bool> {
    let result = sqlx::query("UPDATE messages SET is_deleted = 1 WHERE id=?")
        .bind(message_id.to_string())
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
