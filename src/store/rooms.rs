use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult,
    db::{self, Room},
};

pub async fn create_room(
    db_pool: &SqlitePool,
    name: Option<&str>,
    creator_id: &str,
) -> AppResult<Room> {
    let id = Uuid::now_v7().to_string();
    let created_at = db::now_millis();

    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO rooms (id,name,created_at) VALUES (?,?,?)")
        .bind(&id)
        .bind(name)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO memberships (room_id,user_id,joined_at) VALUES (?,?,?)")
        .bind(&id)
        .bind(creator_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Room {
        id,
        name: name.map(str::to_owned),
        created_at,
    })
}

pub async fn get_room(db_pool: &SqlitePool, room_id: Uuid) -> AppResult<Option<Room>> {
    Ok(
        sqlx::query_as("SELECT id,name,created_at FROM rooms WHERE id=?")
            .bind(room_id.to_string())
            .fetch_optional(db_pool)
            .await?,
    )
}

/// Adds a membership row if absent. Returns whether a row was created.
pub async fn add_member(db_pool: &SqlitePool, room_id: Uuid, user_id: &str) -> AppResult<bool> {
    let result =
        sqlx::query("INSERT OR IGNORE INTO memberships (room_id,user_id,joined_at) VALUES (?,?,?)")
            .bind(room_id.to_string())
            .bind(user_id)
            .bind(db::now_millis())
            .execute(db_pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes a membership row. The transaction that deletes the last member
/// also deletes the room and everything it owns. Returns whether the room
/// was deleted.
pub async fn remove_member(db_pool: &SqlitePool, room_id: Uuid, user_id: &str) -> AppResult<bool> {
    let room_id = room_id.to_string();

    let mut tx = db_pool.begin().await?;
    sqlx::query("DELETE FROM memberships WHERE room_id=? AND user_id=?")
        .bind(&room_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE room_id=?")
        .bind(&room_id)
        .fetch_one(&mut *tx)
        .await?;

    let room_deleted = remaining == 0;
    if room_deleted {
        sqlx::query(
            "DELETE FROM read_receipts WHERE message_id IN (SELECT id FROM messages WHERE room_id=?)",
        )
        .bind(&room_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM messages WHERE room_id=?")
            .bind(&room_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM rooms WHERE id=?")
            .bind(&room_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(room_deleted)
}

pub async fn is_member(db_pool: &SqlitePool, room_id: Uuid, user_id: &str) -> AppResult<bool> {
    Ok(
        sqlx::query_as::<_, (i64,)>("SELECT 1 FROM memberships WHERE room_id=? AND user_id=?")
            .bind(room_id.to_string())
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?
            .is_some(),
    )
}

pub async fn rooms_for_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Room>> {
    Ok(sqlx::query_as(
        "SELECT r.id,r.name,r.created_at FROM rooms r
         JOIN memberships m ON m.room_id = r.id
         WHERE m.user_id=?
         ORDER BY m.joined_at",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?)
}
