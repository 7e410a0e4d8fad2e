use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::{
    AppResult,
    db::{self, User},
    store,
};

pub const ACCESS_TTL: time::Duration = time::Duration::minutes(30);
pub const REFRESH_TTL: time::Duration = time::Duration::days(3);

// Only the hash of a token ever touches the database.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mints an opaque session token for the user and persists its hash with
/// an expiry.
pub async fn issue_token(
    db_pool: &SqlitePool,
    user_id: &str,
    ttl: time::Duration,
) -> AppResult<String> {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    sqlx::query("INSERT INTO sessions (token_hash,user_id,expires_at) VALUES (?,?,?)")
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(db::now_millis() + ttl.whole_milliseconds() as i64)
        .execute(db_pool)
        .await?;

    Ok(token)
}

/// Maps an opaque token back to its user, or `None` when the token is
/// unknown or expired. Expired rows are reaped on sight.
pub async fn resolve_token(db_pool: &SqlitePool, token: &str) -> AppResult<Option<User>> {
    let token_hash = hash_token(token);
    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT user_id,expires_at FROM sessions WHERE token_hash=?")
            .bind(&token_hash)
            .fetch_optional(db_pool)
            .await?;
    let Some((user_id, expires_at)) = row else {
        return Ok(None);
    };

    if expires_at <= db::now_millis() {
        sqlx::query("DELETE FROM sessions WHERE token_hash=?")
            .bind(&token_hash)
            .execute(db_pool)
            .await?;
        return Ok(None);
    }

    store::users::get_user_by_id(db_pool, &user_id).await
}

pub async fn revoke_token(db_pool: &SqlitePool, token: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash=?")
        .bind(hash_token(token))
        .execute(db_pool)
        .await?;
    Ok(())
}
