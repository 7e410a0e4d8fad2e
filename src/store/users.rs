use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult, db::User};

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(user: &User, password: &str) -> bool {
    hash_password(password, &user.salt) == user.password_hash
}

/// Whether an error is a UNIQUE constraint violation. Lets callers treat a
/// concurrent duplicate insert as a duplicate, not an internal failure.
pub fn is_unique_violation(err: &AppError) -> bool {
    err.0
        .downcast_ref::<sqlx::Error>()
        .is_some_and(|err| match err {
            sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
            _ => false,
        })
}

pub async fn create_user(
    db_pool: &SqlitePool,
    user_id: &str,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let id = Uuid::now_v7().to_string();
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);
    let password_hash = hash_password(password, &salt);

    sqlx::query("INSERT INTO users (id,user_id,username,password_hash,salt) VALUES (?,?,?,?,?)")
        .bind(&id)
        .bind(user_id)
        .bind(username)
        .bind(&password_hash)
        .bind(&salt)
        .execute(db_pool)
        .await?;

    Ok(User {
        id,
        user_id: user_id.to_owned(),
        username: username.to_owned(),
        password_hash,
        salt,
    })
}

pub async fn get_user_by_user_id(db_pool: &SqlitePool, user_id: &str) -> AppResult<Option<User>> {
    Ok(
        sqlx::query_as("SELECT id,user_id,username,password_hash,salt FROM users WHERE user_id=?")
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn get_user_by_id(db_pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
    Ok(
        sqlx::query_as("SELECT id,user_id,username,password_hash,salt FROM users WHERE id=?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?,
    )
}
