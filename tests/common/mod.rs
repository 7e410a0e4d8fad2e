#![allow(dead_code)]

use murmur::{AppState, db, db::User, store};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

// One connection per pool: every connection to sqlite::memory: is its own
// database, so the pool must not open a second one.
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init(&pool).await.unwrap();
    pool
}

pub async fn setup_state() -> AppState {
    AppState::new(setup_pool().await)
}

pub async fn make_user(pool: &SqlitePool, tag: &str) -> User {
    store::users::create_user(pool, tag, &format!("{tag}-name"), "hunter2")
        .await
        .unwrap()
}
