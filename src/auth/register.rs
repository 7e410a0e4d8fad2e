use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{AppResult, AppState, store};

use super::UserResponse;

#[derive(Deserialize)]
pub(crate) struct RegisterForm {
    user_id: String,
    username: String,
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    Json(RegisterForm { user_id, username, password }): Json<RegisterForm>,
) -> AppResult<Response> {
    if store::users::get_user_by_user_id(&db_pool, &user_id)
        .await?
        .is_some()
    {
        return Ok((StatusCode::BAD_REQUEST, "user already exists").into_response());
    }

    // two registrations can race past the check above; the UNIQUE
    // constraint is the authority
    let user = match store::users::create_user(&db_pool, &user_id, &username, &password).await {
        Ok(user) => user,
        Err(err) if store::users::is_unique_violation(&err) => {
            return Ok((StatusCode::BAD_REQUEST, "user already exists").into_response());
        }
        Err(err) => return Err(err),
    };
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))).into_response())
}
