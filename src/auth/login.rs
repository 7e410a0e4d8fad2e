use axum::{
    Json, debug_handler,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{AppResult, AppState, store};

use super::{
    ACCESS_COOKIE, REFRESH_COOKIE, UserResponse, clear_token_cookie, cookie_value,
    set_token_cookie, token,
};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    user_id: String,
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    Json(LoginForm { user_id, password }): Json<LoginForm>,
) -> AppResult<Response> {
    let Some(user) = store::users::get_user_by_user_id(&db_pool, &user_id).await? else {
        return Ok((StatusCode::NOT_FOUND, "user not found").into_response());
    };
    if !store::users::verify_password(&user, &password) {
        return Ok((StatusCode::UNAUTHORIZED, "wrong password").into_response());
    }

    let access = token::issue_token(&db_pool, &user.id, token::ACCESS_TTL).await?;
    let refresh = token::issue_token(&db_pool, &user.id, token::REFRESH_TTL).await?;

    let mut resp = Json(UserResponse::from(&user)).into_response();
    set_token_cookie(&mut resp, ACCESS_COOKIE, &access)?;
    set_token_cookie(&mut resp, REFRESH_COOKIE, &refresh)?;
    Ok(resp)
}

#[debug_handler(state = AppState)]
pub(crate) async fn logout(
    State(db_pool): State<SqlitePool>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let cookies = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());
    if let Some(cookies) = cookies {
        for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
            if let Some(value) = cookie_value(cookies, name) {
                token::revoke_token(&db_pool, value).await?;
            }
        }
    }

    let mut resp = Redirect::to("/").into_response();
    clear_token_cookie(&mut resp, ACCESS_COOKIE)?;
    clear_token_cookie(&mut resp, REFRESH_COOKIE)?;
    Ok(resp)
}

#[debug_handler(state = AppState)]
pub(crate) async fn refresh_token(
    State(db_pool): State<SqlitePool>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let refresh = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, REFRESH_COOKIE));
    let Some(refresh) = refresh else {
        return Ok((StatusCode::UNAUTHORIZED, "no refresh token provided").into_response());
    };

    let Some(user) = token::resolve_token(&db_pool, refresh).await? else {
        return Ok((StatusCode::UNAUTHORIZED, "user not authenticated").into_response());
    };

    // rotate: the old refresh token dies with this exchange
    token::revoke_token(&db_pool, refresh).await?;
    let access = token::issue_token(&db_pool, &user.id, token::ACCESS_TTL).await?;
    let refresh = token::issue_token(&db_pool, &user.id, token::REFRESH_TTL).await?;

    let mut resp =
        Json(serde_json::json!({ "message": "Token refreshed successfully" })).into_response();
    set_token_cookie(&mut resp, ACCESS_COOKIE, &access)?;
    set_token_cookie(&mut resp, REFRESH_COOKIE, &refresh)?;
    Ok(resp)
}
