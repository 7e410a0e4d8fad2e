mod login;
mod register;
pub mod token;

use axum::{
    Router,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::Response,
    routing::post,
};
use serde::Serialize;

use crate::{AppResult, AppState, db::User};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register::register))
        .route("/users/login", post(login::login))
        .route("/users/logout", post(login::logout))
        .route("/users/refresh-token", post(login::refresh_token))
}

#[derive(Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            user_id: user.user_id.clone(),
            username: user.username.clone(),
        }
    }
}

pub(crate) fn cookie_value<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub(crate) fn set_token_cookie(resp: &mut Response, name: &str, value: &str) -> AppResult<()> {
    resp.headers_mut().append(
        header::SET_COOKIE,
        format!("{name}={value}; HttpOnly; Path=/").parse()?,
    );
    Ok(())
}

pub(crate) fn clear_token_cookie(resp: &mut Response, name: &str) -> AppResult<()> {
    resp.headers_mut().append(
        header::SET_COOKIE,
        format!("{name}=; HttpOnly; Path=/; Max-Age=0").parse()?,
    );
    Ok(())
}

/// Extracts the authenticated user from the access-token cookie.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|cookies| cookie_value(cookies, ACCESS_COOKIE));
        let Some(token) = token else {
            return Err((StatusCode::UNAUTHORIZED, "not authenticated"));
        };

        match token::resolve_token(&state.db_pool, token).await {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => Err((StatusCode::UNAUTHORIZED, "not authenticated")),
            Err(_) => Err((StatusCode::INTERNAL_SERVER_ERROR, "auth lookup failed")),
        }
    }
}
