use axum::{
    Json, Router, debug_handler,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{AppResult, AppState, auth::AuthUser, db::Room, store};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get_rooms", get(get_rooms))
        .route("/create_room", post(create_room))
}

#[derive(Serialize)]
pub(crate) struct RoomResponse {
    id: String,
    name: Option<String>,
    created_at: i64,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self {
            id: room.id,
            name: room.name,
            created_at: room.created_at,
        }
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_rooms(
    AuthUser(user): AuthUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<RoomResponse>>> {
    let rooms = store::rooms::rooms_for_user(&db_pool, &user.id).await?;
    Ok(Json(rooms.into_iter().map(RoomResponse::from).collect()))
}

#[derive(Deserialize)]
pub(crate) struct CreateRoomForm {
    room_name: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_room(
    AuthUser(user): AuthUser,
    State(db_pool): State<SqlitePool>,
    Json(CreateRoomForm { room_name }): Json<CreateRoomForm>,
) -> AppResult<Json<RoomResponse>> {
    let room = store::rooms::create_room(&db_pool, room_name.as_deref(), &user.id).await?;
    Ok(Json(RoomResponse::from(room)))
}
