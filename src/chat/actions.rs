use std::ops::ControlFlow;

use uuid::Uuid;

use crate::{
    AppResult, AppState,
    chat::{
        ConnHandle,
        events::{ClientAction, ServerEvent, error_event},
    },
    db::User,
    store::{self, messages::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MessageView}},
};

/// Routes one decoded action to its handler. `Break` means the client asked
/// to disconnect and the loop should wind down.
pub async fn dispatch(
    state: &AppState,
    conn: &ConnHandle,
    user: &User,
    action: ClientAction,
) -> AppResult<ControlFlow<()>> {
    match action {
        ClientAction::SendMessage { chatroom_id, content } => {
            send_message(state, conn, user, chatroom_id, content).await?
        }
        ClientAction::GetMessage { chatroom_id, limit, before_created_at } => {
            get_message(state, conn, user, chatroom_id, limit, before_created_at).await?
        }
        ClientAction::MarkRoomRead { chatroom_id } => {
            mark_room_read(state, user, chatroom_id).await?
        }
        ClientAction::JoinRoom { chatroom_id } => {
            join_room(state, conn, user, chatroom_id).await?
        }
        ClientAction::LeaveRoom { chatroom_id } => {
            leave_room(state, conn, user, chatroom_id).await?
        }
        ClientAction::Disconnect => return Ok(ControlFlow::Break(())),
    }
    Ok(ControlFlow::Continue(()))
}

/// Persists the message plus the author's receipt, then fans a one-message
/// `message_list` out to everyone registered to the room. Recipients have
/// not read it yet, so the event carries `is_read: false`; history is the
/// source of truth for read state.
pub async fn send_message(
    state: &AppState,
    conn: &ConnHandle,
    user: &User,
    room_id: Uuid,
    content: String,
) -> AppResult<()> {
    if store::rooms::get_room(&state.db_pool, room_id).await?.is_none() {
        conn.send(error_event("room not exists"));
        return Ok(());
    }

    let stored = store::messages::create_message(&state.db_pool, room_id, &user.id, &content).await?;
    let event = serde_json::to_string(&ServerEvent::MessageList {
        chatroom_id: room_id,
        messages: vec![MessageView {
            id: stored.id.to_string(),
            author_name: user.username.clone(),
            content,
            created_at: stored.created_at,
            is_read: false,
        }],
    })?;
    state.registry.broadcast(room_id, &event).await;
    Ok(())
}

/// Unicasts a page of history to the requester, newest first, strictly
/// older than the cursor when one is given.
pub async fn get_message(
    state: &AppState,
    conn: &ConnHandle,
    user: &User,
    room_id: Uuid,
    limit: Option<i64>,
    before_created_at: Option<i64>,
) -> AppResult<()> {
    if store::rooms::get_room(&state.db_pool, room_id).await?.is_none() {
        conn.send(error_event("room not exists"));
        return Ok(());
    }

    let limit = limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    let messages =
        store::messages::list_messages(&state.db_pool, room_id, &user.id, limit, before_created_at)
            .await?;
    let event = serde_json::to_string(&ServerEvent::MessageList {
        chatroom_id: room_id,
        messages,
    })?;
    conn.send(event);
    Ok(())
}

/// Receipts everything in the room the user has not read. An absent room
/// is a silent no-op.
pub async fn mark_room_read(state: &AppState, user: &User, room_id: Uuid) -> AppResult<()> {
    if store::rooms::get_room(&state.db_pool, room_id).await?.is_none() {
        return Ok(());
    }
    store::messages::bulk_mark_room_read(&state.db_pool, &user.id, room_id).await?;
    Ok(())
}

/// Adds the membership row if missing and subscribes the connection. Both
/// halves are idempotent. No event is emitted on this path.
pub async fn join_room(
    state: &AppState,
    conn: &ConnHandle,
    user: &User,
    room_id: Uuid,
) -> AppResult<()> {
    if store::rooms::get_room(&state.db_pool, room_id).await?.is_none() {
        conn.send(error_event("room not exists"));
        return Ok(());
    }
    store::rooms::add_member(&state.db_pool, room_id, &user.id).await?;
    state.registry.register(room_id, conn).await;
    Ok(())
}

/// Unsubscribes the connection and drops the membership row. An absent
/// room counts as already left.
pub async fn leave_room(
    state: &AppState,
    conn: &ConnHandle,
    user: &User,
    room_id: Uuid,
) -> AppResult<()> {
    state.registry.unregister(room_id, conn.id).await;
    if store::rooms::get_room(&state.db_pool, room_id).await?.is_some() {
        store::rooms::remove_member(&state.db_pool, room_id, &user.id).await?;
    }
    Ok(())
}
