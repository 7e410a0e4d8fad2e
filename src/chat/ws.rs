use std::ops::ControlFlow;

use axum::{
    debug_handler,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, close_code},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitStream};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    auth::token,
    chat::{
        ConnHandle, actions,
        events::{self, Inbound, error_event},
    },
    db::User,
    store,
};

#[derive(Deserialize)]
pub(crate) struct OnlineQuery {
    token: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn online(
    State(state): State<AppState>,
    Query(OnlineQuery { token }): Query<OnlineQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |socket| {
        if let Err(err) = handle_socket(state, token, socket).await {
            warn!("connection ended with error: {}", err.0);
        }
    })
}

async fn handle_socket(
    state: AppState,
    token: Option<String>,
    mut socket: WebSocket,
) -> AppResult<()> {
    // CONNECTING: no registry or persistence work until identity resolves
    let user = match token {
        Some(token) => token::resolve_token(&state.db_pool, &token).await?,
        None => None,
    };
    let Some(user) = user else {
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "re-authenticate".into(),
            })))
            .await;
        return Ok(());
    };

    let (mut sender, receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn = ConnHandle::new(tx);

    // the writer task owns the sink; unicast and broadcast both go through
    // the channel, so sends never contend on the socket
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if sender.send(Message::Text(event.into())).await.is_err() {
                break;
            }
        }
    });

    let result = run(&state, &conn, &user, receiver).await;

    // CLOSED: every exit path funnels through this single purge
    state.registry.purge(conn.id).await;
    writer.abort();
    info!(conn_id = %conn.id, user = %user.user_id, "client disconnected");
    result
}

/// Session bootstrap plus the ACTIVE dispatch loop. Inbound events for one
/// connection are handled strictly in receipt order.
async fn run(
    state: &AppState,
    conn: &ConnHandle,
    user: &User,
    mut receiver: SplitStream<WebSocket>,
) -> AppResult<()> {
    let rooms = store::rooms::rooms_for_user(&state.db_pool, &user.id).await?;
    for room in &rooms {
        state.registry.register(Uuid::parse_str(&room.id)?, conn).await;
    }
    info!(conn_id = %conn.id, user = %user.user_id, rooms = rooms.len(), "client connected");

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match events::decode(&text) {
            Ok(Inbound::Action(action)) => {
                match actions::dispatch(state, conn, user, action).await {
                    Ok(ControlFlow::Break(())) => break,
                    Ok(ControlFlow::Continue(())) => {}
                    Err(err) => {
                        warn!(conn_id = %conn.id, "action failed: {}", err.0);
                        conn.send(error_event("internal error"));
                    }
                }
            }
            Ok(Inbound::Unknown(tag)) => {
                warn!(conn_id = %conn.id, "received unknown action type: {tag}");
            }
            Err(err) => {
                conn.send(error_event(&err));
            }
        }
    }

    Ok(())
}
