use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::store::messages::MessageView;

/// The closed set of actions a client may send. The `action_type` field on
/// the wire picks the variant.
#[derive(Debug, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum ClientAction {
    SendMessage {
        chatroom_id: Uuid,
        content: String,
    },
    GetMessage {
        chatroom_id: Uuid,
        limit: Option<i64>,
        before_created_at: Option<i64>,
    },
    MarkRoomRead {
        chatroom_id: Uuid,
    },
    JoinRoom {
        chatroom_id: Uuid,
    },
    LeaveRoom {
        chatroom_id: Uuid,
    },
    Disconnect,
}

const ACTION_TAGS: &[&str] = &[
    "send_message",
    "get_message",
    "mark_room_read",
    "join_room",
    "leave_room",
    "disconnect",
];

#[derive(Debug)]
pub enum Inbound {
    Action(ClientAction),
    /// A tag we do not know. Logged and ignored, never an error back to
    /// the client.
    Unknown(String),
}

/// Decodes one inbound frame. A known tag with a bad payload is an error
/// (unicast back to the sender); an unknown tag is not.
pub fn decode(text: &str) -> Result<Inbound, String> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| format!("invalid event: {err}"))?;
    let Some(tag) = value.get("action_type").and_then(Value::as_str) else {
        return Err("missing action_type".to_owned());
    };
    if !ACTION_TAGS.contains(&tag) {
        return Ok(Inbound::Unknown(tag.to_owned()));
    }
    let tag = tag.to_owned();
    serde_json::from_value(value)
        .map(Inbound::Action)
        .map_err(|err| format!("invalid {tag}: {err}"))
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    MessageList {
        chatroom_id: Uuid,
        messages: Vec<MessageView>,
    },
}

pub fn error_event(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
