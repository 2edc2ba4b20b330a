use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::Participant;

/// A single WebSocket payload with its framing preserved.
///
/// Relayed chat messages go back out in the same mode they arrived in, so the
/// hub never converts between text and binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(bytes) => bytes.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// The `user` object carried by client events. Only `id` is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Events a client may send over its connection, keyed by the `type` field.
///
/// Relayed messages are forwarded as raw bytes, so their fields are only read
/// loosely: whatever shape `msg`, `user` and `created` take, the frame goes out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// The participant is leaving the chat.
    #[serde(rename = "exit")]
    Leave { user: EventUser },
    /// A chat message to relay to everyone.
    #[serde(rename = "send")]
    Relay {
        #[serde(default)]
        msg: Option<Value>,
        #[serde(default)]
        user: Option<Value>,
        #[serde(default)]
        created: Option<Value>,
    },
    /// Any `type` the relay does not understand.
    #[serde(other)]
    Unknown,
}

impl ClientEvent {
    /// Id of the participant the event was sent on behalf of, if it names one.
    pub fn sender_id(&self) -> Option<&str> {
        match self {
            ClientEvent::Leave { user } => Some(&user.id),
            ClientEvent::Relay { user, .. } => user
                .as_ref()
                .and_then(|user| user.get("id"))
                .and_then(Value::as_str),
            ClientEvent::Unknown => None,
        }
    }
}

/// Server-to-client reply for `POST /new-user`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RegistrationReply {
    Ok { user: Participant },
    Error { message: String },
}

/// Body accepted by `POST /new-user`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUserRequest {
    #[serde(default)]
    pub name: Option<String>,
}

pub fn decode_event(frame: &Frame) -> serde_json::Result<ClientEvent> {
    serde_json::from_slice(frame.as_bytes())
}

/// Encodes the roster as the JSON array clients expect on every join and leave.
pub fn encode_snapshot(participants: &[Participant]) -> serde_json::Result<Frame> {
    serde_json::to_string(participants).map(Frame::Text)
}
