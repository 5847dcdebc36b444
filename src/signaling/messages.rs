use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::types::{ConnectionId, RoomId};

/// Messages sent from client to server.
///
/// Required fields are optional at the wire level so that a missing field
/// reaches the hub and gets the protocol's answer (error reply or silent
/// drop) instead of a parse failure. A `to` that cannot name a connection
/// (not a string, or longer than any generated id) reads as no target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Create a new room and become its first participant
    CreateRoom,

    /// Join a room by id, creating it when absent
    JoinRoom { room_id: Option<RoomId> },

    /// Leave a room
    LeaveRoom { room_id: Option<RoomId> },

    /// Ask `to` to start an offer towards the sender
    RequestOffer {
        #[serde(default, deserialize_with = "routable")]
        to: Option<ConnectionId>,
    },

    Offer {
        #[serde(default, deserialize_with = "routable")]
        to: Option<ConnectionId>,
        sdp: Option<Value>,
    },

    Answer {
        #[serde(default, deserialize_with = "routable")]
        to: Option<ConnectionId>,
        sdp: Option<Value>,
    },

    IceCandidate {
        #[serde(default, deserialize_with = "routable")]
        to: Option<ConnectionId>,
        candidate: Option<Value>,
    },
}

impl ClientMessage {
    /// Wire name of the event, used in error replies and traces
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::CreateRoom => "create-room",
            ClientMessage::JoinRoom { .. } => "join-room",
            ClientMessage::LeaveRoom { .. } => "leave-room",
            ClientMessage::RequestOffer { .. } => "request-offer",
            ClientMessage::Offer { .. } => "offer",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::IceCandidate { .. } => "ice-candidate",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Reply to create-room
    RoomCreated {
        room_id: RoomId,
        self_id: ConnectionId,
        participants: Vec<ConnectionId>,
    },

    /// Reply to a successful join-room; `participants` excludes the caller
    RoomJoined {
        ok: bool,
        room_id: RoomId,
        self_id: ConnectionId,
        participants: Vec<ConnectionId>,
    },

    /// Reply to a rejected request
    Error { event: Option<String>, error: String },

    /// Another connection entered the room, or asked for an offer
    UserJoined { socket_id: ConnectionId },

    UserLeft { socket_id: ConnectionId },

    Offer { from: ConnectionId, sdp: Value },

    Answer { from: ConnectionId, sdp: Value },

    IceCandidate { from: ConnectionId, candidate: Value },
}

fn routable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ConnectionId>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => ConnectionId::parse(&s),
        _ => None,
    })
}

/// Opaque blobs are only checked for presence: null, empty strings and empty
/// containers count as absent.
pub(crate) fn present(blob: Option<Value>) -> Option<Value> {
    match blob {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::Object(m)) if m.is_empty() => None,
        Some(Value::Array(a)) if a.is_empty() => None,
        Some(v) => Some(v),
    }
}
