use std::fmt;

use axum::extract::ws::Utf8Bytes;
use rand::Rng;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use super::messages::ServerMessage;

/// Signaling errors surfaced to clients through `error` replies
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("room is full")]
    RoomFull(RoomId),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

const CONNECTION_ID_PREFIX: &[u8] = b"conn_";
const CONNECTION_ID_LEN: usize = 21;
const HEX_CHARS: &[u8] = b"0123456789abcdef";

/// Connection ID: 21-byte fixed array ("conn_" + 16 hex)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId {
    bytes: [u8; CONNECTION_ID_LEN],
    len: u8,
}

impl ConnectionId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; CONNECTION_ID_LEN];
        bytes[..CONNECTION_ID_PREFIX.len()].copy_from_slice(CONNECTION_ID_PREFIX);

        let mut rng = rand::rng();
        let value: u64 = rng.random();

        for i in 0..16 {
            let nibble = ((value >> (60 - i * 4)) & 0xF) as usize;
            bytes[CONNECTION_ID_PREFIX.len() + i] = HEX_CHARS[nibble];
        }
        Self {
            bytes,
            len: CONNECTION_ID_LEN as u8,
        }
    }

    /// Parse a client supplied id. Anything longer than a generated id can
    /// never name a live connection and is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let src = s.as_bytes();
        if src.len() > CONNECTION_ID_LEN {
            return None;
        }
        let mut bytes = [0u8; CONNECTION_ID_LEN];
        bytes[..src.len()].copy_from_slice(src);
        Some(Self {
            bytes,
            len: src.len() as u8,
        })
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConnectionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConnectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ConnectionId::parse(&s)
            .ok_or_else(|| de::Error::invalid_length(s.len(), &"a connection id of at most 21 bytes"))
    }
}

/// Room identifier. Generated rooms use a v4 UUID, joined rooms accept any
/// non-empty string chosen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Wrapper for outbound WebSocket text frames. Cloning shares the buffer, so
/// a broadcast serializes once.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    pub fn encode(msg: &ServerMessage) -> Self {
        let json =
            serde_json::to_string(msg).expect("ServerMessage serialization should never fail");
        Self::from(json)
    }

    /// Get the inner Utf8Bytes for a `Message::Text` frame
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_generate_has_correct_format() {
        let id = ConnectionId::generate();
        assert!(id.as_str().starts_with("conn_"));
        assert_eq!(id.as_str().len(), 21);
        assert!(id.as_str()[5..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn connection_ids_differ() {
        assert_ne!(ConnectionId::generate(), ConnectionId::generate());
    }

    #[test]
    fn connection_id_parse_rejects_overlong() {
        assert!(ConnectionId::parse("conn_0123456789abcdef").is_some());
        assert!(ConnectionId::parse("conn_0123456789abcdef0").is_none());
    }

    #[test]
    fn connection_id_roundtrips_through_json() {
        let id = ConnectionId::parse("conn_00000000deadbeef").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"conn_00000000deadbeef\"");
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn connection_id_deserialize_rejects_overlong() {
        let result: Result<ConnectionId, _> =
            serde_json::from_str("\"conn_this_is_far_too_long_to_be_real\"");
        assert!(result.is_err());
    }

    #[test]
    fn room_id_generate_is_uuid() {
        let room = RoomId::generate();
        assert!(Uuid::parse_str(room.as_str()).is_ok());
        assert_ne!(room, RoomId::generate());
    }

    #[test]
    fn room_id_blank_is_empty() {
        assert!(RoomId::from("").is_empty());
        assert!(RoomId::from("   ").is_empty());
        assert!(!RoomId::from("lobby").is_empty());
    }

    #[test]
    fn room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::from("lobby")).unwrap();
        assert_eq!(json, "\"lobby\"");
    }

    #[test]
    fn room_full_message() {
        let err = SignalingError::RoomFull(RoomId::from("r1"));
        assert_eq!(err.to_string(), "room is full");
        assert_eq!(
            SignalingError::MissingField("roomId").to_string(),
            "roomId is required"
        );
    }
}
