use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, ServerMessage, present};
use super::registry::{ROOM_CAPACITY, RoomRegistry};
use super::types::{ConnectionId, OutboundMessage, RoomId, SignalingError};

#[derive(Debug)]
struct ConnectionState {
    /// Outbound queue drained by the connection's writer task
    tx: mpsc::UnboundedSender<OutboundMessage>,
    /// Rooms to clean up when the connection goes away
    rooms: BTreeSet<RoomId>,
}

/// Protocol state machine for every live connection.
///
/// Not thread-safe on purpose: the hub actor owns the only instance and
/// feeds it one event at a time, which is what makes joins against a nearly
/// full room race-free.
#[derive(Debug, Default)]
pub struct SignalingHub {
    registry: RoomRegistry,
    connections: HashMap<ConnectionId, ConnectionState>,
}

impl SignalingHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: RoomRegistry) -> Self {
        Self {
            registry,
            connections: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Register a new connection and hand out its id
    pub fn connect(&mut self, tx: mpsc::UnboundedSender<OutboundMessage>) -> ConnectionId {
        let mut id = ConnectionId::generate();
        while self.connections.contains_key(&id) {
            id = ConnectionId::generate();
        }
        self.connections.insert(
            id,
            ConnectionState {
                tx,
                rooms: BTreeSet::new(),
            },
        );
        info!("Connection registered: {}", id);
        id
    }

    /// Apply one inbound event. The return value is the reply owed to the
    /// sender; relay and broadcast events have none.
    pub fn handle(&mut self, from: ConnectionId, msg: ClientMessage) -> Option<ServerMessage> {
        let event = msg.event_name();
        if !self.connections.contains_key(&from) {
            warn!("Event {} from unknown connection {}", event, from);
            return reject(
                event,
                SignalingError::Internal(format!("unknown connection {}", from)),
            );
        }

        match msg {
            ClientMessage::CreateRoom => Some(self.create_room(from)),
            ClientMessage::JoinRoom { room_id } => match self.join_room(from, room_id) {
                Ok(reply) => Some(reply),
                Err(e) => reject(event, e),
            },
            ClientMessage::LeaveRoom { room_id } => {
                match room_id.filter(|room| !room.is_empty()) {
                    Some(room) => self.leave_room(from, &room),
                    None => debug!("Dropping leave-room from {}: no roomId", from),
                }
                None
            }
            ClientMessage::RequestOffer { to } => {
                match to {
                    Some(to) => self.send_to(to, &ServerMessage::UserJoined { socket_id: from }),
                    None => debug!("Dropping request-offer from {}: no target", from),
                }
                None
            }
            ClientMessage::Offer { to, sdp } => {
                self.relay(from, event, to, sdp, |from, sdp| ServerMessage::Offer { from, sdp });
                None
            }
            ClientMessage::Answer { to, sdp } => {
                self.relay(from, event, to, sdp, |from, sdp| ServerMessage::Answer { from, sdp });
                None
            }
            ClientMessage::IceCandidate { to, candidate } => {
                self.relay(from, event, to, candidate, |from, candidate| {
                    ServerMessage::IceCandidate { from, candidate }
                });
                None
            }
        }
    }

    /// Tear down a connection: announce its departure to every room it is
    /// still in, then drop its memberships.
    pub fn disconnect(&mut self, id: ConnectionId) {
        let Some(state) = self.connections.remove(&id) else {
            return;
        };
        for room in &state.rooms {
            self.broadcast(room, Some(id), &ServerMessage::UserLeft { socket_id: id });
            self.registry.leave(room, id);
            info!("Connection {} left room {} (disconnect)", id, room);
        }
        info!("Connection removed: {}", id);
    }

    fn create_room(&mut self, from: ConnectionId) -> ServerMessage {
        let room = RoomId::generate();
        self.registry.join(&room, from);
        self.track(from, &room);

        info!("Room {} created by {}", room, from);
        ServerMessage::RoomCreated {
            room_id: room,
            self_id: from,
            participants: Vec::new(),
        }
    }

    fn join_room(
        &mut self,
        from: ConnectionId,
        room: Option<RoomId>,
    ) -> Result<ServerMessage, SignalingError> {
        let room = room
            .filter(|room| !room.is_empty())
            .ok_or(SignalingError::MissingField("roomId"))?;

        // A reconnecting client may ask again for a room it is still in.
        if self.registry.contains(&room, from) {
            debug!("Connection {} re-joined room {}", from, room);
            return Ok(self.joined(&room, from));
        }

        let existing = self.registry.len(&room);
        if existing >= ROOM_CAPACITY {
            warn!("Connection {} rejected from full room {}", from, room);
            return Err(SignalingError::RoomFull(room));
        }

        self.registry.join(&room, from);
        self.track(from, &room);
        info!("Connection {} joined room {}", from, room);

        if existing > 0 {
            self.broadcast(&room, Some(from), &ServerMessage::UserJoined { socket_id: from });
        }
        Ok(self.joined(&room, from))
    }

    fn leave_room(&mut self, from: ConnectionId, room: &RoomId) {
        self.registry.leave(room, from);
        if let Some(state) = self.connections.get_mut(&from) {
            state.rooms.remove(room);
        }
        info!("Connection {} left room {}", from, room);
        self.broadcast(room, Some(from), &ServerMessage::UserLeft { socket_id: from });
    }

    fn joined(&self, room: &RoomId, from: ConnectionId) -> ServerMessage {
        let participants = self
            .registry
            .list_participants(room)
            .into_iter()
            .filter(|p| *p != from)
            .collect();
        ServerMessage::RoomJoined {
            ok: true,
            room_id: room.clone(),
            self_id: from,
            participants,
        }
    }

    fn relay(
        &self,
        from: ConnectionId,
        event: &str,
        to: Option<ConnectionId>,
        blob: Option<Value>,
        build: impl FnOnce(ConnectionId, Value) -> ServerMessage,
    ) {
        match (to, present(blob)) {
            (Some(to), Some(blob)) => self.send_to(to, &build(from, blob)),
            _ => debug!("Dropping {} from {}: missing target or payload", event, from),
        }
    }

    fn track(&mut self, id: ConnectionId, room: &RoomId) {
        if let Some(state) = self.connections.get_mut(&id) {
            state.rooms.insert(room.clone());
        }
    }

    fn send_to(&self, target: ConnectionId, msg: &ServerMessage) {
        match self.connections.get(&target) {
            Some(state) => {
                let _ = state.tx.send(OutboundMessage::encode(msg));
            }
            None => debug!("Target {} not connected, message dropped", target),
        }
    }

    fn broadcast(&self, room: &RoomId, except: Option<ConnectionId>, msg: &ServerMessage) {
        let encoded = OutboundMessage::encode(msg);
        for peer in self.registry.list_participants(room) {
            if Some(peer) == except {
                continue;
            }
            if let Some(state) = self.connections.get(&peer) {
                let _ = state.tx.send(encoded.clone());
            }
        }
    }
}

fn reject(event: &str, err: SignalingError) -> Option<ServerMessage> {
    Some(ServerMessage::Error {
        event: Some(event.to_string()),
        error: err.to_string(),
    })
}
