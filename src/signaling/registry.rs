use std::collections::{BTreeSet, HashMap};

use tracing::info;

use super::types::{ConnectionId, RoomId};

/// Participants allowed in one room
pub const ROOM_CAPACITY: usize = 2;

/// Room membership bookkeeping.
///
/// A room exists exactly as long as it has at least one participant: `join`
/// creates it and the `leave` that empties it deletes it. Capacity is not
/// enforced here, see [`ROOM_CAPACITY`] and the hub's join policy.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, BTreeSet<ConnectionId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Participants of `room`, empty when the room does not exist
    pub fn list_participants(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|peers| peers.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn join(&mut self, room: &RoomId, participant: ConnectionId) {
        let peers = self.rooms.entry(room.clone()).or_insert_with(|| {
            info!("Room created: {}", room);
            BTreeSet::new()
        });
        peers.insert(participant);
    }

    pub fn leave(&mut self, room: &RoomId, participant: ConnectionId) {
        let Some(peers) = self.rooms.get_mut(room) else {
            return;
        };
        peers.remove(&participant);
        if peers.is_empty() {
            self.rooms.remove(room);
            info!("Room {} removed (empty)", room);
        }
    }

    pub fn contains(&self, room: &RoomId, participant: ConnectionId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|peers| peers.contains(&participant))
    }

    /// Number of participants in `room`
    pub fn len(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map_or(0, BTreeSet::len)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
