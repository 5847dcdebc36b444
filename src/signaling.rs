//! WebSocket signaling relay for two-party rooms

mod actor;
mod heartbeat;
mod hub;
mod messages;
mod registry;
mod server;
mod types;

pub use actor::HubHandle;
pub use hub::SignalingHub;
pub use messages::{ClientMessage, ServerMessage};
pub use registry::{ROOM_CAPACITY, RoomRegistry};
pub use server::{DEFAULT_SIGNALING_PORT, handle_socket};
pub use types::{ConnectionId, OutboundMessage, RoomId, SignalingError};
