use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::hub::SignalingHub;
use super::messages::{ClientMessage, ServerMessage};
use super::types::{ConnectionId, OutboundMessage, RoomId, SignalingError};

const COMMAND_BUFFER: usize = 1024;

/// Commands sent to the hub actor
pub(crate) enum HubCommand {
    Connect {
        tx: mpsc::UnboundedSender<OutboundMessage>,
        reply: oneshot::Sender<ConnectionId>,
    },
    Event {
        from: ConnectionId,
        msg: ClientMessage,
        reply: oneshot::Sender<Option<ServerMessage>>,
    },
    Disconnect {
        id: ConnectionId,
    },
    Participants {
        room: RoomId,
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },
}

/// Owns the hub and applies commands strictly one after another
pub(crate) async fn hub_actor(mut rx: mpsc::Receiver<HubCommand>, mut hub: SignalingHub) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            HubCommand::Connect { tx, reply } => {
                let id = hub.connect(tx);
                let _ = reply.send(id);
            }

            HubCommand::Event { from, msg, reply } => {
                debug!("Event {} from {}", msg.event_name(), from);
                let _ = reply.send(hub.handle(from, msg));
            }

            HubCommand::Disconnect { id } => hub.disconnect(id),

            HubCommand::Participants { room, reply } => {
                let _ = reply.send(hub.registry().list_participants(&room));
            }
        }
    }
    info!("Hub actor stopped");
}

/// Handle to communicate with the hub actor
#[derive(Clone)]
pub struct HubHandle {
    pub(crate) tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Spawn the actor on the current runtime
    pub fn spawn(hub: SignalingHub) -> Self {
        let (tx, rx) = mpsc::channel::<HubCommand>(COMMAND_BUFFER);
        tokio::spawn(hub_actor(rx, hub));
        Self { tx }
    }

    /// Register a connection whose outbound frames go to `tx`
    pub async fn connect(
        &self,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<ConnectionId, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(HubCommand::Connect {
                tx,
                reply: reply_tx,
            })
            .await;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    /// Apply one client event and wait for the reply owed to the sender
    pub async fn dispatch(
        &self,
        from: ConnectionId,
        msg: ClientMessage,
    ) -> Result<Option<ServerMessage>, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(HubCommand::Event {
                from,
                msg,
                reply: reply_tx,
            })
            .await;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    pub async fn disconnect(&self, id: ConnectionId) {
        let _ = self.tx.send(HubCommand::Disconnect { id }).await;
    }

    /// Current participants of `room`
    pub async fn participants(&self, room: &RoomId) -> Result<Vec<ConnectionId>, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(HubCommand::Participants {
                room: room.clone(),
                reply: reply_tx,
            })
            .await;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }
}
