use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::actor::HubHandle;
use super::heartbeat::{Beat, Heartbeat};
use super::messages::{ClientMessage, ServerMessage};
use super::types::{ConnectionId, OutboundMessage, SignalingError};

pub const DEFAULT_SIGNALING_PORT: u16 = 3000;

/// Drive one upgraded WebSocket until the client goes away, then run the
/// hub's disconnect cleanup for it.
pub async fn handle_socket(socket: WebSocket, addr: SocketAddr, hub: HubHandle) {
    let (ws_tx, mut ws_rx) = socket.split();

    let (tx, rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let id = match hub.connect(tx.clone()).await {
        Ok(id) => id,
        Err(e) => {
            error!("Could not register connection from {}: {}", addr, e);
            return;
        }
    };
    info!("WebSocket connection from {} as {}", addr, id);

    let writer = spawn_writer(ws_tx, rx, ctrl_rx);
    let mut heartbeat = Heartbeat::default();

    loop {
        tokio::select! {
            beat = heartbeat.due() => match beat {
                Beat::Ping => {
                    if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                        break;
                    }
                    debug!("Ping sent to {}", id);
                }
                Beat::Expired => {
                    warn!("Pong timeout, disconnecting {}", id);
                    break;
                }
            },

            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = handle_text_message(text.as_str(), &tx, &hub, id).await {
                        error!("Hub unavailable, dropping {}: {}", id, e);
                        break;
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    heartbeat.pong();
                    debug!("Pong received from {}", id);
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Close received from {}", id);
                    break;
                }
                Some(Ok(Message::Binary(_))) => debug!("Ignoring binary frame from {}", id),
                Some(Ok(Message::Ping(_))) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error from {}: {}", id, e);
                    break;
                }
                None => break,
            },
        }
    }

    hub.disconnect(id).await;
    writer.abort();
    info!("WebSocket disconnected: {} ({})", id, addr);
}

/// Forward queued frames to the socket; hub traffic and control frames
/// share one sink.
fn spawn_writer(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<OutboundMessage>,
    mut ctrl_rx: mpsc::UnboundedReceiver<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Some(msg) = rx.recv() => Message::Text(msg.into_inner()),
                Some(ctrl) = ctrl_rx.recv() => ctrl,
                else => break,
            };
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_text_message(
    text: &str,
    tx: &mpsc::UnboundedSender<OutboundMessage>,
    hub: &HubHandle,
    id: ConnectionId,
) -> Result<(), SignalingError> {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!("Malformed frame from {}: {}", id, e);
            let err = ServerMessage::Error {
                event: None,
                error: SignalingError::InvalidMessage(e.to_string()).to_string(),
            };
            let _ = tx.send(OutboundMessage::encode(&err));
            return Ok(());
        }
    };

    if let Some(reply) = hub.dispatch(id, client_msg).await? {
        let _ = tx.send(OutboundMessage::encode(&reply));
    }
    Ok(())
}
