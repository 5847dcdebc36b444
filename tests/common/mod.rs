use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use rendezvous::config::AllowedOrigins;
use rendezvous::http::{self, AppState};
use rendezvous::signaling::{ConnectionId, HubHandle, RoomId, ServerMessage, SignalingHub};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: HubHandle,
}

impl TestServer {
    pub async fn start(origins: AllowedOrigins) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hub = HubHandle::spawn(SignalingHub::new());

        let state = AppState::new(hub.clone(), origins);
        tokio::spawn(http::serve(listener, state, std::future::pending()));

        Self { addr, hub }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn client(&self) -> TestClient {
        let (ws, _) = connect_async(self.ws_url()).await.unwrap();
        TestClient { ws }
    }

    /// Participants of `room` once the hub has drained earlier commands
    pub async fn participants(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.hub.participants(room).await.unwrap()
    }
}

pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn send(&mut self, frame: serde_json::Value) {
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn recv(&mut self) -> ServerMessage {
        tokio::time::timeout(RECV_TIMEOUT, self.next_server_message())
            .await
            .expect("timed out waiting for a server message")
    }

    /// Assert nothing arrives for a short window
    pub async fn expect_silence(&mut self) {
        if let Ok(msg) = tokio::time::timeout(SILENCE_WINDOW, self.next_server_message()).await {
            panic!("Expected no message, got {:?}", msg);
        }
    }

    pub async fn create_room(&mut self) -> (RoomId, ConnectionId) {
        self.send(serde_json::json!({"type": "create-room"})).await;
        match self.recv().await {
            ServerMessage::RoomCreated {
                room_id, self_id, ..
            } => (room_id, self_id),
            other => panic!("Expected room-created, got {:?}", other),
        }
    }

    pub async fn join_room(&mut self, room: &RoomId) -> ServerMessage {
        self.send(serde_json::json!({"type": "join-room", "roomId": room}))
            .await;
        self.recv().await
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    async fn next_server_message(&mut self) -> ServerMessage {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("WebSocket error: {}", e),
                None => panic!("WebSocket closed"),
            }
        }
    }
}
