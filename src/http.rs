use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::warn;

use crate::config::AllowedOrigins;
use crate::signaling::{HubHandle, handle_socket};

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub origins: Arc<AllowedOrigins>,
}

impl AppState {
    pub fn new(hub: HubHandle, origins: AllowedOrigins) -> Self {
        Self {
            hub,
            origins: Arc::new(origins),
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(state.origins.cors_layer())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

async fn root() -> &'static str {
    "Server is started"
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let origin = headers.get(header::ORIGIN);
    if !state.origins.allows(origin) {
        warn!("Rejected WebSocket upgrade from {} (origin {:?})", addr, origin);
        return StatusCode::FORBIDDEN.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, addr, state.hub))
}
