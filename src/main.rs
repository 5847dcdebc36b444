use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rendezvous::config::Config;
use rendezvous::database;
use rendezvous::http::{self, AppState};
use rendezvous::signaling::{HubHandle, SignalingHub};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let origins = config.origins()?;
    let bind_addr = config.bind_addr();

    println!("   Rendezvous Signaling Server");
    println!("   Binding to {}", bind_addr);
    println!("   Press Ctrl+C to stop\n");

    let database = tokio::spawn(database::bootstrap(
        config.database_url.clone(),
        config.database_timeout(),
    ));

    let hub = HubHandle::spawn(SignalingHub::new());
    let listener = TcpListener::bind(bind_addr).await?;
    info!("Signaling server listening on http://{}", listener.local_addr()?);

    http::serve(listener, AppState::new(hub, origins), shutdown_signal()).await?;

    if let Ok(Some(db)) = database.await {
        db.close().await;
    }
    info!("Signaling server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
