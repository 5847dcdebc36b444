//! Startup database connection.
//!
//! The signaling path never touches the database. At boot the server opens a
//! pool against the configured URL, runs a round-trip query and logs the
//! outcome; failure does not stop the server.

use std::time::Duration;

use sqlx::AnyPool;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("database at {target} did not answer within {timeout:?}")]
    Timeout { target: String, timeout: Duration },
}

/// Pool kept open for the life of the process
#[derive(Debug)]
pub struct Database {
    pool: AnyPool,
    target: String,
}

impl Database {
    /// Connect and verify the server answers a query
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, DatabaseError> {
        install_default_drivers();
        let target = redact(url);

        let connect = async {
            let pool = AnyPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(timeout)
                .connect(url)
                .await?;
            sqlx::query("SELECT 1").execute(&pool).await?;
            Ok::<_, DatabaseError>(pool)
        };

        let pool = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| DatabaseError::Timeout {
                target: target.clone(),
                timeout,
            })??;

        Ok(Self { pool, target })
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Connection URL with the password masked
    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Database connection closed: {}", self.target);
    }
}

/// Mask credentials before a URL reaches the logs
fn redact(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable database url>".to_string(),
    }
}

/// Run the startup connection and log its outcome
pub async fn bootstrap(url: Option<String>, timeout: Duration) -> Option<Database> {
    let Some(url) = url else {
        warn!("No database configured, skipping connection");
        return None;
    };

    match Database::connect(&url, timeout).await {
        Ok(db) => {
            info!("Database connected: {}", db.target());
            Some(db)
        }
        Err(e) => {
            error!("Database connection failed for {}: {}", redact(&url), e);
            None
        }
    }
}
