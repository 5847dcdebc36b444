use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use clap::Parser;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::signaling::DEFAULT_SIGNALING_PORT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid allowed origin {origin:?}")]
    InvalidOrigin { origin: String },
}

/// Rendezvous signaling server
///
/// Pairs two peers in a room and relays their WebRTC handshake.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED), env = "HOST")]
    pub host: IpAddr,

    /// Port for both HTTP and WebSocket traffic
    #[arg(short, long, default_value_t = DEFAULT_SIGNALING_PORT, env = "PORT")]
    pub port: u16,

    /// Origins allowed to call the server (comma-separated, `*` or empty for any)
    #[arg(long, value_delimiter = ',', env = "ALLOWED_ORIGINS")]
    pub allowed_origins: Vec<String>,

    /// Database to connect to at startup; signaling works without it
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Seconds to wait for the startup database connection
    #[arg(long, default_value_t = 5, env = "DATABASE_TIMEOUT_SECS")]
    pub database_timeout_secs: u64,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn database_timeout(&self) -> Duration {
        Duration::from_secs(self.database_timeout_secs)
    }

    pub fn origins(&self) -> Result<AllowedOrigins, ConfigError> {
        AllowedOrigins::from_list(&self.allowed_origins)
    }
}

/// Cross-origin policy shared by the HTTP routes and the WebSocket upgrade
#[derive(Debug, Clone, PartialEq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<HeaderValue>),
}

impl AllowedOrigins {
    pub fn from_list(origins: &[String]) -> Result<Self, ConfigError> {
        let mut list = Vec::new();
        for origin in origins {
            let origin = origin.trim().trim_end_matches('/');
            if origin.is_empty() {
                continue;
            }
            if origin == "*" {
                return Ok(Self::Any);
            }
            let value = HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin {
                origin: origin.to_string(),
            })?;
            list.push(value);
        }

        if list.is_empty() {
            Ok(Self::Any)
        } else {
            Ok(Self::List(list))
        }
    }

    /// Browsers always send `Origin` on WebSocket upgrades; non-browser
    /// clients that omit it are let through.
    pub fn allows(&self, origin: Option<&HeaderValue>) -> bool {
        match (self, origin) {
            (Self::Any, _) | (_, None) => true,
            (Self::List(list), Some(origin)) => list.contains(origin),
        }
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
        match self {
            Self::Any => layer.allow_origin(Any),
            Self::List(list) => layer.allow_origin(AllowOrigin::list(list.clone())),
        }
    }
}
