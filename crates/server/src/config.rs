//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration for the push provider.
///
/// Environment variables:
/// - `QUESTLINE_BIND`: listen address (default: "0.0.0.0:8090")
/// - `QUESTLINE_HEARTBEAT_SECS`: heartbeat cadence on push channels
///   (default: 25; must stay below the client's 35s staleness cutoff)
/// - `QUESTLINE_PUSH_TOKEN`: shared token required on `/api/ws` when set
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub heartbeat_interval: Duration,
    pub push_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8090".parse().expect("static addr"),
            heartbeat_interval: Duration::from_secs(25),
            push_token: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("QUESTLINE_BIND")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::warn!(%raw, "invalid QUESTLINE_BIND, using default");
                    None
                }
            })
            .unwrap_or(defaults.bind_addr);

        let heartbeat_interval = std::env::var("QUESTLINE_HEARTBEAT_SECS")
            .ok()
            .and_then(|raw| match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    tracing::warn!(%raw, "invalid QUESTLINE_HEARTBEAT_SECS, using default");
                    None
                }
            })
            .unwrap_or(defaults.heartbeat_interval);

        let push_token = std::env::var("QUESTLINE_PUSH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        Self {
            bind_addr,
            heartbeat_interval,
            push_token,
        }
    }
}
