use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::{cors::CorsConfig, health::HealthConfig};

/// Port the service binds when no listen address is configured
pub const DEFAULT_PORT: u16 = 5001;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Upper bound for a single HTTP exchange; generations are slow
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    #[serde(default)]
    pub health: HealthConfig,
    /// Cross-origin policy; wide open unless a deployment narrows it
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            request_timeout: default_request_timeout(),
            health: HealthConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Listen address, falling back to all interfaces on the default port
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))
    }

    /// Request timeout as a `Duration`
    ///
    /// # Errors
    ///
    /// Returns an error if `request_timeout` is not a valid duration string
    pub fn request_timeout(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("server.request_timeout", &self.request_timeout)
    }
}

fn default_request_timeout() -> String {
    "300s".to_string()
}
