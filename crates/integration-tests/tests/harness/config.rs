//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::path::Path;

use sonata_config::{ArtifactConfig, Config, CorsConfig, HealthConfig, ModelConfig, ServerConfig};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Minimal configuration pointed at a mock backend and a scratch directory
    pub fn new(base_url: &str, scratch: &Path) -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig::default(),
                    ..ServerConfig::default()
                },
                model: ModelConfig {
                    base_url: Some(base_url.parse().expect("valid URL")),
                    timeout: "10s".to_owned(),
                    ..ModelConfig::default()
                },
                artifacts: ArtifactConfig {
                    directory: scratch.join("temp"),
                    ..ArtifactConfig::default()
                },
                telemetry: None,
            },
        }
    }

    /// Expect a different pretrained model from the backend
    pub fn with_model_id(mut self, model_id: &str) -> Self {
        self.config.model.model_id = model_id.to_owned();
        self
    }

    /// Set the health report label
    pub fn with_label(mut self, label: &str) -> Self {
        self.config.model.label = label.to_owned();
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = config;
        self
    }

    /// Serve health at a different path
    pub fn with_health_path(mut self, path: &str) -> Self {
        self.config.server.health.path = path.to_owned();
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Remove artifacts once they have been sent
    pub fn with_delete_after_send(mut self) -> Self {
        self.config.artifacts.delete_after_send = true;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
