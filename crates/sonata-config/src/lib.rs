#![allow(clippy::must_use_candidate)]

pub mod artifacts;
pub mod cors;
mod env;
pub mod health;
mod loader;
pub mod model;
pub mod server;
pub mod telemetry;

use std::time::Duration;

use serde::Deserialize;

pub use artifacts::*;
pub use cors::*;
pub use health::*;
pub use model::*;
pub use server::*;
pub use telemetry::TelemetryConfig;

/// Top-level Sonata configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Generative model configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Scratch directory and artifact lifecycle
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

/// Parse a human-readable duration such as `"300s"` or `"5m"`
///
/// # Errors
///
/// Returns an error naming the offending field when the value does not parse
pub fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))
}
