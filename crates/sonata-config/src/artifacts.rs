use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Scratch directory and lifecycle of generated audio files
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Directory that receives one WAV file per generation
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Remove each file once its bytes have been read for the response
    #[serde(default)]
    pub delete_after_send: bool,
    /// Age after which the sweeper deletes a file; "0s" disables sweeping
    #[serde(default = "default_retention")]
    pub retention: String,
    /// How often the sweeper scans the directory
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            delete_after_send: false,
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl ArtifactConfig {
    /// Retention as a `Duration`, `None` when sweeping is disabled
    ///
    /// # Errors
    ///
    /// Returns an error if `retention` is not a valid duration string
    pub fn retention(&self) -> anyhow::Result<Option<Duration>> {
        let retention = crate::parse_duration("artifacts.retention", &self.retention)?;
        Ok((!retention.is_zero()).then_some(retention))
    }

    /// Sweep interval as a `Duration`
    ///
    /// # Errors
    ///
    /// Returns an error if `sweep_interval` is not a valid duration string
    pub fn sweep_interval(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("artifacts.sweep_interval", &self.sweep_interval)
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("temp")
}

fn default_retention() -> String {
    "1h".to_string()
}

fn default_sweep_interval() -> String {
    "5m".to_string()
}
