use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if a duration does not parse or model settings are
    /// out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server_config()?;
        self.validate_model_config()?;
        self.validate_artifact_config()?;
        Ok(())
    }

    fn validate_server_config(&self) -> anyhow::Result<()> {
        if self.server.request_timeout()?.is_zero() {
            anyhow::bail!("server.request_timeout must be greater than 0");
        }

        if self.server.health.enabled && !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        Ok(())
    }

    fn validate_model_config(&self) -> anyhow::Result<()> {
        let model = &self.model;

        if model.model_id.trim().is_empty() {
            anyhow::bail!("model.model_id must not be empty");
        }

        if let Some(base_url) = &model.base_url
            && !matches!(base_url.scheme(), "http" | "https")
        {
            anyhow::bail!("model.base_url must use http or https, got '{}'", base_url.scheme());
        }

        if model.timeout()?.is_zero() {
            anyhow::bail!("model.timeout must be greater than 0");
        }

        let generation = &model.generation;

        if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
            anyhow::bail!("model.generation.top_p must be in (0, 1]");
        }

        if generation.temperature <= 0.0 {
            anyhow::bail!("model.generation.temperature must be greater than 0");
        }

        if generation.duration == 0 {
            anyhow::bail!("model.generation.duration must be greater than 0");
        }

        Ok(())
    }

    fn validate_artifact_config(&self) -> anyhow::Result<()> {
        let artifacts = &self.artifacts;

        if artifacts.directory.as_os_str().is_empty() {
            anyhow::bail!("artifacts.directory must not be empty");
        }

        if artifacts.retention()?.is_some() && artifacts.sweep_interval()?.is_zero() {
            anyhow::bail!("artifacts.sweep_interval must be greater than 0 when retention is enabled");
        }

        Ok(())
    }
}
