use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Inference server used when `model.base_url` is not set
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Generative model configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Backend that hosts the model
    #[serde(rename = "type", default)]
    pub provider_type: ModelProviderType,
    /// Short name reported by the health endpoint
    #[serde(default = "default_label")]
    pub label: String,
    /// Pretrained model identifier
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Base URL of the inference server, `DEFAULT_BASE_URL` when unset
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Bearer token for the inference server; empty means none
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Timeout for a single call to the inference server
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Default generation parameters installed on every load
    #[serde(default)]
    pub generation: GenerationDefaults,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider_type: ModelProviderType::default(),
            label: default_label(),
            model_id: default_model_id(),
            base_url: None,
            api_key: None,
            timeout: default_timeout(),
            generation: GenerationDefaults::default(),
        }
    }
}

impl ModelConfig {
    /// Inference server base URL, falling back to the local default
    pub fn base_url(&self) -> &str {
        self.base_url.as_ref().map_or(DEFAULT_BASE_URL, Url::as_str)
    }

    /// Backend call timeout as a `Duration`
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is not a valid duration string
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("model.timeout", &self.timeout)
    }
}

/// Supported model backends
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProviderType {
    /// HTTP text-to-audio inference server
    #[default]
    InferenceApi,
}

/// Sampling parameters applied when the model is loaded
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationDefaults {
    /// Sampled decoding when true, greedy otherwise
    #[serde(default = "default_use_sampling")]
    pub use_sampling: bool,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Clip length in seconds
    #[serde(default = "default_duration")]
    pub duration: u32,
    /// Classifier-free guidance coefficient
    #[serde(default = "default_cfg_coef")]
    pub cfg_coef: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            use_sampling: default_use_sampling(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            temperature: default_temperature(),
            duration: default_duration(),
            cfg_coef: default_cfg_coef(),
        }
    }
}

fn default_label() -> String {
    "musicgen-small".to_string()
}

fn default_model_id() -> String {
    "facebook/musicgen-small".to_string()
}

fn default_timeout() -> String {
    "300s".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_use_sampling() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_top_k() -> u32 {
    50
}

#[allow(clippy::missing_const_for_fn)]
fn default_top_p() -> f32 {
    0.7
}

#[allow(clippy::missing_const_for_fn)]
fn default_temperature() -> f32 {
    0.7
}

#[allow(clippy::missing_const_for_fn)]
fn default_duration() -> u32 {
    5
}

#[allow(clippy::missing_const_for_fn)]
fn default_cfg_coef() -> f32 {
    3.0
}
