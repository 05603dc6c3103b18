use std::fmt;

use async_trait::async_trait;
use sonata_config::GenerationDefaults;

use crate::{
    error::{GenerationError, ModelLoadError},
    waveform::Waveform,
};

/// Compute device a model was placed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    /// General-purpose processor
    Cpu,
    /// Accelerator named by its runtime (e.g. "cuda", "mps")
    Accelerator(String),
}

impl Device {
    /// Interpret a runtime's device type string
    pub fn from_device_type(device_type: &str) -> Self {
        let device_type = device_type.trim().to_ascii_lowercase();
        if device_type.is_empty() || device_type == "cpu" {
            Self::Cpu
        } else {
            Self::Accelerator(device_type)
        }
    }

    pub const fn is_accelerator(&self) -> bool {
        matches!(self, Self::Accelerator(_))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Accelerator(name) => f.write_str(name),
        }
    }
}

/// Decoding parameters for one generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Sampled decoding when true, greedy otherwise
    pub use_sampling: bool,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    /// Clip length in seconds
    pub duration: u32,
    /// Classifier-free guidance coefficient
    pub cfg_coef: f32,
}

impl GenerationConfig {
    /// Copy of this configuration with a different clip length
    #[must_use]
    pub fn with_duration(&self, duration: u32) -> Self {
        Self {
            duration,
            ..self.clone()
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::from(&GenerationDefaults::default())
    }
}

impl From<&GenerationDefaults> for GenerationConfig {
    fn from(defaults: &GenerationDefaults) -> Self {
        Self {
            use_sampling: defaults.use_sampling,
            top_k: defaults.top_k,
            top_p: defaults.top_p,
            temperature: defaults.temperature,
            duration: defaults.duration,
            cfg_coef: defaults.cfg_coef,
        }
    }
}

/// A loaded text-to-audio model
#[async_trait]
pub trait MusicModel: Send + Sync {
    /// Device the model runs on
    fn device(&self) -> &Device;

    /// Generate one waveform for one prompt
    ///
    /// The returned waveform lives in host memory.
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Waveform, GenerationError>;

    /// Release cached device memory after a generation
    ///
    /// Called once per generation whether it succeeded or not. Backends
    /// that hold no device memory in this process, such as a remote
    /// inference server, keep the default no-op.
    fn reclaim(&self) {}
}

/// Acquires a pretrained model and places it on a device
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Identifier of the pretrained model this loader fetches
    fn model_id(&self) -> &str;

    /// Fetch the model and place it on the best available device
    async fn load(&self) -> Result<Box<dyn MusicModel>, ModelLoadError>;
}
