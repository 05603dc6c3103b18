//! Lifecycle of the process-wide generative model
//!
//! The model sits in a single slot behind an async mutex. Holding the slot
//! is the only way to generate, load, or reload, so at most one inference
//! runs at a time and a reload is never observed half-done. Load state is
//! mirrored into a separate snapshot for health reporting, written only
//! while the slot is held, so status reads never wait on a generation.

use std::sync::RwLock;
use std::time::Instant;

use tokio::sync::{Mutex, MutexGuard};

use sonata_telemetry::KeyValue;
use sonata_telemetry::metrics::{generation_metrics, record_duration};

use crate::{
    error::{GenerationError, ModelLoadError},
    model::{Device, GenerationConfig, ModelLoader, MusicModel},
    waveform::Waveform,
};

/// Why a load was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTrigger {
    /// Initial load at process start
    Startup,
    /// Reload after a model fault
    Recovery,
    /// Load on demand because no model was ever loaded
    OnDemand,
}

impl LoadTrigger {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Recovery => "recovery",
            Self::OnDemand => "on_demand",
        }
    }
}

/// Point-in-time view of the handle's load state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleStatus {
    pub loaded: bool,
    pub device: Option<Device>,
}

/// A model together with the defaults installed when it was loaded
pub struct LoadedModel {
    model: Box<dyn MusicModel>,
    defaults: GenerationConfig,
}

impl LoadedModel {
    pub fn device(&self) -> &Device {
        self.model.device()
    }

    /// Generation configuration for one call with the given clip length
    ///
    /// All other parameters keep the values installed at load time.
    pub fn configure(&self, duration: u32) -> GenerationConfig {
        self.defaults.with_duration(duration)
    }

    /// Run inference for a single prompt
    ///
    /// # Errors
    ///
    /// Returns the model's `GenerationError` unchanged
    pub async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Waveform, GenerationError> {
        let result = self.model.generate(prompt, config).await;
        self.model.reclaim();
        result
    }
}

/// Owner of the single shared model
pub struct ModelHandle {
    loader: Box<dyn ModelLoader>,
    defaults: GenerationConfig,
    slot: Mutex<Option<LoadedModel>>,
    status: RwLock<HandleStatus>,
}

impl ModelHandle {
    pub fn new(loader: Box<dyn ModelLoader>, defaults: GenerationConfig) -> Self {
        Self {
            loader,
            defaults,
            slot: Mutex::new(None),
            status: RwLock::new(HandleStatus::default()),
        }
    }

    /// Current load state without waiting for in-flight work
    pub fn status(&self) -> HandleStatus {
        self.status.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Identifier of the pretrained model
    pub fn model_id(&self) -> &str {
        self.loader.model_id()
    }

    /// Load the model, replacing any model currently held
    ///
    /// Waits for an in-flight generation to finish first.
    ///
    /// # Errors
    ///
    /// Returns the loader's error; any previously loaded model stays in place
    pub async fn load(&self) -> Result<(), ModelLoadError> {
        let mut slot = self.slot.lock().await;
        self.load_into(&mut slot, LoadTrigger::Startup).await
    }

    /// Take exclusive use of the model, loading it first if it is absent
    ///
    /// # Errors
    ///
    /// Returns the loader's error when the handle was unloaded and the
    /// on-demand load failed
    pub async fn acquire(&self) -> Result<ModelGuard<'_>, ModelLoadError> {
        let mut slot = self.slot.lock().await;

        if slot.is_none() {
            tracing::info!("model is not loaded, loading before generation");
            self.load_into(&mut slot, LoadTrigger::OnDemand).await?;
        }

        Ok(ModelGuard { handle: self, slot })
    }

    /// Load a replacement and swap it in only once it is ready
    ///
    /// A failed load leaves the slot and the published status as they were.
    async fn load_into(&self, slot: &mut Option<LoadedModel>, trigger: LoadTrigger) -> Result<(), ModelLoadError> {
        let model_id = self.loader.model_id();
        tracing::info!(model_id, trigger = trigger.as_str(), "loading model");

        let metrics = generation_metrics();
        let start = Instant::now();
        let result = self.loader.load().await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        let attributes = [
            KeyValue::new("trigger", trigger.as_str()),
            KeyValue::new("outcome", outcome),
        ];
        metrics.load_count.add(1, &attributes);
        record_duration(&metrics.load_duration, start, &attributes);

        match result {
            Ok(model) => {
                let device = model.device().clone();

                *slot = Some(LoadedModel {
                    model,
                    defaults: self.defaults.clone(),
                });

                self.publish(HandleStatus {
                    loaded: true,
                    device: Some(device.clone()),
                });

                tracing::info!(model_id, %device, "model loaded");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    model_id,
                    error = %e,
                    kept_previous = slot.is_some(),
                    "failed to load model"
                );
                Err(e)
            }
        }
    }

    fn publish(&self, status: HandleStatus) {
        *self.status.write().unwrap_or_else(std::sync::PoisonError::into_inner) = status;
    }
}

/// Exclusive access to the loaded model
///
/// Other generations and reloads wait until the guard is dropped.
pub struct ModelGuard<'a> {
    handle: &'a ModelHandle,
    slot: MutexGuard<'a, Option<LoadedModel>>,
}

impl ModelGuard<'_> {
    /// The loaded model
    ///
    /// Always present: the slot is filled before a guard is handed out and a
    /// failed reload keeps the model it was replacing.
    pub fn model(&self) -> Option<&LoadedModel> {
        self.slot.as_ref()
    }

    /// Configure the clip length and generate in one step
    ///
    /// # Errors
    ///
    /// Returns the model's `GenerationError`
    pub async fn generate(&self, prompt: &str, duration: u32) -> Result<Waveform, GenerationError> {
        let model = self
            .model()
            .ok_or_else(|| GenerationError::Inference("model is not loaded".to_string()))?;

        let config = model.configure(duration);
        model.generate(prompt, &config).await
    }

    /// Load a fresh model in place of the current one while still holding the slot
    ///
    /// # Errors
    ///
    /// Returns the loader's error; the current model then stays loaded
    pub async fn reload(mut self) -> Result<(), ModelLoadError> {
        self.handle.load_into(&mut self.slot, LoadTrigger::Recovery).await
    }
}
