use std::sync::Arc;

use sonata_config::Config;

use crate::{
    artifact::ArtifactStore,
    error::{ModelLoadError, MusicGenError},
    handle::ModelHandle,
    health::{HealthReport, HealthReporter},
    model::{GenerationConfig, ModelLoader},
    provider::build_loader,
    service::GenerationService,
    types::{GenerateMusicRequest, MusicResponse},
};

/// Music generation server owning the model, the scratch directory and
/// the health reporter
pub struct Server {
    handle: Arc<ModelHandle>,
    store: Arc<ArtifactStore>,
    service: GenerationService,
    health: HealthReporter,
}

impl Server {
    /// Generate a clip and read it back for delivery
    pub async fn generate(&self, request: GenerateMusicRequest) -> crate::error::Result<MusicResponse> {
        let GenerateMusicRequest { prompt, duration } = request;
        let artifact = self.service.handle(&prompt, duration).await?;

        let audio = self.store.read(&artifact).await.map_err(|e| {
            MusicGenError::InternalError(format!("failed to read artifact {}: {e}", artifact.file_name))
        })?;

        Ok(MusicResponse {
            file_name: artifact.file_name,
            audio,
        })
    }

    pub fn health(&self) -> HealthReport {
        self.health.status()
    }

    /// Load the model, waiting for any in-flight generation first
    pub async fn load_model(&self) -> Result<(), ModelLoadError> {
        self.handle.load().await
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }
}

/// Builder for constructing the music server from configuration
pub struct MusicGenServerBuilder<'a> {
    config: &'a Config,
    loader: Option<Box<dyn ModelLoader>>,
}

impl<'a> MusicGenServerBuilder<'a> {
    pub const fn new(config: &'a Config) -> Self {
        Self { config, loader: None }
    }

    /// Use this loader instead of the configured backend
    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn ModelLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> crate::error::Result<Server> {
        let loader = match self.loader {
            Some(loader) => loader,
            None => build_loader(&self.config.model)?,
        };

        let defaults = GenerationConfig::from(&self.config.model.generation);
        tracing::debug!(model_id = loader.model_id(), ?defaults, "initializing music server");

        let handle = Arc::new(ModelHandle::new(loader, defaults));
        let store = Arc::new(ArtifactStore::new(&self.config.artifacts));

        Ok(Server {
            service: GenerationService::new(Arc::clone(&handle), Arc::clone(&store)),
            health: HealthReporter::new(Arc::clone(&handle), self.config.model.label.clone()),
            handle,
            store,
        })
    }
}
