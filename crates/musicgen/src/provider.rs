pub mod inference_api;

use sonata_config::{ModelConfig, ModelProviderType};

use crate::{error::MusicGenError, http_client::http_client, model::ModelLoader};

use self::inference_api::InferenceApiLoader;

/// Build the loader for the configured model backend
pub fn build_loader(config: &ModelConfig) -> crate::error::Result<Box<dyn ModelLoader>> {
    match config.provider_type {
        ModelProviderType::InferenceApi => {
            let timeout = config
                .timeout()
                .map_err(|e| MusicGenError::ConfigError(e.to_string()))?;

            let client = http_client(timeout)
                .map_err(|e| MusicGenError::ConfigError(format!("failed to build HTTP client: {e}")))?;

            tracing::debug!(base_url = config.base_url(), model_id = config.model_id, "using inference API backend");

            Ok(Box::new(InferenceApiLoader::new(
                client,
                config.base_url(),
                config.api_key.clone(),
                config.model_id.clone(),
            )))
        }
    }
}
