#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod artifact;
mod error;
mod handle;
mod health;
mod http_client;
mod model;
mod provider;
mod request;
mod server;
mod service;
mod types;
mod waveform;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

pub use artifact::{Artifact, ArtifactStore, is_artifact_name};
pub use error::{ArtifactWriteError, GenerationError, ModelLoadError, MusicGenError, Result};
pub use handle::{HandleStatus, ModelGuard, ModelHandle};
pub use health::{HealthReport, HealthReporter};
pub use model::{Device, GenerationConfig, ModelLoader, MusicModel};
pub use server::{MusicGenServerBuilder, Server};
pub use service::{
    GenerationService, MAX_DURATION_SECS, MIN_DURATION_SECS, PROMPT_MAX_CHARS, clamp_duration, effective_prompt,
};
pub use types::{GenerateMusicRequest, MusicResponse};
pub use waveform::{SAMPLE_RATE, Waveform};
use request::ExtractPayload;

/// Build the music server from configuration
pub fn build_server(config: &sonata_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = Arc::new(
        MusicGenServerBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize music server: {e}"))?,
    );
    Ok(server)
}

/// Create the endpoint router for music generation
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new().route("/generate-music", post(generate_music))
}

/// Create the health router served at `path`
pub fn health_router(path: &str) -> Router<Arc<Server>> {
    Router::new().route(path, get(health))
}

/// Handle music generation requests
async fn generate_music(
    State(server): State<Arc<Server>>,
    ExtractPayload(request): ExtractPayload<GenerateMusicRequest>,
) -> Result<MusicResponse> {
    match server.generate(request).await {
        Ok(response) => {
            tracing::debug!(file_name = response.file_name, "music generation complete");
            Ok(response)
        }
        Err(e) => {
            tracing::error!(error = %e, "music generation failed");
            Err(e)
        }
    }
}

async fn health(State(server): State<Arc<Server>>) -> Json<HealthReport> {
    Json(server.health())
}
