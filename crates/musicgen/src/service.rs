use std::sync::Arc;
use std::time::Instant;

use sonata_telemetry::KeyValue;
use sonata_telemetry::metrics::{generation_metrics, record_duration};

use crate::{
    artifact::{Artifact, ArtifactStore},
    error::{MusicGenError, Result},
    handle::ModelHandle,
    waveform::Waveform,
};

/// Shortest clip the service will generate, in seconds
pub const MIN_DURATION_SECS: u32 = 5;

/// Longest clip the service will generate, in seconds
pub const MAX_DURATION_SECS: u32 = 30;

/// Characters of the caller's prompt kept in the effective prompt
pub const PROMPT_MAX_CHARS: usize = 100;

/// Clamp a requested clip length into the supported range
pub fn clamp_duration(requested: i64) -> u32 {
    let clamped = requested.clamp(i64::from(MIN_DURATION_SECS), i64::from(MAX_DURATION_SECS));
    u32::try_from(clamped).unwrap_or(MIN_DURATION_SECS)
}

/// Prompt actually sent to the model
///
/// The caller's text is cut to [`PROMPT_MAX_CHARS`] characters and framed so
/// the model produces instrumental background music.
pub fn effective_prompt(raw: &str) -> String {
    let truncated: String = raw.chars().take(PROMPT_MAX_CHARS).collect();
    format!("background music: {truncated}, instrumental")
}

/// Turns a prompt and a clip length into a WAV artifact
#[derive(Clone)]
pub struct GenerationService {
    handle: Arc<ModelHandle>,
    store: Arc<ArtifactStore>,
}

impl GenerationService {
    pub const fn new(handle: Arc<ModelHandle>, store: Arc<ArtifactStore>) -> Self {
        Self { handle, store }
    }

    /// Generate one clip and store it in the scratch directory
    ///
    /// The work runs on its own task and completes even if the caller stops
    /// waiting for it.
    pub async fn handle(&self, prompt: &str, duration: i64) -> Result<Artifact> {
        let duration = clamp_duration(duration);
        let prompt = effective_prompt(prompt);

        tracing::info!(duration, prompt = %prompt, "generating music");

        let service = self.clone();
        let task = tokio::spawn(async move { service.run(&prompt, duration).await });

        task.await
            .map_err(|e| MusicGenError::InternalError(format!("generation task failed: {e}")))?
    }

    async fn run(&self, prompt: &str, duration: u32) -> Result<Artifact> {
        let metrics = generation_metrics();
        let start = Instant::now();

        let result = self.generate_and_save(prompt, duration).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.error_type(),
        };
        let attributes = [KeyValue::new("outcome", outcome)];
        metrics.generation_count.add(1, &attributes);
        record_duration(&metrics.generation_duration, start, &attributes);
        if result.is_ok() {
            metrics.audio_seconds.record(u64::from(duration), &[]);
        }

        result
    }

    async fn generate_and_save(&self, prompt: &str, duration: u32) -> Result<Artifact> {
        let waveform = self.generate(prompt, duration).await?;

        // The slot is already released; writing the file does not hold up
        // the next generation
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.save(&waveform))
            .await
            .map_err(|e| MusicGenError::InternalError(format!("artifact task failed: {e}")))?
            .map_err(MusicGenError::from)
    }

    async fn generate(&self, prompt: &str, duration: u32) -> Result<Waveform> {
        let guard = self.handle.acquire().await.map_err(MusicGenError::ModelUnavailable)?;

        match guard.generate(prompt, duration).await {
            Ok(waveform) => Ok(waveform),
            Err(e) => {
                if e.corrupts_model_state() {
                    tracing::warn!(error = %e, "generation failed, reloading model");

                    if let Err(reload_error) = guard.reload().await {
                        tracing::error!(error = %reload_error, "model reload failed, keeping previous model");
                    }
                }

                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::Ordering;

    use axum::http::StatusCode;
    use sonata_config::ArtifactConfig;

    use super::*;
    use crate::handle::tests::FakeLoader;
    use crate::model::GenerationConfig;

    fn service(loader: &FakeLoader, directory: &Path) -> GenerationService {
        let handle = ModelHandle::new(Box::new(loader.clone()), GenerationConfig::default());
        let store = ArtifactStore::new(&ArtifactConfig {
            directory: directory.to_path_buf(),
            ..ArtifactConfig::default()
        });

        GenerationService::new(Arc::new(handle), Arc::new(store))
    }

    async fn loaded_service(loader: &FakeLoader, directory: &Path) -> GenerationService {
        let service = service(loader, directory);
        service.handle.load().await.unwrap();
        service
    }

    fn wav_frames(artifact: &Artifact) -> u32 {
        let reader = hound::WavReader::open(&artifact.path).unwrap();
        assert_eq!(reader.spec().sample_rate, 32_000);
        reader.duration()
    }

    #[test]
    fn duration_is_clamped() {
        assert_eq!(clamp_duration(-10), 5);
        assert_eq!(clamp_duration(0), 5);
        assert_eq!(clamp_duration(5), 5);
        assert_eq!(clamp_duration(17), 17);
        assert_eq!(clamp_duration(30), 30);
        assert_eq!(clamp_duration(1000), 30);
        assert_eq!(clamp_duration(i64::MAX), 30);
        assert_eq!(clamp_duration(i64::MIN), 5);
    }

    #[test]
    fn prompt_is_framed() {
        assert_eq!(
            effective_prompt("calm piano with rain"),
            "background music: calm piano with rain, instrumental"
        );
        assert_eq!(effective_prompt(""), "background music: , instrumental");
    }

    #[test]
    fn long_prompt_keeps_first_hundred_characters() {
        let raw: String = ('a'..='z').cycle().take(250).collect();

        let prompt = effective_prompt(&raw);
        let inner = prompt
            .strip_prefix("background music: ")
            .and_then(|p| p.strip_suffix(", instrumental"))
            .unwrap();

        assert_eq!(inner.chars().count(), 100);
        assert_eq!(inner, &raw[..100]);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let raw = "é".repeat(150);

        let prompt = effective_prompt(&raw);

        assert_eq!(prompt, format!("background music: {}, instrumental", "é".repeat(100)));
    }

    #[tokio::test]
    async fn successful_generation_writes_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::default();
        let service = loaded_service(&loader, dir.path()).await;

        let artifact = service.handle("lofi beats", 7).await.unwrap();

        assert_eq!(wav_frames(&artifact), 7 * 32_000);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(loader.load_count(), 1);
    }

    #[tokio::test]
    async fn out_of_range_duration_is_clamped_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::default();
        let service = loaded_service(&loader, dir.path()).await;

        let short = service.handle("drums", -3).await.unwrap();
        let long = service.handle("drums", 600).await.unwrap();

        assert_eq!(wav_frames(&short), 5 * 32_000);
        assert_eq!(wav_frames(&long), 30 * 32_000);
    }

    #[tokio::test]
    async fn concurrent_requests_keep_their_own_duration() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader {
            latency: std::time::Duration::from_millis(20),
            ..FakeLoader::default()
        };
        let service = loaded_service(&loader, dir.path()).await;

        let durations = [6_i64, 11, 17, 23, 29];
        let requests = durations.iter().map(|&d| {
            let service = service.clone();
            async move { (d, service.handle("strings", d).await.unwrap()) }
        });

        for (duration, artifact) in futures::future::join_all(requests).await {
            assert_eq!(i64::from(wav_frames(&artifact)), duration * 32_000);
        }
    }

    #[tokio::test]
    async fn model_fault_reloads_once_and_reports_original_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::default();
        let service = loaded_service(&loader, dir.path()).await;

        loader.fail_next_generation.store(true, Ordering::SeqCst);
        let err = service.handle("ambient", 10).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("device-side assert triggered"));
        assert_eq!(loader.load_count(), 2);
        assert!(service.handle.status().loaded);

        // Recovered model serves the next request without another load
        service.handle("ambient", 10).await.unwrap();
        assert_eq!(loader.load_count(), 2);
    }

    #[tokio::test]
    async fn failed_reload_still_reports_original_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::default();
        let service = loaded_service(&loader, dir.path()).await;

        loader.fail_next_generation.store(true, Ordering::SeqCst);
        loader.fail_loads.store(true, Ordering::SeqCst);
        let err = service.handle("ambient", 10).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("device-side assert triggered"));
        assert_eq!(loader.load_count(), 2);
        assert!(service.handle.status().loaded);
    }

    #[tokio::test]
    async fn previous_model_serves_after_failed_reload() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::default();
        let service = loaded_service(&loader, dir.path()).await;

        loader.fail_next_generation.store(true, Ordering::SeqCst);
        loader.fail_loads.store(true, Ordering::SeqCst);
        service.handle("ambient", 10).await.unwrap_err();

        // Backend is still down, but the kept model answers without a load
        let artifact = service.handle("ambient", 10).await.unwrap();

        assert_eq!(wav_frames(&artifact), 10 * 32_000);
        assert_eq!(loader.load_count(), 2);
        assert!(service.handle.status().loaded);
    }

    #[tokio::test]
    async fn unavailable_model_is_503() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::default();
        loader.fail_loads.store(true, Ordering::SeqCst);
        let service = service(&loader, dir.path());

        let err = service.handle("ambient", 10).await.unwrap_err();

        assert!(matches!(err, MusicGenError::ModelUnavailable(_)));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn artifact_failure_does_not_reload() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeLoader::default();
        let service = loaded_service(&loader, &dir.path().join("not-created")).await;

        let err = service.handle("ambient", 10).await.unwrap_err();

        assert!(matches!(err, MusicGenError::Artifact(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(loader.load_count(), 1);
        assert!(service.handle.status().loaded);
    }
}
