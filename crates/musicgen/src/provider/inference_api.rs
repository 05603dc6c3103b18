//! Backend that drives a text-to-audio inference server over HTTP
//!
//! `GET {base}/info` describes the served model and the device it sits on.
//! `POST {base}/generate` runs one prompt and answers with a WAV body.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    error::{GenerationError, ModelLoadError},
    model::{Device, GenerationConfig, ModelLoader, MusicModel},
    waveform::{SAMPLE_RATE, Waveform},
};

/// Audio codec frames generated per second of output
const TOKENS_PER_SECOND: u32 = 50;

#[derive(Debug, Deserialize)]
struct InfoResponse {
    model_id: String,
    #[serde(default)]
    model_device_type: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    do_sample: bool,
    top_k: u32,
    top_p: f32,
    temperature: f32,
    guidance_scale: f32,
    max_new_tokens: u32,
}

impl From<&GenerationConfig> for GenerateParameters {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            do_sample: config.use_sampling,
            top_k: config.top_k,
            top_p: config.top_p,
            temperature: config.temperature,
            guidance_scale: config.cfg_coef,
            max_new_tokens: config.duration.saturating_mul(TOKENS_PER_SECOND),
        }
    }
}

#[derive(Clone)]
struct Endpoint {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) if !key.expose_secret().is_empty() => request.bearer_auth(key.expose_secret()),
            _ => request,
        }
    }
}

/// Loads the model by checking what the inference server serves
pub(crate) struct InferenceApiLoader {
    endpoint: Endpoint,
    model_id: String,
}

impl InferenceApiLoader {
    pub fn new(client: Client, base_url: &str, api_key: Option<SecretString>, model_id: String) -> Self {
        Self {
            endpoint: Endpoint {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
            },
            model_id,
        }
    }
}

#[async_trait]
impl ModelLoader for InferenceApiLoader {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn load(&self) -> Result<Box<dyn MusicModel>, ModelLoadError> {
        let url = self.endpoint.url("info");

        let response = self
            .endpoint
            .authorize(self.endpoint.client.get(&url))
            .send()
            .await
            .map_err(|e| ModelLoadError::Connection(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ModelLoadError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let info: InfoResponse = response
            .json()
            .await
            .map_err(|e| ModelLoadError::InvalidResponse(e.to_string()))?;

        if info.model_id != self.model_id {
            return Err(ModelLoadError::ModelMismatch {
                expected: self.model_id.clone(),
                actual: info.model_id,
            });
        }

        let device = Device::from_device_type(&info.model_device_type);
        if !device.is_accelerator() {
            tracing::warn!("model is running on CPU, generation will be slow");
        }

        Ok(Box::new(InferenceApiModel {
            endpoint: self.endpoint.clone(),
            device,
        }))
    }
}

/// Model hosted by the inference server
struct InferenceApiModel {
    endpoint: Endpoint,
    device: Device,
}

#[async_trait]
impl MusicModel for InferenceApiModel {
    fn device(&self) -> &Device {
        &self.device
    }

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Waveform, GenerationError> {
        let body = GenerateRequest {
            inputs: prompt,
            parameters: GenerateParameters::from(config),
        };

        tracing::debug!(
            max_new_tokens = body.parameters.max_new_tokens,
            prompt_len = prompt.len(),
            "sending generation request"
        );

        let response = self
            .endpoint
            .authorize(self.endpoint.client.post(self.endpoint.url("generate")))
            .header(http::header::ACCEPT, "audio/wav")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Inference(format!("failed to reach inference backend: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_failure(status, message));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| GenerationError::Inference(format!("failed to read generated audio: {e}")))?;

        let waveform = Waveform::from_wav_bytes(&audio)?;
        if waveform.sample_rate() != SAMPLE_RATE {
            return Err(GenerationError::UnexpectedOutput(format!(
                "expected audio at {SAMPLE_RATE} Hz, got {} Hz",
                waveform.sample_rate()
            )));
        }

        tracing::debug!(frames = waveform.frames(), "generation complete");

        Ok(waveform)
    }
}

/// Client errors blame the request; everything else blames the model
fn classify_failure(status: StatusCode, message: String) -> GenerationError {
    let retryable = matches!(status, StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS);

    if status.is_client_error() && !retryable {
        GenerationError::InvalidInput(message)
    } else {
        GenerationError::Inference(format!("inference backend returned {status}: {message}"))
    }
}
