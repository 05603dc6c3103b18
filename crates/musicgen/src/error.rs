use std::path::PathBuf;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MusicGenError>;

/// Failure to acquire the pretrained model or place it on a device
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// The model backend could not be reached
    #[error("failed to reach model backend: {0}")]
    Connection(String),

    /// The model backend answered with an error status
    #[error("model backend returned an error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The backend serves a different model than the one configured
    #[error("model backend serves '{actual}', expected '{expected}'")]
    ModelMismatch { expected: String, actual: String },

    /// The backend answered with something that is not a model description
    #[error("invalid model backend response: {0}")]
    InvalidResponse(String),
}

/// Failure while running inference
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The model faulted (device error, resource exhaustion, lost backend)
    #[error("inference failed: {0}")]
    Inference(String),

    /// The model rejected the prompt or parameters
    #[error("invalid generation input: {0}")]
    InvalidInput(String),

    /// The model produced audio the service cannot use
    #[error("unexpected model output: {0}")]
    UnexpectedOutput(String),
}

impl GenerationError {
    /// Whether the loaded model should be considered corrupted by this error
    ///
    /// Input errors leave the model untouched; everything else is treated
    /// as a model fault and triggers a reload.
    pub const fn corrupts_model_state(&self) -> bool {
        !matches!(self, Self::InvalidInput(_))
    }
}

/// Failure to persist a waveform to the scratch directory
#[derive(Debug, Error)]
pub enum ArtifactWriteError {
    #[error("failed to write artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode artifact {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("waveform sample rate {0} Hz does not match the artifact format")]
    SampleRate(u32),

    #[error("no unused artifact name found after {0} attempts")]
    NameExhausted(u32),
}

/// Service-level errors with appropriate HTTP status codes
#[derive(Debug, Error)]
pub enum MusicGenError {
    /// The model is not loaded and could not be loaded for this request
    #[error("model is not available: {0}")]
    ModelUnavailable(#[source] ModelLoadError),

    /// Inference failed; the message is the original description
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The generated audio could not be stored
    #[error(transparent)]
    Artifact(#[from] ArtifactWriteError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl MusicGenError {
    /// Get the appropriate HTTP status code for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Generation(_) | Self::Artifact(_) | Self::ConfigError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error type string for the response
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) => "service_unavailable",
            Self::Generation(_) => "generation_error",
            Self::Artifact(_) => "artifact_error",
            Self::ConfigError(_) | Self::InternalError(_) => "internal_error",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
}

impl IntoResponse for MusicGenError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_response = ErrorResponse {
            error: ErrorDetails {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
                code: status.as_u16(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}
