use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer, de};

/// Body of a music generation request
#[derive(Debug, Deserialize)]
pub struct GenerateMusicRequest {
    /// Free-text description of the music
    pub prompt: String,
    /// Requested clip length in seconds, clamped to the supported range
    #[serde(deserialize_with = "saturating_integer")]
    pub duration: i64,
}

/// Accept any JSON integer, saturating values outside the `i64` range
///
/// Integers too large for `u64` arrive as floats, so integral floats are
/// taken as well. Fractional numbers are rejected.
fn saturating_integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;

    if let Some(value) = number.as_i64() {
        return Ok(value);
    }

    if number.as_u64().is_some() {
        return Ok(i64::MAX);
    }

    match number.as_f64() {
        Some(value) if value.fract() == 0.0 => Ok(saturate(value)),
        _ => Err(de::Error::invalid_value(
            de::Unexpected::Other("fractional number"),
            &"an integer",
        )),
    }
}

// Float to integer `as` casts saturate at the target's bounds
#[allow(clippy::cast_possible_truncation)]
const fn saturate(value: f64) -> i64 {
    value as i64
}

/// A finished clip ready to be sent as a file download
#[derive(Debug)]
pub struct MusicResponse {
    pub file_name: String,
    pub audio: Vec<u8>,
}

impl IntoResponse for MusicResponse {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename={}", self.file_name);

        Response::builder()
            .header(header::CONTENT_TYPE, "audio/wav")
            .header(header::CONTENT_DISPOSITION, disposition)
            .body(Body::from(self.audio))
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to build audio response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })
    }
}
