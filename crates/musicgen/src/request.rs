use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Extractor for JSON request bodies
///
/// Rejects a missing or non-JSON content type with 415, an oversized body
/// with 413, and an unreadable or malformed body with 400.
pub struct ExtractPayload<T>(pub T);

/// Body limit for generation requests (1 MiB)
const BODY_LIMIT_BYTES: usize = 1 << 20;

impl<S, T: DeserializeOwned> axum::extract::FromRequest<S> for ExtractPayload<T>
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: http::Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        let is_json = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json_content_type);

        if !is_json {
            return Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported Content-Type, expected: 'Content-Type: application/json'",
            )
                .into_response());
        }

        let bytes = axum::body::to_bytes(body, BODY_LIMIT_BYTES).await.map_err(|err| {
            if std::error::Error::source(&err).is_some_and(|source| source.is::<http_body_util::LengthLimitError>()) {
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Request body is too large, limit is {BODY_LIMIT_BYTES} bytes"),
                )
            } else {
                (StatusCode::BAD_REQUEST, format!("Failed to read request body: {err}"))
            }
            .into_response()
        })?;

        serde_json::from_slice::<T>(&bytes).map(Self).map_err(|e| {
            (StatusCode::BAD_REQUEST, format!("Failed to parse request body: {e}")).into_response()
        })
    }
}

/// `application/json`, optionally followed by parameters such as a charset
fn is_json_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
