use http::{HeaderValue, Method};
use http::header::HeaderName;
use sonata_config::{AnyOrArray, CorsConfig};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build a Tower CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_origin(match &config.origins {
            AnyOrArray::Any => AllowOrigin::any(),
            AnyOrArray::List(origins) => AllowOrigin::list(parse_all::<HeaderValue>(origins, "origin")),
        })
        .allow_methods(match &config.methods {
            AnyOrArray::Any => AllowMethods::any(),
            AnyOrArray::List(methods) => AllowMethods::list(parse_all::<Method>(methods, "method")),
        })
        .allow_headers(match &config.headers {
            AnyOrArray::Any => AllowHeaders::any(),
            AnyOrArray::List(headers) => AllowHeaders::list(parse_all::<HeaderName>(headers, "header")),
        });

    let layer = if config.expose_headers.is_empty() {
        layer
    } else {
        layer.expose_headers(parse_all::<HeaderName>(&config.expose_headers, "exposed header"))
    };

    match config.max_age_duration() {
        Some(max_age) => layer.max_age(max_age),
        None => layer,
    }
}

/// Parse each value, skipping and logging the ones that do not parse
fn parse_all<T: std::str::FromStr>(values: &[String], kind: &str) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| {
            let parsed = value.parse().ok();
            if parsed.is_none() {
                tracing::warn!(kind, value, "ignoring unparseable CORS entry");
            }
            parsed
        })
        .collect()
}
