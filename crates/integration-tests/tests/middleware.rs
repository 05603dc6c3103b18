mod harness;

use harness::config::ConfigBuilder;
use harness::mock_inference::MockInference;
use harness::server::TestServer;
use sonata_config::{AnyOrArray, CorsConfig};

async fn start(cors: Option<CorsConfig>) -> (MockInference, tempfile::TempDir, TestServer) {
    let mock = MockInference::start().await.unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let mut builder = ConfigBuilder::new(&mock.base_url(), scratch.path());
    if let Some(cors) = cors {
        builder = builder.with_cors(cors);
    }
    let server = TestServer::start(builder.build()).await.unwrap();
    (mock, scratch, server)
}

// -- CORS tests --

#[tokio::test]
async fn cors_is_open_by_default() {
    let (_mock, _scratch, server) = start(None).await;

    let resp = server
        .client()
        .get(server.url("/health"))
        .header("Origin", "http://anywhere.example")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn cors_preflight_for_generation() {
    let (_mock, _scratch, server) = start(None).await;

    let resp = server
        .client()
        .request(reqwest::Method::OPTIONS, server.url("/generate-music"))
        .header("Origin", "http://game.example")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn cors_allows_configured_origin_only() {
    let cors = CorsConfig {
        origins: AnyOrArray::List(vec!["http://example.com".to_owned()]),
        ..CorsConfig::default()
    };
    let (_mock, _scratch, server) = start(Some(cors)).await;

    let allowed = server
        .client()
        .get(server.url("/health"))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.headers()["access-control-allow-origin"], "http://example.com");

    let denied = server
        .client()
        .get(server.url("/health"))
        .header("Origin", "http://evil.example")
        .send()
        .await
        .unwrap();
    assert!(denied.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn cors_can_be_disabled() {
    let cors = CorsConfig {
        enabled: false,
        ..CorsConfig::default()
    };
    let (_mock, _scratch, server) = start(Some(cors)).await;

    let resp = server
        .client()
        .get(server.url("/health"))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

// -- Request body tests --

#[tokio::test]
async fn rejects_non_json_content_type() {
    let (mock, _scratch, server) = start(None).await;

    let resp = server
        .client()
        .post(server.url("/generate-music"))
        .header("Content-Type", "text/plain")
        .body(r#"{"prompt": "rain", "duration": 5}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 415);
    assert_eq!(mock.generate_count(), 0);
}

#[tokio::test]
async fn rejects_malformed_body() {
    let (mock, _scratch, server) = start(None).await;

    let resp = server
        .client()
        .post(server.url("/generate-music"))
        .header("Content-Type", "application/json")
        .body(r#"{"prompt": "rain", "duration": "long"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(mock.generate_count(), 0);
}
