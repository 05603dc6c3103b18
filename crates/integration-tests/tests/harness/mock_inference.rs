//! Mock text-to-audio inference backend for integration tests
//!
//! Serves `/info` and `/generate` and answers generations with silent WAV
//! audio whose length follows the requested token budget.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const TOKENS_PER_SECOND: u64 = 50;

/// Mock inference server with controllable failures
pub struct MockInference {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    model_id: String,
    sample_rate: u32,
    info_count: AtomicU32,
    generate_count: AtomicU32,
    /// Generations to fail with 500 before succeeding
    fail_generations: AtomicU32,
    /// Generations to reject with 422 before succeeding
    reject_generations: AtomicU32,
    /// Answer `/info` with 503 while set
    info_unavailable: AtomicBool,
    last_request: Mutex<Option<Value>>,
}

impl MockInference {
    /// Start a backend serving `facebook/musicgen-small` at 32 kHz
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner("facebook/musicgen-small", 32_000).await
    }

    /// Start a backend that answers with audio at another sample rate
    pub async fn start_with_sample_rate(sample_rate: u32) -> anyhow::Result<Self> {
        Self::start_inner("facebook/musicgen-small", sample_rate).await
    }

    async fn start_inner(model_id: &str, sample_rate: u32) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            model_id: model_id.to_owned(),
            sample_rate,
            info_count: AtomicU32::new(0),
            generate_count: AtomicU32::new(0),
            fail_generations: AtomicU32::new(0),
            reject_generations: AtomicU32::new(0),
            info_unavailable: AtomicBool::new(false),
            last_request: Mutex::new(None),
        });

        let app = Router::new()
            .route("/info", routing::get(handle_info))
            .route("/generate", routing::post(handle_generate))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as the model backend
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of `/info` requests received, one per model load
    pub fn info_count(&self) -> u32 {
        self.state.info_count.load(Ordering::SeqCst)
    }

    /// Number of `/generate` requests received
    pub fn generate_count(&self) -> u32 {
        self.state.generate_count.load(Ordering::SeqCst)
    }

    /// Fail the next `n` generations with a device error
    pub fn fail_next_generations(&self, n: u32) {
        self.state.fail_generations.store(n, Ordering::SeqCst);
    }

    /// Reject the next `n` generations as invalid input
    pub fn reject_next_generations(&self, n: u32) {
        self.state.reject_generations.store(n, Ordering::SeqCst);
    }

    /// Make model loads fail until reset
    pub fn set_info_unavailable(&self, unavailable: bool) {
        self.state.info_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Body of the most recent `/generate` request
    pub fn last_request(&self) -> Option<Value> {
        self.state.last_request.lock().expect("mock state lock").clone()
    }
}

impl Drop for MockInference {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Decrement the counter if it is positive, reporting whether it was
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

async fn handle_info(State(state): State<Arc<MockState>>) -> Response {
    state.info_count.fetch_add(1, Ordering::SeqCst);

    if state.info_unavailable.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "model is restarting").into_response();
    }

    Json(json!({
        "model_id": state.model_id,
        "model_device_type": "cuda",
    }))
    .into_response()
}

async fn handle_generate(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.generate_count.fetch_add(1, Ordering::SeqCst);

    let tokens = body["parameters"]["max_new_tokens"].as_u64().unwrap_or(0);
    *state.last_request.lock().expect("mock state lock") = Some(body);

    if take_one(&state.fail_generations) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "CUDA out of memory").into_response();
    }

    if take_one(&state.reject_generations) {
        return (StatusCode::UNPROCESSABLE_ENTITY, "prompt rejected").into_response();
    }

    let seconds = u32::try_from(tokens / TOKENS_PER_SECOND).expect("duration fits u32");
    let audio = silent_wav(state.sample_rate, seconds * state.sample_rate);

    ([(axum::http::header::CONTENT_TYPE, "audio/wav")], audio).into_response()
}

fn silent_wav(sample_rate: u32, frames: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buf = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut buf, spec).expect("WAV writer");
    for _ in 0..frames {
        writer.write_sample(0_i16).expect("WAV sample");
    }
    writer.finalize().expect("WAV finalize");
    buf.into_inner()
}
