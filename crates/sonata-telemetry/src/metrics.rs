//! Metric names and instruments for the generation path

use std::sync::OnceLock;
use std::time::Instant;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

// Generation metric names
pub const GENERATION_DURATION: &str = "musicgen.generation.duration";
pub const GENERATION_COUNT: &str = "musicgen.generation.count";
pub const GENERATION_AUDIO_SECONDS: &str = "musicgen.generation.audio_seconds";

// Model lifecycle metric names
pub const MODEL_LOAD_COUNT: &str = "musicgen.model.load.count";
pub const MODEL_LOAD_DURATION: &str = "musicgen.model.load.duration";

/// Instruments shared by the generation service and model handle
pub struct GenerationMetrics {
    pub generation_duration: Histogram<f64>,
    pub generation_count: Counter<u64>,
    pub audio_seconds: Histogram<u64>,
    pub load_count: Counter<u64>,
    pub load_duration: Histogram<f64>,
}

/// Lazily created instruments bound to the global meter provider
///
/// The instruments are no-ops until [`crate::init`] installs an exporter.
pub fn generation_metrics() -> &'static GenerationMetrics {
    static METRICS: OnceLock<GenerationMetrics> = OnceLock::new();

    METRICS.get_or_init(|| {
        let meter = global::meter("sonata");

        GenerationMetrics {
            generation_duration: meter
                .f64_histogram(GENERATION_DURATION)
                .with_unit("s")
                .with_description("Wall time of one generation, including artifact write")
                .build(),
            generation_count: meter
                .u64_counter(GENERATION_COUNT)
                .with_description("Generation requests by outcome")
                .build(),
            audio_seconds: meter
                .u64_histogram(GENERATION_AUDIO_SECONDS)
                .with_unit("s")
                .with_description("Requested clip length after clamping")
                .build(),
            load_count: meter
                .u64_counter(MODEL_LOAD_COUNT)
                .with_description("Model load attempts by outcome and trigger")
                .build(),
            load_duration: meter
                .f64_histogram(MODEL_LOAD_DURATION)
                .with_unit("s")
                .with_description("Wall time of one model load")
                .build(),
        }
    })
}

/// Record a duration measurement on a histogram
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[KeyValue]) {
    histogram.record(start.elapsed().as_secs_f64(), attributes);
}
