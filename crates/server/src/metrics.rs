//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the conversion server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Upload sizes and rejected requests by error code
//! - Circuit breaker state (collected on scrape)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

use pdfconvert_core::metrics::{circuit_state_value, CIRCUIT_STATE};
use pdfconvert_core::TargetFormat;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pdfconvert_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfconvert_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pdfconvert_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Upload Metrics
// =============================================================================

/// Accepted upload sizes in bytes.
pub static UPLOAD_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("pdfconvert_upload_bytes", "Size of accepted uploads")
            .buckets(prometheus::exponential_buckets(16_384.0, 4.0, 8).unwrap()),
        &["pair"],
    )
    .unwrap()
});

/// Requests answered with an error body, by error code.
pub static REQUEST_REJECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pdfconvert_request_errors_total",
            "Requests answered with an error body",
        ),
        &["code"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Uploads
    registry.register(Box::new(UPLOAD_BYTES.clone())).unwrap();
    registry
        .register(Box::new(REQUEST_REJECTIONS_TOTAL.clone()))
        .unwrap();

    // Core metrics (conversions, fallbacks, circuit breakers)
    for metric in pdfconvert_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Collect dynamic metrics from current application state.
///
/// Breaker state can change on a read (an open breaker whose cool-down has
/// elapsed), so the gauge is refreshed from snapshots before every scrape.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    for policy in state.policies() {
        let snapshot = policy.snapshot().await;
        CIRCUIT_STATE
            .with_label_values(&[policy.target().pair()])
            .set(circuit_state_value(snapshot.state));
    }
}

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());
static PAIR_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/api/(convert|circuit)/([^/]+)").unwrap());

/// Normalize a path for metric labels (replace IDs and unknown format pairs
/// with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_SEGMENT.replace_all(path, "{id}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");

    let unknown_pair = PAIR_SEGMENT
        .captures(&result)
        .and_then(|caps| caps.get(2))
        .is_some_and(|pair| TargetFormat::from_pair(pair.as_str()).is_none());
    if unknown_pair {
        return PAIR_SEGMENT
            .replace(&result, "/api/$1/{pair}")
            .to_string();
    }
    result.to_string()
}
