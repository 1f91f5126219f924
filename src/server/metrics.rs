use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all geoaudio metrics
const PREFIX: &str = "geoaudio";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Record Store Metrics
    pub static ref STORE_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_store_request_duration_seconds"),
            "Record store request duration in seconds"
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["operation"]
    ).expect("Failed to create store_request_duration_seconds metric");

    pub static ref STORE_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_store_errors_total"), "Record store errors by operation"),
        &["operation", "kind"]
    ).expect("Failed to create store_errors_total metric");

    // Feature Extraction Metrics
    pub static ref FEATURE_EXTRACTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_feature_extraction_duration_seconds"),
            "Audio decoding and loudness extraction duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).expect("Failed to create feature_extraction_duration_seconds metric");

    // Upload Metrics
    pub static ref UPLOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_uploads_total"), "Audio uploads by outcome"),
        &["outcome"]
    ).expect("Failed to create uploads_total metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type"),
        &["error_type"]
    ).expect("Failed to create errors_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STORE_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STORE_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FEATURE_EXTRACTION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(UPLOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses record ids so path labels stay low-cardinality.
///
/// `/audio/abc123` -> `/audio/{id}`
pub fn endpoint_label(path: &str) -> &'static str {
    let trimmed = path.trim_end_matches('/');
    match trimmed {
        "" => "/",
        "/audio" => "/audio",
        "/metrics" => "/metrics",
        _ if trimmed.starts_with("/audio/") && !trimmed["/audio/".len()..].contains('/') => {
            "/audio/{id}"
        }
        _ => "other",
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let label = endpoint_label(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, label, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, label])
        .observe(duration.as_secs_f64());
}

/// Record a record store round trip
pub fn record_store_request(operation: &str, duration: Duration) {
    STORE_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record a failed record store round trip
pub fn record_store_error(operation: &str, kind: &str) {
    STORE_ERRORS_TOTAL
        .with_label_values(&[operation, kind])
        .inc();
}

pub fn record_feature_extraction(duration: Duration) {
    FEATURE_EXTRACTION_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record an upload outcome (`created`, `rejected`, `extraction_failed`, `store_failed`)
pub fn record_upload(outcome: &str) {
    UPLOADS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
