//! Metrics and observability utilities
//!
//! Series are described once at startup and recorded through the `metrics`
//! facade. Without an installed recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Cognify metrics
pub const METRICS_PREFIX: &str = "cognify";

/// Buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00, 30.00,
];

/// Buckets for model calls, which routinely take several seconds
pub const AI_BUCKETS: &[f64] = &[0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 20.00, 45.00, 90.00, 180.0];

/// Buckets for assessment scores
pub const SCORE_BUCKETS: &[f64] = &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_ai_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Model calls by flow and outcome"
    );

    describe_histogram!(
        format!("{}_ai_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Model call latency in seconds"
    );

    describe_counter!(
        format!("{}_materials_created_total", METRICS_PREFIX),
        Unit::Count,
        "Study materials created, by source type"
    );

    describe_counter!(
        format!("{}_assessments_evaluated_total", METRICS_PREFIX),
        Unit::Count,
        "Assessments evaluated and recorded"
    );

    describe_histogram!(
        format!("{}_assessment_score", METRICS_PREFIX),
        Unit::Count,
        "Overall assessment scores"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

pub fn record_ai_call(flow: &'static str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_ai_requests_total", METRICS_PREFIX),
        "flow" => flow,
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_ai_duration_seconds", METRICS_PREFIX),
        "flow" => flow
    )
    .record(duration_secs);
}

pub fn record_material_created(source: &'static str) {
    counter!(
        format!("{}_materials_created_total", METRICS_PREFIX),
        "source" => source
    )
    .increment(1);
}

pub fn record_evaluation(score: u8) {
    counter!(format!("{}_assessments_evaluated_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_assessment_score", METRICS_PREFIX)).record(f64::from(score));
}
