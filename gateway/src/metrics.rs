//! # Prometheus Metrics
//!
//! Request counters and latencies per Rosetta endpoint, scraped at
//! `/metrics` on the metrics port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] under the
//! `oasis_gateway` namespace.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Metric handles for the gateway.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    /// Requests handled, by endpoint.
    pub requests_total: IntCounterVec,
    /// Requests answered with a Rosetta error, by endpoint and error code.
    pub errors_total: IntCounterVec,
    /// Request handling latency in seconds, by endpoint.
    pub request_duration_seconds: HistogramVec,
}

impl GatewayMetrics {
    /// Create and register all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("oasis_gateway".into()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Total number of API requests handled"),
            &["endpoint"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Total number of API requests that failed"),
            &["endpoint", "code"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "request_duration_seconds",
                "API request handling latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            errors_total,
            request_duration_seconds,
        })
    }

    /// Record one handled request. `error_code` is the Rosetta code when the
    /// request failed.
    pub fn observe(&self, endpoint: &str, elapsed: Duration, error_code: Option<i32>) {
        self.requests_total.with_label_values(&[endpoint]).inc();
        self.request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(elapsed.as_secs_f64());
        if let Some(code) = error_code {
            self.errors_total
                .with_label_values(&[endpoint, &code.to_string()])
                .inc();
        }
    }

    /// Encode all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<GatewayMetrics>;

/// Renders `/metrics`.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
