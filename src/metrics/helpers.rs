//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, IntGauge, TextEncoder};

use super::{
    DISPATCH_LATENCY, MEDIA_CLEANUP_FAILURES_TOTAL, MEDIA_STAGED_TOTAL, REQUESTS_IN_FLIGHT,
    REQUESTS_TOTAL, SENDS_TOTAL, SEND_ERRORS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording request-level metrics
pub struct RequestMetrics;

impl RequestMetrics {
    pub fn record_ok() {
        REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
    }

    pub fn record_validation_error() {
        REQUESTS_TOTAL.with_label_values(&["validation_error"]).inc();
    }

    pub fn record_storage_error() {
        REQUESTS_TOTAL.with_label_values(&["storage_error"]).inc();
    }

    /// Count a request as in flight until the returned guard is dropped
    pub fn in_flight() -> InFlightGuard<'static> {
        InFlightGuard::new(&REQUESTS_IN_FLIGHT)
    }
}

/// Holds one unit of an in-flight gauge; released on drop, including when
/// the owning future is cancelled.
pub struct InFlightGuard<'a> {
    gauge: &'a IntGauge,
}

impl<'a> InFlightGuard<'a> {
    pub fn new(gauge: &'a IntGauge) -> Self {
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

/// Helper struct for recording per-target send metrics
pub struct SendMetrics;

impl SendMetrics {
    pub fn record_success() {
        SENDS_TOTAL.with_label_values(&["success"]).inc();
    }

    /// Record a failed send with the provider's error code
    pub fn record_failure(code: &str) {
        SENDS_TOTAL.with_label_values(&["failure"]).inc();
        SEND_ERRORS_TOTAL.with_label_values(&[code]).inc();
    }

    pub fn observe_dispatch(seconds: f64) {
        DISPATCH_LATENCY.observe(seconds);
    }
}

/// Helper struct for recording media staging metrics
pub struct MediaMetrics;

impl MediaMetrics {
    pub fn record_staged() {
        MEDIA_STAGED_TOTAL.inc();
    }

    pub fn record_cleanup_failure() {
        MEDIA_CLEANUP_FAILURES_TOTAL.inc();
    }
}
