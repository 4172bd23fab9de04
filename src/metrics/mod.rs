//! Prometheus metrics for the push service.
//!
//! - Request metrics (accepted, rejected by validation, failed media staging)
//! - Per-target send metrics (success / failure by provider error code)
//! - Media staging and cleanup metrics
//! - Dispatch latency

mod helpers;

pub use helpers::{encode_metrics, InFlightGuard, MediaMetrics, RequestMetrics, SendMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "push";

lazy_static! {
    // ============================================================================
    // Request Metrics
    // ============================================================================

    /// Send requests by result (ok, validation_error, storage_error)
    pub static ref REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_requests_total", METRIC_PREFIX),
        "Total send requests by result",
        &["result"]
    ).unwrap();

    /// Requests currently in the pipeline
    pub static ref REQUESTS_IN_FLIGHT: IntGauge = register_int_gauge!(
        format!("{}_requests_in_flight", METRIC_PREFIX),
        "Send requests currently being processed"
    ).unwrap();

    // ============================================================================
    // Send Metrics
    // ============================================================================

    /// Per-target sends by outcome
    pub static ref SENDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sends_total", METRIC_PREFIX),
        "Total per-target sends by outcome",
        &["outcome"]
    ).unwrap();

    /// Per-target failures by provider error code
    pub static ref SEND_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_send_errors_total", METRIC_PREFIX),
        "Total per-target send failures by provider error code",
        &["code"]
    ).unwrap();

    /// Time to dispatch one request to all of its targets
    pub static ref DISPATCH_LATENCY: Histogram = register_histogram!(
        format!("{}_dispatch_latency_seconds", METRIC_PREFIX),
        "Time to dispatch a request to all targets in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Media Metrics
    // ============================================================================

    /// Binaries staged in blob storage
    pub static ref MEDIA_STAGED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_media_staged_total", METRIC_PREFIX),
        "Total media binaries staged in blob storage"
    ).unwrap();

    /// Staged objects that could not be deleted
    pub static ref MEDIA_CLEANUP_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_media_cleanup_failures_total", METRIC_PREFIX),
        "Total staged media objects that failed to delete"
    ).unwrap();
}
