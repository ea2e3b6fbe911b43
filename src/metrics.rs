// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Beiboot gateway.
//!
//! All metrics carry the namespace prefix `beiboot_gateway_`.
//!
//! # Metrics Categories
//!
//! - **Admission Metrics** - Outcomes of create requests and parameter failures
//! - **Policy Metrics** - Policy cache refreshes and size
//! - **Backend Metrics** - Calls to the orchestration backend
//! - **Performance Metrics** - Parameter resolution latency
//!
//! # Example
//!
//! ```rust,no_run
//! use beiboot_gateway::metrics::{gather_metrics, record_admission};
//!
//! record_admission("developer", "admitted");
//! let text = gather_metrics().unwrap();
//! assert!(text.contains("beiboot_gateway_admissions_total"));
//! ```

use crate::policy::RecordKind;
use prometheus::{
    CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all gateway metrics
const METRICS_NAMESPACE: &str = "beiboot_gateway";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Admission Metrics
// ============================================================================

/// Total number of create requests by selected group and outcome
///
/// Labels:
/// - `group`: Selected group
/// - `outcome`: `admitted`, `group_quota`, `user_quota`, `invalid`
pub static ADMISSIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_admissions_total"),
        "Total number of cluster create requests by group and outcome",
    );
    let counter = CounterVec::new(opts, &["group", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of rejected parameters
///
/// Labels:
/// - `parameter`: Parameter name (e.g., `NODE_COUNT`)
/// - `kind`: Error kind (e.g., `OutOfBounds`)
pub static VALIDATION_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_validation_failures_total"),
        "Total number of rejected cluster parameters by parameter and error kind",
    );
    let counter = CounterVec::new(opts, &["parameter", "kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Policy Metrics
// ============================================================================

/// `name` label of refreshes for records unknown to both the store and the cache
pub const UNTRACKED_RECORD_NAME: &str = "_untracked";

/// Total number of policy cache refreshes
///
/// Labels:
/// - `kind`: `policy` or `quota`
/// - `name`: Record name, or [`UNTRACKED_RECORD_NAME`] for names that are
///   neither in the store nor cached
/// - `status`: `success`, `not_found`, `timeout`, `invalid`, `error`
pub static POLICY_REFRESH_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_policy_refresh_total"),
        "Total number of policy cache refreshes by record and status",
    );
    let counter = CounterVec::new(opts, &["kind", "name", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Number of records currently cached
///
/// Labels:
/// - `kind`: `policy` or `quota`
pub static POLICY_CACHE_ENTRIES: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_policy_cache_entries"),
        "Number of records currently held in the policy cache",
    );
    let gauge = GaugeVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Backend Metrics
// ============================================================================

/// Total number of orchestration backend calls
///
/// Labels:
/// - `operation`: `create`, `list`, `read`, `delete`
/// - `status`: `success`, `not_found`, `error`, `timeout`
pub static BACKEND_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_backend_requests_total"),
        "Total number of orchestration backend calls by operation and status",
    );
    let counter = CounterVec::new(opts, &["operation", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Performance Metrics
// ============================================================================

/// Duration of parameter validation and policy resolution in seconds
pub static RESOLUTION_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_resolution_duration_seconds"),
        "Duration of parameter validation and policy resolution in seconds",
    )
    .buckets(vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record the outcome of a create request
///
/// # Arguments
/// * `group` - The selected group
/// * `outcome` - `admitted`, `group_quota`, `user_quota` or `invalid`
pub fn record_admission(group: &str, outcome: &str) {
    ADMISSIONS_TOTAL.with_label_values(&[group, outcome]).inc();
}

/// Record a rejected parameter
pub fn record_validation_failure(parameter: &str, kind: &str) {
    VALIDATION_FAILURES_TOTAL
        .with_label_values(&[parameter, kind])
        .inc();
}

/// Record a policy cache refresh
pub fn record_policy_refresh(kind: RecordKind, name: &str, status: &str) {
    let kind = kind.to_string();
    POLICY_REFRESH_TOTAL
        .with_label_values(&[kind.as_str(), name, status])
        .inc();
}

/// Set the number of cached records of one kind
#[allow(clippy::cast_precision_loss)]
pub fn set_policy_cache_entries(kind: RecordKind, entries: usize) {
    let kind = kind.to_string();
    POLICY_CACHE_ENTRIES
        .with_label_values(&[kind.as_str()])
        .set(entries as f64);
}

/// Record an orchestration backend call
pub fn record_backend_request(operation: &str, status: &str) {
    BACKEND_REQUESTS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

/// Record how long validation and resolution of one request took
pub fn record_resolution_duration(duration: Duration) {
    RESOLUTION_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
