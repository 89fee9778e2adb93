// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for GSLB reconciliation.
//!
//! All metrics carry the namespace prefix `gslb_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Workflow outcomes and durations
//! - **Gateway Metrics** - Fatal gateway errors by gateway and reason
//! - **Verification Metrics** - Verification outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use gslb::metrics::{gather_metrics, record_reconciliation};
//!
//! record_reconciliation("create", "success", std::time::Duration::from_secs(1));
//! let text = gather_metrics().unwrap();
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all GSLB metrics
const METRICS_NAMESPACE: &str = "gslb";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of workflow invocations by workflow and status
///
/// Labels:
/// - `workflow`: `create`, `delete` or `status`
/// - `status`: `success` or `failed`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of GSLB reconciliations by workflow and status",
    );
    let counter = CounterVec::new(opts, &["workflow", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of workflow invocations in seconds
///
/// Labels:
/// - `workflow`: `create`, `delete` or `status`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of GSLB reconciliations in seconds by workflow",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["workflow"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Gateway Metrics
// ============================================================================

/// Total number of fatal gateway errors
///
/// Labels:
/// - `gateway`: `traffic` or `dns`
/// - `reason`: Error reason code (e.g., `Rejected`, `TransportError`)
pub static GATEWAY_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_gateway_errors_total"),
        "Total number of fatal gateway errors by gateway and reason",
    );
    let counter = CounterVec::new(opts, &["gateway", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Verification Metrics
// ============================================================================

/// Total number of verifications by outcome
///
/// Labels:
/// - `outcome`: `passed` or `failed`
pub static VERIFICATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_verifications_total"),
        "Total number of GSLB verifications by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a finished workflow invocation
///
/// # Arguments
/// * `workflow` - `create`, `delete` or `status`
/// * `status` - `success` or `failed`
/// * `duration` - Wall time of the invocation
pub fn record_reconciliation(workflow: &str, status: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[workflow, status])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[workflow])
        .observe(duration.as_secs_f64());
}

/// Record a fatal gateway error
///
/// # Arguments
/// * `gateway` - `traffic` or `dns`
/// * `reason` - Reason code from `GatewayError::status_reason`
pub fn record_gateway_error(gateway: &str, reason: &str) {
    GATEWAY_ERRORS_TOTAL
        .with_label_values(&[gateway, reason])
        .inc();
}

/// Record a verification outcome
pub fn record_verification(passed: bool) {
    let outcome = if passed { "passed" } else { "failed" };
    VERIFICATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Gather and encode all metrics in Prometheus text format
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation() {
        let workflow = "test_create";
        record_reconciliation(workflow, "success", Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[workflow, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[workflow]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_gateway_error() {
        record_gateway_error("test_gateway", "Rejected");
        let counter = GATEWAY_ERRORS_TOTAL.with_label_values(&["test_gateway", "Rejected"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_verification() {
        let before = VERIFICATIONS_TOTAL.with_label_values(&["failed"]).get();
        record_verification(false);
        assert!(VERIFICATIONS_TOTAL.with_label_values(&["failed"]).get() > before);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation("gather_test", "failed", Duration::from_millis(100));

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("gslb_reconciliations_total"));
        assert!(metrics_text.contains("gslb_reconciliation_duration_seconds"));
    }
}
