//! # Run Metrics
//!
//! Metrics for one harness run: test outcomes, test and setup durations,
//! and cleanup commands that failed during teardown.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec};
use std::sync::LazyLock;

// Test metrics
static TESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "csi_e2e_tests_total",
            "Total number of tests by suite and outcome (passed, failed, skipped)",
        ),
        &["suite", "outcome"],
    )
    .expect("Failed to create TESTS_TOTAL metric - this should never happen")
});

static TEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "csi_e2e_test_duration_seconds",
            "Duration of test bodies in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["suite"],
    )
    .expect("Failed to create TEST_DURATION metric - this should never happen")
});

// Setup metrics
static SETUP_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "csi_e2e_setup_duration_seconds",
            "Duration of cluster and resource provisioning in seconds",
        )
        .buckets(vec![60.0, 300.0, 600.0, 900.0, 1200.0, 1800.0, 2700.0]),
    )
    .expect("Failed to create SETUP_DURATION metric - this should never happen")
});

// Teardown metrics
static TEARDOWN_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "csi_e2e_teardown_failures_total",
        "Total number of cleanup commands that did not leave the remote state clean",
    )
    .expect("Failed to create TEARDOWN_FAILURES_TOTAL metric - this should never happen")
});

/// Register run metrics with the registry
pub(crate) fn register_run_metrics() -> Result<()> {
    REGISTRY.register(Box::new(TESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(SETUP_DURATION.clone()))?;
    REGISTRY.register(Box::new(TEARDOWN_FAILURES_TOTAL.clone()))?;
    Ok(())
}

// Public functions for run metrics

pub fn increment_tests(suite: &str, outcome: &str) {
    TESTS_TOTAL.with_label_values(&[suite, outcome]).inc();
}

pub fn observe_test_duration(suite: &str, duration: f64) {
    TEST_DURATION.with_label_values(&[suite]).observe(duration);
}

pub fn observe_setup_duration(duration: f64) {
    SETUP_DURATION.observe(duration);
}

pub fn increment_teardown_failures(count: usize) {
    TEARDOWN_FAILURES_TOTAL.inc_by(count as u64);
}
