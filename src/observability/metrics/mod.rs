//! # Metrics Module
//!
//! Prometheus metrics for one harness run, written as a textfile for CI
//! collection.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and textfile output
//! - `run_metrics` - Test outcomes, durations and teardown failures

pub mod registry;
pub mod run_metrics;

pub use registry::*;
pub use run_metrics::*;
