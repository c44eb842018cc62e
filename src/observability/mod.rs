//! # Observability
//!
//! Logging goes through `tracing` everywhere; the subscriber is installed by
//! the binary. This module holds the Prometheus metrics a run reports.

pub mod metrics;
