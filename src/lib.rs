//! Secrets Store CSI e2e Library
//!
//! End-to-end harness for the Secrets Store CSI driver GCP provider. Creates
//! a cluster, provisions Secret Manager secrets and Parameter Manager
//! parameters, mounts them into pods and asserts on what the driver wrote.
//! Tests for the harness itself live in the module files and in `tests/`.

pub mod assertions;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod exec;
pub mod fixture;
pub mod lifecycle;
pub mod observability;
pub mod payload;
pub mod poll;
pub mod suites;
pub mod template;
pub mod tools;

pub use config::E2eConfig;
pub use error::{HarnessError, TestFailure, TestResult};
pub use fixture::Fixture;
pub use lifecycle::{Coordinator, RunReport};
