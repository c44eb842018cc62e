//! # Timing Configuration
//!
//! Every wait in the harness is bounded by one of these values.

use super::var_or_default;
use crate::constants::*;
use std::time::Duration;

/// Timeouts, fixed delays and poll intervals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// How long Config Connector gets to report the cluster Ready
    pub cluster_ready_timeout: Duration,
    /// `kubectl wait` timeout for test pods
    pub pod_ready_timeout: Duration,
    /// Sleep between applying a pod and waiting on it
    pub pod_pre_wait: Duration,
    /// Fixed delay after parameter IAM grants, before versions are created
    pub iam_propagation: Duration,
    /// Bound on waiting for a new secret version to be listed
    pub version_poll_timeout: Duration,
    /// Bound on waiting for the driver to rotate a mounted file
    pub rotation_timeout: Duration,
    /// Interval between polls
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            cluster_ready_timeout: Duration::from_secs(DEFAULT_CLUSTER_READY_TIMEOUT_SECS),
            pod_ready_timeout: Duration::from_secs(DEFAULT_POD_READY_TIMEOUT_SECS),
            pod_pre_wait: Duration::from_secs(DEFAULT_POD_PRE_WAIT_SECS),
            iam_propagation: Duration::from_secs(DEFAULT_IAM_PROPAGATION_SECS),
            version_poll_timeout: Duration::from_secs(DEFAULT_VERSION_POLL_TIMEOUT_SECS),
            rotation_timeout: Duration::from_secs(DEFAULT_ROTATION_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl Timings {
    pub(crate) fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: u64| Duration::from_secs(var_or_default(lookup, key, default));
        Self {
            cluster_ready_timeout: secs(
                "E2E_CLUSTER_READY_TIMEOUT_SECS",
                DEFAULT_CLUSTER_READY_TIMEOUT_SECS,
            ),
            pod_ready_timeout: secs("E2E_POD_READY_TIMEOUT_SECS", DEFAULT_POD_READY_TIMEOUT_SECS),
            pod_pre_wait: secs("E2E_POD_PRE_WAIT_SECS", DEFAULT_POD_PRE_WAIT_SECS),
            iam_propagation: secs("E2E_IAM_PROPAGATION_SECS", DEFAULT_IAM_PROPAGATION_SECS),
            version_poll_timeout: secs(
                "E2E_VERSION_POLL_TIMEOUT_SECS",
                DEFAULT_VERSION_POLL_TIMEOUT_SECS,
            ),
            rotation_timeout: secs("E2E_ROTATION_TIMEOUT_SECS", DEFAULT_ROTATION_TIMEOUT_SECS),
            poll_interval: secs("E2E_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}
