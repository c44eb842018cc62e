//! # Harness Configuration
//!
//! Run configuration loaded from environment variables (set by the CI job).
//!
//! Five variables are mandatory and fail the run immediately when absent:
//! `GCP_PROVIDER_SHA`, `PROJECT_ID`, `LOCATION_ID`, `SECRET_STORE_VERSION`
//! and `GKE_VERSION`. Everything else has a default.
//!
//! Loading goes through a lookup function so tests can feed a map instead of
//! mutating the process environment.

mod timings;

pub use timings::Timings;

use crate::error::{HarnessError, Result};
use crate::suites::SuiteSelection;
use std::path::PathBuf;

/// Fully resolved run configuration
#[derive(Debug, Clone)]
pub struct E2eConfig {
    /// Target project for the cluster, secrets and parameters
    pub project_id: String,
    /// Provider image tag under test
    pub provider_sha: String,
    /// Region used for every regional resource
    pub location_id: String,
    /// Secrets Store CSI driver release, e.g. `v1.4.7`
    pub secret_store_version: String,
    /// GKE release channel / version for the test cluster
    pub gke_version: String,
    /// Zone the test cluster is created in
    pub zone: String,
    /// Which suites to run
    pub suite: SuiteSelection,
    /// Directory holding the `*.yaml.tmpl` manifests
    pub template_dir: PathBuf,
    /// Prometheus textfile written at the end of the run
    pub metrics_file: Option<PathBuf>,
    pub timings: Timings,
}

impl E2eConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let suite = match lookup("E2E_TEST_SUITE") {
            Some(value) => value.parse().map_err(|message| HarnessError::InvalidEnv {
                key: "E2E_TEST_SUITE",
                message,
            })?,
            None => SuiteSelection::All,
        };

        Ok(Self {
            project_id: required(&lookup, "PROJECT_ID")?,
            provider_sha: required(&lookup, "GCP_PROVIDER_SHA")?,
            location_id: required(&lookup, "LOCATION_ID")?,
            secret_store_version: required(&lookup, "SECRET_STORE_VERSION")?,
            gke_version: required(&lookup, "GKE_VERSION")?,
            zone: non_empty(&lookup, "ZONE")
                .unwrap_or_else(|| crate::constants::DEFAULT_ZONE.to_string()),
            suite,
            template_dir: non_empty(&lookup, "E2E_TEMPLATE_DIR")
                .map_or_else(default_template_dir, PathBuf::from),
            metrics_file: non_empty(&lookup, "E2E_METRICS_FILE").map(PathBuf::from),
            timings: Timings::from_lookup(&lookup),
        })
    }
}

/// Templates ship next to the crate sources
fn default_template_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or(HarnessError::MissingEnv(key))
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read a variable or return the default value
pub(crate) fn var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("PROJECT_ID", "secretmanager-csi-build"),
            ("GCP_PROVIDER_SHA", "3f2c1ab"),
            ("LOCATION_ID", "us-central1"),
            ("SECRET_STORE_VERSION", "v1.4.7"),
            ("GKE_VERSION", "STABLE"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<E2eConfig> {
        E2eConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn test_loads_mandatory_values_and_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.project_id, "secretmanager-csi-build");
        assert_eq!(config.location_id, "us-central1");
        assert_eq!(config.zone, "us-central1-c");
        assert_eq!(config.suite, SuiteSelection::All);
        assert!(config.metrics_file.is_none());
        assert!(config.template_dir.ends_with("templates"));
        assert_eq!(config.timings.iam_propagation, Duration::from_secs(90));
    }

    #[test]
    fn test_missing_mandatory_value_is_fatal() {
        for key in [
            "PROJECT_ID",
            "GCP_PROVIDER_SHA",
            "LOCATION_ID",
            "SECRET_STORE_VERSION",
            "GKE_VERSION",
        ] {
            let mut env = base_env();
            env.remove(key);
            match load(&env) {
                Err(HarnessError::MissingEnv(missing)) => assert_eq!(missing, key),
                other => panic!("expected MissingEnv({key}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_blank_mandatory_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("PROJECT_ID", "   ");
        assert!(matches!(
            load(&env),
            Err(HarnessError::MissingEnv("PROJECT_ID"))
        ));
    }

    #[test]
    fn test_suite_selector() {
        let mut env = base_env();
        env.insert("E2E_TEST_SUITE", "parametermanager");
        assert_eq!(load(&env).unwrap().suite, SuiteSelection::ParameterManager);

        env.insert("E2E_TEST_SUITE", "");
        assert_eq!(load(&env).unwrap().suite, SuiteSelection::All);

        env.insert("E2E_TEST_SUITE", "kms");
        assert!(matches!(
            load(&env),
            Err(HarnessError::InvalidEnv {
                key: "E2E_TEST_SUITE",
                ..
            })
        ));
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("ZONE", "europe-west4-a");
        env.insert("E2E_METRICS_FILE", "/tmp/e2e.prom");
        env.insert("E2E_POD_READY_TIMEOUT_SECS", "60");
        env.insert("E2E_POLL_INTERVAL_SECS", "not-a-number");
        let config = load(&env).unwrap();
        assert_eq!(config.zone, "europe-west4-a");
        assert_eq!(config.metrics_file, Some(PathBuf::from("/tmp/e2e.prom")));
        assert_eq!(config.timings.pod_ready_timeout, Duration::from_secs(60));
        // Unparseable values fall back to the default
        assert_eq!(config.timings.poll_interval, Duration::from_secs(10));
    }
}
