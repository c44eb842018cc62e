//! # Constants
//!
//! Defaults for the harness. Every timing default can be overridden through
//! the environment (see [`crate::config`]).

/// Default GKE zone for the test cluster
pub const DEFAULT_ZONE: &str = "us-central1-c";

/// Cluster creation through Config Connector routinely takes 10-20 minutes
pub const DEFAULT_CLUSTER_READY_TIMEOUT_SECS: u64 = 30 * 60;

/// `kubectl wait` timeout for test pods
pub const DEFAULT_POD_READY_TIMEOUT_SECS: u64 = 5 * 60;

/// Sleep between `kubectl apply` and `kubectl wait`.
/// `kubectl wait` errors out if the object is not visible yet.
pub const DEFAULT_POD_PRE_WAIT_SECS: u64 = 5;

/// Fixed delay after granting parameter service identities access to secrets
pub const DEFAULT_IAM_PROPAGATION_SECS: u64 = 90;

/// Bound on waiting for Secret Manager to list a newly added version
pub const DEFAULT_VERSION_POLL_TIMEOUT_SECS: u64 = 120;

/// Bound on waiting for the driver to rotate a mounted file
pub const DEFAULT_ROTATION_TIMEOUT_SECS: u64 = 5 * 60;

/// Interval between polls of remote state
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Rollout timeout for the driver and provider DaemonSets
pub const DAEMONSET_ROLLOUT_TIMEOUT_SECS: u64 = 5 * 60;

/// Namespace the driver and provider are installed into
pub const DRIVER_NAMESPACE: &str = "kube-system";

/// Namespace Config Connector cluster objects are created in
pub const CONFIG_CONNECTOR_NAMESPACE: &str = "default";

/// Label selector of the provider DaemonSet pods
pub const PROVIDER_SELECTOR: &str = "app=csi-secrets-store-provider-gcp";

/// Label selector of the driver DaemonSet pods
pub const DRIVER_SELECTOR: &str = "app=csi-secrets-store";

/// Upstream driver manifests applied verbatim from the release tag
pub const DRIVER_RELEASE_MANIFESTS: &[&str] = &[
    "rbac-secretproviderclass.yaml",
    "rbac-secretprovidersyncing.yaml",
    "csidriver.yaml",
    "secrets-store.csi.x-k8s.io_secretproviderclasses.yaml",
    "secrets-store.csi.x-k8s.io_secretproviderclasspodstatuses.yaml",
];

/// Base URL of the upstream driver deploy directory, `{version}` substituted
pub const DRIVER_RELEASE_URL: &str =
    "https://raw.githubusercontent.com/kubernetes-sigs/secrets-store-csi-driver/{version}/deploy";

/// Directory the test pods mount the CSI volume at
pub const MOUNT_DIR: &str = "/var/gcp-test-secrets";

/// Directory the atomic writer keeps the real files in; the entries directly
/// under [`MOUNT_DIR`] are symlinks into it and always report mode 777
pub const DATA_DIR_NAME: &str = "..data";

/// Container name in every test pod
pub const TEST_CONTAINER: &str = "test-container";

/// Role granted to parameter service identities on referenced secrets
pub const SECRET_ACCESSOR_ROLE: &str = "roles/secretmanager.secretAccessor";

/// Substring the driver puts in the mount failure event for a bad path
pub const INVALID_PATH_EVENT: &str = "invalid path";

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "secrets_store_csi_e2e=info";
