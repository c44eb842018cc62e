//! # Test Cluster
//!
//! The GKE cluster is created through Config Connector: the rendered
//! `ContainerCluster` manifest is applied to the ambient management context
//! and the harness waits for it to report Ready. The driver and the provider
//! under test are then installed into the new cluster.

use crate::constants::{
    CONFIG_CONNECTOR_NAMESPACE, DAEMONSET_ROLLOUT_TIMEOUT_SECS, DRIVER_NAMESPACE,
    DRIVER_RELEASE_MANIFESTS, DRIVER_RELEASE_URL, DRIVER_SELECTOR, PROVIDER_SELECTOR,
};
use crate::error::Result;
use crate::fixture::Fixture;
use crate::lifecycle::Provisioner;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

pub const CLUSTER_TEMPLATE: &str = "cluster.yaml.tmpl";
pub const DRIVER_TEMPLATE: &str = "secrets-store-csi-driver.yaml.tmpl";
pub const PROVIDER_TEMPLATE: &str = "provider-gcp-plugin.yaml.tmpl";

/// DaemonSets that must be rolled out before any test pod is scheduled
const DAEMONSETS: [&str; 2] = [
    "daemonset/csi-secrets-store",
    "daemonset/csi-secrets-store-provider-gcp",
];

/// Upstream CRD and RBAC manifests for a driver release
pub fn release_manifest_urls(version: &str) -> Vec<String> {
    let base = DRIVER_RELEASE_URL.replace("{version}", version);
    DRIVER_RELEASE_MANIFESTS
        .iter()
        .map(|manifest| format!("{base}/{manifest}"))
        .collect()
}

/// Creates the cluster and installs the driver and provider
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterProvisioner;

#[async_trait]
impl Provisioner for ClusterProvisioner {
    async fn provision(&self, fixture: &mut Fixture) -> Result<()> {
        let name = fixture.cluster_name.clone();
        let ready_timeout = fixture.config.timings.cluster_ready_timeout;

        info!("creating cluster {} via Config Connector", name);
        let manifest = fixture.render(CLUSTER_TEMPLATE)?;
        fixture.management().apply(&manifest).await?;
        fixture
            .management()
            .wait_for_condition(
                &format!("containercluster/{name}"),
                Some(CONFIG_CONNECTOR_NAMESPACE),
                "Ready",
                ready_timeout,
            )
            .await?;

        fixture
            .gcloud()
            .fetch_cluster_credentials(&name, &fixture.config.zone, fixture.kubeconfig())
            .await?;

        let kubectl = fixture.kubectl();
        for url in release_manifest_urls(&fixture.config.secret_store_version) {
            kubectl.apply_url(&url).await?;
        }
        for template in [DRIVER_TEMPLATE, PROVIDER_TEMPLATE] {
            kubectl.apply(&fixture.render(template)?).await?;
        }
        for daemonset in DAEMONSETS {
            kubectl
                .rollout_status(
                    daemonset,
                    DRIVER_NAMESPACE,
                    Duration::from_secs(DAEMONSET_ROLLOUT_TIMEOUT_SECS),
                )
                .await?;
        }

        info!("✅ cluster {} is ready with driver and provider", name);
        Ok(())
    }

    /// Dump driver and provider logs, then delete the cluster without waiting
    async fn teardown(&self, fixture: &Fixture) -> usize {
        let components = [("provider", PROVIDER_SELECTOR), ("driver", DRIVER_SELECTOR)];
        for (component, selector) in components {
            match fixture.kubectl().logs(DRIVER_NAMESPACE, selector).await {
                Ok(logs) => info!("{} logs:\n{}", component, logs),
                Err(e) => warn!("could not collect {} logs: {}", component, e),
            }
        }

        match fixture.render(CLUSTER_TEMPLATE) {
            Ok(manifest) => {
                let deleted = fixture.management().delete_manifest(&manifest, false).await;
                usize::from(!deleted)
            }
            Err(e) => {
                warn!("cannot delete cluster {}: {}", fixture.cluster_name, e);
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_manifest_urls() {
        let urls = release_manifest_urls("v1.4.7");
        assert_eq!(urls.len(), DRIVER_RELEASE_MANIFESTS.len());
        assert_eq!(
            urls[0],
            "https://raw.githubusercontent.com/kubernetes-sigs/secrets-store-csi-driver/v1.4.7/deploy/rbac-secretproviderclass.yaml"
        );
        assert!(urls.iter().all(|url| !url.contains("{version}")));
    }
}
