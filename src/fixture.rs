//! # Fixture
//!
//! The explicit context record of one run. It is built once from
//! [`E2eConfig`], mutated only while resources are provisioned
//! (`&mut Fixture`), and read-only while test bodies execute (`&Fixture`).
//!
//! Owns:
//! - the scratch directory (rendered manifests, payload files, kubeconfig),
//!   deleted when the fixture is dropped,
//! - every generated resource identifier, so teardown deletes exactly what
//!   setup may have created,
//! - the payload each resource was created with,
//! - the `gcloud` / `kubectl` clients.

use crate::config::E2eConfig;
use crate::constants::MOUNT_DIR;
use crate::error::{HarnessError, Result};
use crate::exec::CommandRunner;
use crate::poll::settle;
use crate::suites::parametermanager::{
    JSON_GLOBAL_MODE, JSON_REGIONAL_MODE, YAML_GLOBAL_MODE, YAML_REGIONAL_MODE,
};
use crate::template::{render_file, Replacements};
use crate::tools::{Gcloud, Kubectl};
use paths::Location;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::info;
use uuid::Uuid;

/// `prefix-<12 hex chars>`, lowercase so it is valid for every resource kind
pub fn unique_name(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &random[..12])
}

/// Identifiers of every cloud resource a run may create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIds {
    pub test_secret: String,
    pub rotation_secret: String,
    pub extract_secret: String,
    pub regional_secret: String,
    pub regional_rotation_secret: String,
    /// Secret referenced by the global parameter versions
    pub param_secret: String,
    /// Secret referenced by the regional parameter versions
    pub regional_param_secret: String,
    pub yaml_parameter: String,
    pub json_parameter: String,
    pub regional_yaml_parameter: String,
    pub regional_json_parameter: String,
    pub yaml_version: String,
    pub json_version: String,
    pub regional_yaml_version: String,
    pub regional_json_version: String,
}

impl ResourceIds {
    pub fn generate() -> Self {
        let secret = || unique_name("testsecret");
        let parameter = || unique_name("testparameter");
        let version = || unique_name("testversion");
        Self {
            test_secret: secret(),
            rotation_secret: secret(),
            extract_secret: secret(),
            regional_secret: secret(),
            regional_rotation_secret: secret(),
            param_secret: secret(),
            regional_param_secret: secret(),
            yaml_parameter: parameter(),
            json_parameter: parameter(),
            regional_yaml_parameter: parameter(),
            regional_json_parameter: parameter(),
            yaml_version: version(),
            json_version: version(),
            regional_yaml_version: version(),
            regional_json_version: version(),
        }
    }

    /// Template token for each identifier
    pub fn tokens(&self) -> [(&'static str, &str); 15] {
        [
            ("TEST_SECRET_ID", &self.test_secret),
            ("ROTATION_SECRET_ID", &self.rotation_secret),
            ("EXTRACT_SECRET_ID", &self.extract_secret),
            ("REGIONAL_SECRET_ID", &self.regional_secret),
            ("REGIONAL_ROTATION_SECRET_ID", &self.regional_rotation_secret),
            ("PARAM_SECRET_ID", &self.param_secret),
            ("REGIONAL_PARAM_SECRET_ID", &self.regional_param_secret),
            ("YAML_PARAMETER_ID", &self.yaml_parameter),
            ("JSON_PARAMETER_ID", &self.json_parameter),
            ("REGIONAL_YAML_PARAMETER_ID", &self.regional_yaml_parameter),
            ("REGIONAL_JSON_PARAMETER_ID", &self.regional_json_parameter),
            ("YAML_VERSION_ID", &self.yaml_version),
            ("JSON_VERSION_ID", &self.json_version),
            ("REGIONAL_YAML_VERSION_ID", &self.regional_yaml_version),
            ("REGIONAL_JSON_VERSION_ID", &self.regional_json_version),
        ]
    }
}

/// Shared state of one run
#[derive(Debug)]
pub struct Fixture {
    pub config: E2eConfig,
    pub cluster_name: String,
    pub ids: ResourceIds,
    scratch: TempDir,
    kubeconfig: PathBuf,
    gcloud: Gcloud,
    kubectl: Kubectl,
    management: Kubectl,
    payloads: BTreeMap<String, Vec<u8>>,
    deployed: Mutex<BTreeSet<String>>,
}

impl Fixture {
    /// Create the scratch directory and generate every identifier
    pub fn new(config: E2eConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("csi-e2e-")
            .tempdir()
            .map_err(|e| HarnessError::io(std::env::temp_dir(), e))?;
        for dir in ["manifests", "payloads"] {
            let path = scratch.path().join(dir);
            std::fs::create_dir(&path).map_err(|e| HarnessError::io(&path, e))?;
        }
        let kubeconfig = scratch.path().join("kubeconfig");

        let fixture = Self {
            cluster_name: unique_name("csi-e2e"),
            ids: ResourceIds::generate(),
            gcloud: Gcloud::new(Arc::clone(&runner), config.project_id.clone()),
            kubectl: Kubectl::with_kubeconfig(Arc::clone(&runner), &kubeconfig),
            management: Kubectl::ambient(runner),
            config,
            scratch,
            kubeconfig,
            payloads: BTreeMap::new(),
            deployed: Mutex::new(BTreeSet::new()),
        };

        info!(
            "fixture ready: cluster={}, project={}, scratch={}",
            fixture.cluster_name,
            fixture.config.project_id,
            fixture.scratch_dir().display()
        );
        Ok(fixture)
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn kubeconfig(&self) -> &Path {
        &self.kubeconfig
    }

    pub fn gcloud(&self) -> &Gcloud {
        &self.gcloud
    }

    /// kubectl bound to the test cluster
    pub fn kubectl(&self) -> &Kubectl {
        &self.kubectl
    }

    /// kubectl bound to the ambient Config Connector context
    pub fn management(&self) -> &Kubectl {
        &self.management
    }

    pub fn regional(&self) -> Location {
        Location::Regional(self.config.location_id.clone())
    }

    /// Token values for every template
    pub fn replacements(&self) -> Replacements {
        let mut replacements = Replacements::new();
        replacements
            .set("PROJECT_ID", &self.config.project_id)
            .set("CLUSTER_NAME", &self.cluster_name)
            .set("ZONE", &self.config.zone)
            .set("LOCATION_ID", &self.config.location_id)
            .set("GCP_PROVIDER_SHA", &self.config.provider_sha)
            .set("SECRET_STORE_VERSION", &self.config.secret_store_version)
            .set("GKE_VERSION", &self.config.gke_version)
            .set("MOUNT_DIR", MOUNT_DIR)
            .set("YAML_GLOBAL_MODE", YAML_GLOBAL_MODE.yaml_literal())
            .set("JSON_GLOBAL_MODE", JSON_GLOBAL_MODE.yaml_literal())
            .set("YAML_REGIONAL_MODE", YAML_REGIONAL_MODE.yaml_literal())
            .set("JSON_REGIONAL_MODE", JSON_REGIONAL_MODE.yaml_literal());
        for (token, value) in self.ids.tokens() {
            replacements.set(token, value);
        }
        replacements
    }

    /// Render `templates/<name>` into the scratch directory
    pub fn render(&self, name: &str) -> Result<PathBuf> {
        render_file(
            &self.config.template_dir.join(name),
            &self.scratch.path().join("manifests"),
            &self.replacements(),
        )
    }

    /// Write a payload file and remember it as the content of `resource`
    pub fn store_payload(
        &mut self,
        resource: &str,
        payload: impl Into<Vec<u8>>,
    ) -> Result<PathBuf> {
        let payload = payload.into();
        let path = self.write_payload_file(resource, &payload)?;
        self.record_payload(resource, payload);
        Ok(path)
    }

    /// Remember what `resource` is expected to mount as
    pub fn record_payload(&mut self, resource: &str, payload: impl Into<Vec<u8>>) {
        self.payloads.insert(resource.to_string(), payload.into());
    }

    /// Write a payload file without changing what `resource` is expected to hold
    pub fn write_payload_file(&self, name: &str, payload: &[u8]) -> Result<PathBuf> {
        let path = self
            .scratch
            .path()
            .join("payloads")
            .join(format!("{name}-{}", Uuid::new_v4().simple()));
        std::fs::write(&path, payload).map_err(|e| HarnessError::io(&path, e))?;
        Ok(path)
    }

    /// Payload `resource` was created with
    pub fn payload(&self, resource: &str) -> Result<&[u8]> {
        self.payloads
            .get(resource)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                HarnessError::parse(
                    "fixture payloads",
                    format!("no payload recorded for {resource}"),
                )
            })
    }

    /// Render and apply a pod manifest once, then wait for the pod to be Ready
    ///
    /// Later calls for the same pod return immediately.
    pub async fn deploy_pod(&self, template: &str, pod: &str) -> Result<()> {
        if self.is_deployed(pod)? {
            return Ok(());
        }
        self.apply_pod(template, pod).await?;
        settle(
            self.config.timings.pod_pre_wait,
            "letting the pod become visible before kubectl wait",
        )
        .await;
        self.kubectl
            .wait_for_condition(
                &format!("pod/{pod}"),
                None,
                "Ready",
                self.config.timings.pod_ready_timeout,
            )
            .await
    }

    /// Render and apply a pod manifest without waiting on it
    pub async fn apply_pod(&self, template: &str, pod: &str) -> Result<()> {
        let manifest = self.render(template)?;
        self.kubectl.apply(&manifest).await?;
        self.deployed
            .lock()
            .map_err(|e| HarnessError::parse("deployed pods", e))?
            .insert(pod.to_string());
        Ok(())
    }

    fn is_deployed(&self, pod: &str) -> Result<bool> {
        Ok(self
            .deployed
            .lock()
            .map_err(|e| HarnessError::parse("deployed pods", e))?
            .contains(pod))
    }
}
