//! # kubectl
//!
//! Argument vectors for the cluster control-plane CLI.
//!
//! A [`Kubectl`] is either bound to the ambient kube context (the Config
//! Connector management cluster) or to a kubeconfig file written during
//! provisioning (the test cluster).

use crate::constants::TEST_CONTAINER;
use crate::error::{HarnessError, Result};
use crate::exec::{run_checked, run_tolerant, CommandRunner, Invocation};
use k8s_openapi::api::core::v1::{Event, Pod};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// `kubectl get ... -o json` list envelope
#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Client for the cluster control-plane CLI
#[derive(Debug, Clone)]
pub struct Kubectl {
    runner: Arc<dyn CommandRunner>,
    kubeconfig: Option<PathBuf>,
}

impl Kubectl {
    /// Use whatever context the environment already points at
    pub fn ambient(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            kubeconfig: None,
        }
    }

    /// Use the credentials stored in `kubeconfig`
    pub fn with_kubeconfig(runner: Arc<dyn CommandRunner>, kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            kubeconfig: Some(kubeconfig.into()),
        }
    }

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = Invocation::new("kubectl").args(args);
        match &self.kubeconfig {
            Some(path) => invocation.env("KUBECONFIG", path.display().to_string()),
            None => invocation,
        }
    }

    async fn run(&self, invocation: Invocation) -> Result<Vec<u8>> {
        Ok(run_checked(self.runner.as_ref(), &invocation).await?.stdout)
    }

    async fn get_json<T: DeserializeOwned>(&self, args: &[&str], what: &str) -> Result<T> {
        let stdout = self.run(self.invocation(args.iter().copied())).await?;
        serde_json::from_slice(&stdout).map_err(|e| HarnessError::parse(what, e))
    }

    pub async fn apply(&self, manifest: &Path) -> Result<()> {
        let manifest = manifest.display().to_string();
        self.run(self.invocation(["apply", "-f", manifest.as_str()]))
            .await?;
        info!("applied {}", manifest);
        Ok(())
    }

    pub async fn apply_url(&self, url: &str) -> Result<()> {
        self.run(self.invocation(["apply", "-f", url])).await?;
        info!("applied {}", url);
        Ok(())
    }

    /// `kubectl wait --for=condition=<condition>` bounded by `timeout`
    pub async fn wait_for_condition(
        &self,
        resource: &str,
        namespace: Option<&str>,
        condition: &str,
        timeout: Duration,
    ) -> Result<()> {
        let mut args = vec![
            "wait".to_string(),
            resource.to_string(),
            format!("--for=condition={condition}"),
            format!("--timeout={}s", timeout.as_secs()),
        ];
        if let Some(namespace) = namespace {
            args.push(format!("--namespace={namespace}"));
        }

        match self.run(self.invocation(args)).await {
            Ok(_) => {
                info!("✅ {} is {}", resource, condition);
                Ok(())
            }
            Err(HarnessError::CommandFailed { output, .. }) if output.contains("timed out") => {
                Err(HarnessError::Timeout {
                    what: format!("{resource} {condition}"),
                    timeout,
                })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn rollout_status(
        &self,
        resource: &str,
        namespace: &str,
        timeout: Duration,
    ) -> Result<()> {
        self.run(self.invocation([
            "rollout".to_string(),
            "status".to_string(),
            resource.to_string(),
            format!("--namespace={namespace}"),
            format!("--timeout={}s", timeout.as_secs()),
        ]))
        .await?;
        info!("✅ {} rolled out", resource);
        Ok(())
    }

    /// Run a command in the test container of `pod`, returning raw stdout
    pub async fn exec(&self, pod: &str, command: &[&str]) -> Result<Vec<u8>> {
        let invocation = self
            .invocation(["exec", pod, "-c", TEST_CONTAINER, "--"])
            .args(command.iter().copied());
        self.run(invocation).await
    }

    pub async fn read_file(&self, pod: &str, path: &str) -> Result<Vec<u8>> {
        self.exec(pod, &["cat", path]).await
    }

    /// Permission bits of `path` as the 3-digit octal string `stat` prints
    pub async fn file_mode(&self, pod: &str, path: &str) -> Result<String> {
        let stdout = self.exec(pod, &["stat", "-c", "%a", path]).await?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    /// Events whose involved object is named `name`
    pub async fn events_for(&self, name: &str) -> Result<Vec<Event>> {
        let selector = format!("--field-selector=involvedObject.name={name}");
        let list: ObjectList<Event> = self
            .get_json(
                &["get", "events", selector.as_str(), "-o", "json"],
                &format!("events for {name}"),
            )
            .await?;
        Ok(list.items)
    }

    pub async fn get_pod(&self, name: &str) -> Result<Pod> {
        self.get_json(&["get", "pod", name, "-o", "json"], &format!("pod {name}"))
            .await
    }

    /// Logs of every container in pods matching `selector`
    pub async fn logs(&self, namespace: &str, selector: &str) -> Result<String> {
        let stdout = self
            .run(self.invocation([
                "logs".to_string(),
                format!("--namespace={namespace}"),
                format!("--selector={selector}"),
                "--all-containers=true".to_string(),
                "--prefix=true".to_string(),
                "--tail=-1".to_string(),
            ]))
            .await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Best-effort delete of everything in `manifest`
    pub async fn delete_manifest(&self, manifest: &Path, wait: bool) -> bool {
        let invocation = self.invocation([
            "delete".to_string(),
            "-f".to_string(),
            manifest.display().to_string(),
            "--ignore-not-found=true".to_string(),
            format!("--wait={wait}"),
        ]);
        run_tolerant(self.runner.as_ref(), &invocation).await
    }
}

/// Whether the pod reports the `Ready` condition as `True`
pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// Whether any event message contains `needle`
pub fn events_mention(events: &[Event], needle: &str) -> bool {
    events
        .iter()
        .filter_map(|e| e.message.as_deref())
        .any(|message| message.contains(needle))
}
