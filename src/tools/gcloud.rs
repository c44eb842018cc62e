//! # gcloud
//!
//! Argument vectors for Secret Manager, Parameter Manager and GKE operations.
//!
//! Every invocation is pinned to the fixture's project with `--project`.
//! Global secrets take no location flag; regional secrets and every
//! parameter take `--location`.

use crate::error::{HarnessError, Result};
use crate::exec::{run_checked, run_tolerant, CommandRunner, Invocation};
use crate::payload::PayloadFormat;
use paths::Location;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Client for the cloud-resource management CLI
#[derive(Debug, Clone)]
pub struct Gcloud {
    runner: Arc<dyn CommandRunner>,
    project: String,
}

impl Gcloud {
    pub fn new(runner: Arc<dyn CommandRunner>, project: impl Into<String>) -> Self {
        Self {
            runner,
            project: project.into(),
        }
    }

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new("gcloud")
            .args(args)
            .arg(format!("--project={}", self.project))
    }

    /// Secrets only carry `--location` when regional
    fn secret_invocation<I, S>(&self, args: I, location: &Location) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = self.invocation(args);
        match location.region() {
            Some(region) => invocation.arg(format!("--location={region}")),
            None => invocation,
        }
    }

    /// Parameters always carry `--location`, `global` included
    fn parameter_invocation<I, S>(&self, args: I, location: &Location) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invocation(args)
            .arg(format!("--location={}", location.as_str()))
    }

    // ---- Secret Manager -------------------------------------------------

    pub async fn create_secret(
        &self,
        secret: &str,
        location: &Location,
        data_file: &Path,
    ) -> Result<()> {
        let mut args = vec![
            "secrets".to_string(),
            "create".to_string(),
            secret.to_string(),
            format!("--data-file={}", data_file.display()),
        ];
        if !location.is_regional() {
            args.push("--replication-policy=automatic".to_string());
        }
        run_checked(self.runner.as_ref(), &self.secret_invocation(args, location)).await?;
        info!("created secret {} ({})", secret, location);
        Ok(())
    }

    pub async fn add_secret_version(
        &self,
        secret: &str,
        location: &Location,
        data_file: &Path,
    ) -> Result<()> {
        let invocation = self.secret_invocation(
            [
                "secrets".to_string(),
                "versions".to_string(),
                "add".to_string(),
                secret.to_string(),
                format!("--data-file={}", data_file.display()),
            ],
            location,
        );
        run_checked(self.runner.as_ref(), &invocation).await?;
        info!("added version to secret {} ({})", secret, location);
        Ok(())
    }

    /// Number of versions Secret Manager currently lists for `secret`
    pub async fn secret_version_count(&self, secret: &str, location: &Location) -> Result<usize> {
        let invocation = self.secret_invocation(
            ["secrets", "versions", "list", secret, "--format=json"],
            location,
        );
        let output = run_checked(self.runner.as_ref(), &invocation).await?;
        let versions: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)
            .map_err(|e| HarnessError::parse(format!("versions of {secret}"), e))?;
        Ok(versions.len())
    }

    pub async fn grant_secret_access(
        &self,
        secret: &str,
        location: &Location,
        member: &str,
        role: &str,
    ) -> Result<()> {
        let invocation = self.secret_invocation(
            [
                "secrets".to_string(),
                "add-iam-policy-binding".to_string(),
                secret.to_string(),
                format!("--member={member}"),
                format!("--role={role}"),
            ],
            location,
        );
        run_checked(self.runner.as_ref(), &invocation).await?;
        info!("granted {} on secret {} to {}", role, secret, member);
        Ok(())
    }

    /// Best-effort delete; returns whether the secret is gone
    pub async fn delete_secret(&self, secret: &str, location: &Location) -> bool {
        let invocation =
            self.secret_invocation(["secrets", "delete", secret, "--quiet"], location);
        run_tolerant(self.runner.as_ref(), &invocation).await
    }

    // ---- Parameter Manager ----------------------------------------------

    pub async fn create_parameter(
        &self,
        parameter: &str,
        location: &Location,
        format: PayloadFormat,
    ) -> Result<()> {
        let invocation = self.parameter_invocation(
            [
                "parametermanager".to_string(),
                "parameters".to_string(),
                "create".to_string(),
                parameter.to_string(),
                format!("--parameter-format={}", format.as_flag()),
            ],
            location,
        );
        run_checked(self.runner.as_ref(), &invocation).await?;
        info!("created {} parameter {} ({})", format, parameter, location);
        Ok(())
    }

    /// IAM principal of the service identity generated for a parameter
    pub async fn parameter_principal(&self, parameter: &str, location: &Location) -> Result<String> {
        let invocation = self.parameter_invocation(
            [
                "parametermanager",
                "parameters",
                "describe",
                parameter,
                "--format=value(policyMember.iamPolicyUidPrincipal)",
            ],
            location,
        );
        let output = run_checked(self.runner.as_ref(), &invocation).await?;
        let principal = output.stdout_str().trim().to_string();
        if principal.is_empty() {
            return Err(HarnessError::parse(
                format!("policy member of parameter {parameter}"),
                "empty iamPolicyUidPrincipal",
            ));
        }
        Ok(principal)
    }

    pub async fn create_parameter_version(
        &self,
        parameter: &str,
        version: &str,
        location: &Location,
        payload_file: &Path,
    ) -> Result<()> {
        let invocation = self.parameter_invocation(
            [
                "parametermanager".to_string(),
                "parameters".to_string(),
                "versions".to_string(),
                "create".to_string(),
                version.to_string(),
                format!("--parameter={parameter}"),
                format!("--payload-data-from-file={}", payload_file.display()),
            ],
            location,
        );
        run_checked(self.runner.as_ref(), &invocation).await?;
        info!("created version {} of parameter {} ({})", version, parameter, location);
        Ok(())
    }

    pub async fn delete_parameter_version(
        &self,
        parameter: &str,
        version: &str,
        location: &Location,
    ) -> bool {
        let invocation = self.parameter_invocation(
            [
                "parametermanager".to_string(),
                "parameters".to_string(),
                "versions".to_string(),
                "delete".to_string(),
                version.to_string(),
                format!("--parameter={parameter}"),
                "--quiet".to_string(),
            ],
            location,
        );
        run_tolerant(self.runner.as_ref(), &invocation).await
    }

    pub async fn delete_parameter(&self, parameter: &str, location: &Location) -> bool {
        let invocation = self.parameter_invocation(
            ["parametermanager", "parameters", "delete", parameter, "--quiet"],
            location,
        );
        run_tolerant(self.runner.as_ref(), &invocation).await
    }

    // ---- GKE ------------------------------------------------------------

    /// Write credentials for `cluster` into the `kubeconfig` file
    pub async fn fetch_cluster_credentials(
        &self,
        cluster: &str,
        zone: &str,
        kubeconfig: &Path,
    ) -> Result<()> {
        let invocation = self
            .invocation([
                "container".to_string(),
                "clusters".to_string(),
                "get-credentials".to_string(),
                cluster.to_string(),
                format!("--zone={zone}"),
            ])
            .env("KUBECONFIG", kubeconfig.display().to_string());
        run_checked(self.runner.as_ref(), &invocation).await?;
        info!("fetched credentials for cluster {} into {}", cluster, kubeconfig.display());
        Ok(())
    }
}
