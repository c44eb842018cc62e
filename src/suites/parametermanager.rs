//! # Parameter Manager Suite
//!
//! One parameter per {YAML, JSON} x {global, regional}. Every parameter
//! version references a secret in its own locality, so the mounted file is
//! the rendered payload, not the raw one.
//!
//! Each mounted version carries its own file mode, and the mode is checked
//! on the literal data path.

use super::{Suite, TestCase};
use crate::assertions::{expect_file_content, expect_file_mode, FileMode};
use crate::constants::SECRET_ACCESSOR_ROLE;
use crate::error::{Result, TestResult};
use crate::fixture::{unique_name, Fixture};
use crate::payload::{
    extract_key, parameter_payload, rendered_parameter, PayloadFormat, EXTRACTED_KEY,
};
use crate::poll::settle;
use async_trait::async_trait;
use futures::future::BoxFuture;
use paths::{secret_reference, Location};

pub const YAML_GLOBAL_MODE: FileMode = FileMode::new(0o420);
pub const JSON_GLOBAL_MODE: FileMode = FileMode::new(0o600);
pub const YAML_REGIONAL_MODE: FileMode = FileMode::new(0o400);
pub const JSON_REGIONAL_MODE: FileMode = FileMode::new(0o440);

pub const MOUNT_GLOBAL_TEMPLATE: &str = "pm-mount-global.yaml.tmpl";
pub const MOUNT_GLOBAL_POD: &str = "pm-mount-global";
pub const MOUNT_REGIONAL_TEMPLATE: &str = "pm-mount-regional.yaml.tmpl";
pub const MOUNT_REGIONAL_POD: &str = "pm-mount-regional";

/// Secret version every parameter payload references
const REFERENCED_SECRET_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterManagerSuite;

/// One parameter, its single version, and where it is mounted
#[derive(Debug, Clone)]
struct MountedVersion {
    parameter: String,
    version: String,
    format: PayloadFormat,
    location: Location,
    /// Secret the payload references, same locality as the parameter
    secret: String,
    mode: FileMode,
    template: &'static str,
    pod: &'static str,
}

impl MountedVersion {
    fn all(fixture: &Fixture) -> [Self; 4] {
        let ids = &fixture.ids;
        let region = fixture.regional();
        let global = |parameter: &str, version: &str, format, mode| MountedVersion {
            parameter: parameter.to_string(),
            version: version.to_string(),
            format,
            location: Location::Global,
            secret: ids.param_secret.clone(),
            mode,
            template: MOUNT_GLOBAL_TEMPLATE,
            pod: MOUNT_GLOBAL_POD,
        };
        let regional = |parameter: &str, version: &str, format, mode| MountedVersion {
            parameter: parameter.to_string(),
            version: version.to_string(),
            format,
            location: region.clone(),
            secret: ids.regional_param_secret.clone(),
            mode,
            template: MOUNT_REGIONAL_TEMPLATE,
            pod: MOUNT_REGIONAL_POD,
        };
        [
            global(&ids.yaml_parameter, &ids.yaml_version, PayloadFormat::Yaml, YAML_GLOBAL_MODE),
            global(&ids.json_parameter, &ids.json_version, PayloadFormat::Json, JSON_GLOBAL_MODE),
            regional(
                &ids.regional_yaml_parameter,
                &ids.regional_yaml_version,
                PayloadFormat::Yaml,
                YAML_REGIONAL_MODE,
            ),
            regional(
                &ids.regional_json_parameter,
                &ids.regional_json_version,
                PayloadFormat::Json,
                JSON_REGIONAL_MODE,
            ),
        ]
    }

    fn in_locality(fixture: &Fixture, regional: bool) -> Vec<Self> {
        Self::all(fixture)
            .into_iter()
            .filter(|v| v.location.is_regional() == regional)
            .collect()
    }

    /// File the version's `user` key is extracted into
    fn extracted_file(&self) -> String {
        format!("{}-{EXTRACTED_KEY}", self.parameter)
    }
}

/// Referenced secrets, one per locality
fn secrets(fixture: &Fixture) -> [(String, Location); 2] {
    [
        (fixture.ids.param_secret.clone(), Location::Global),
        (fixture.ids.regional_param_secret.clone(), fixture.regional()),
    ]
}

#[async_trait]
impl Suite for ParameterManagerSuite {
    fn name(&self) -> &'static str {
        "parametermanager"
    }

    async fn provision(&self, fixture: &mut Fixture) -> Result<()> {
        for (secret, location) in secrets(fixture) {
            let file = fixture.store_payload(&secret, unique_name("param-secret-value"))?;
            fixture.gcloud().create_secret(&secret, &location, &file).await?;
        }

        let versions = MountedVersion::all(fixture);
        for v in &versions {
            let gcloud = fixture.gcloud();
            gcloud
                .create_parameter(&v.parameter, &v.location, v.format)
                .await?;
            let principal = gcloud.parameter_principal(&v.parameter, &v.location).await?;
            gcloud
                .grant_secret_access(&v.secret, &v.location, &principal, SECRET_ACCESSOR_ROLE)
                .await?;
        }

        // Nothing observable reports that the bindings are effective.
        settle(
            fixture.config.timings.iam_propagation,
            "IAM propagation for parameter principals (fixed wait)",
        )
        .await;

        let project = fixture.config.project_id.clone();
        for v in &versions {
            let reference =
                secret_reference(&project, &v.location, &v.secret, REFERENCED_SECRET_VERSION);
            let file = fixture.write_payload_file(
                &v.version,
                parameter_payload(v.format, &reference).as_bytes(),
            )?;
            fixture
                .gcloud()
                .create_parameter_version(&v.parameter, &v.version, &v.location, &file)
                .await?;

            let secret_value = String::from_utf8_lossy(fixture.payload(&v.secret)?).into_owned();
            fixture.record_payload(&v.version, rendered_parameter(v.format, &secret_value));
        }
        Ok(())
    }

    fn tests(&self) -> Vec<TestCase> {
        vec![
            TestCase::new("mount_global_versions", mount_global_versions),
            TestCase::new("global_file_modes", global_file_modes),
            TestCase::new("mount_regional_versions", mount_regional_versions),
            TestCase::new("regional_file_modes", regional_file_modes),
            TestCase::new("extract_keys", extract_keys),
        ]
    }

    async fn teardown(&self, fixture: &Fixture) -> usize {
        let gcloud = fixture.gcloud();
        let mut failures = 0;
        for v in MountedVersion::all(fixture) {
            if !gcloud
                .delete_parameter_version(&v.parameter, &v.version, &v.location)
                .await
            {
                failures += 1;
            }
            if !gcloud.delete_parameter(&v.parameter, &v.location).await {
                failures += 1;
            }
        }
        for (secret, location) in secrets(fixture) {
            if !gcloud.delete_secret(&secret, &location).await {
                failures += 1;
            }
        }
        failures
    }
}

async fn expect_rendered_versions(fixture: &Fixture, regional: bool) -> TestResult {
    for v in MountedVersion::in_locality(fixture, regional) {
        fixture.deploy_pod(v.template, v.pod).await?;
        expect_file_content(
            fixture.kubectl(),
            v.pod,
            &v.parameter,
            fixture.payload(&v.version)?,
        )
        .await?;
    }
    Ok(())
}

async fn expect_modes(fixture: &Fixture, regional: bool) -> TestResult {
    for v in MountedVersion::in_locality(fixture, regional) {
        fixture.deploy_pod(v.template, v.pod).await?;
        expect_file_mode(fixture.kubectl(), v.pod, &v.parameter, v.mode).await?;
    }
    Ok(())
}

fn mount_global_versions(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(expect_rendered_versions(fixture, false))
}

fn global_file_modes(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(expect_modes(fixture, false))
}

fn mount_regional_versions(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(expect_rendered_versions(fixture, true))
}

fn regional_file_modes(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(expect_modes(fixture, true))
}

/// `extractYAMLKey` / `extractJSONKey` on rendered versions
fn extract_keys(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(async move {
        for v in MountedVersion::all(fixture) {
            fixture.deploy_pod(v.template, v.pod).await?;
            let expected = extract_key(fixture.payload(&v.version)?, v.format, EXTRACTED_KEY)?;
            expect_file_content(fixture.kubectl(), v.pod, &v.extracted_file(), &expected).await?;
        }
        Ok(())
    })
}
