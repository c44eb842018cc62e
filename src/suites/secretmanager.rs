//! # Secret Manager Suite
//!
//! Mounts global and regional secrets, extracts a JSON key, rotates secrets
//! under a live mount and checks that a malformed path is rejected.

use super::{Suite, TestCase};
use crate::assertions::{await_file_content, expect_file_content};
use crate::constants::INVALID_PATH_EVENT;
use crate::error::{HarnessError, Result, TestFailure, TestResult};
use crate::fixture::{unique_name, Fixture};
use crate::payload::{credentials_payload, extract_key, PayloadFormat, EXTRACTED_KEY};
use crate::poll::poll_until;
use crate::tools::{events_mention, is_pod_ready};
use async_trait::async_trait;
use futures::future::BoxFuture;
use paths::Location;
use tracing::info;

pub const MOUNT_GLOBAL_TEMPLATE: &str = "sm-mount-global.yaml.tmpl";
pub const MOUNT_GLOBAL_POD: &str = "sm-mount-global";
pub const MOUNT_REGIONAL_TEMPLATE: &str = "sm-mount-regional.yaml.tmpl";
pub const MOUNT_REGIONAL_POD: &str = "sm-mount-regional";
pub const EXTRACT_TEMPLATE: &str = "sm-extract-key.yaml.tmpl";
pub const EXTRACT_POD: &str = "sm-extract-key";
pub const ROTATION_TEMPLATE: &str = "sm-rotation.yaml.tmpl";
pub const ROTATION_POD: &str = "sm-rotation";
pub const INVALID_PATH_TEMPLATE: &str = "sm-invalid-path.yaml.tmpl";
pub const INVALID_PATH_POD: &str = "sm-invalid-path";

/// Version count a rotated secret must reach before its mount is checked
const ROTATED_VERSION_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct SecretManagerSuite;

/// Every secret the suite creates, with its locality
fn secrets(fixture: &Fixture) -> [(String, Location); 5] {
    let ids = &fixture.ids;
    let regional = fixture.regional();
    [
        (ids.test_secret.clone(), Location::Global),
        (ids.rotation_secret.clone(), Location::Global),
        (ids.extract_secret.clone(), Location::Global),
        (ids.regional_secret.clone(), regional.clone()),
        (ids.regional_rotation_secret.clone(), regional),
    ]
}

#[async_trait]
impl Suite for SecretManagerSuite {
    fn name(&self) -> &'static str {
        "secretmanager"
    }

    async fn provision(&self, fixture: &mut Fixture) -> Result<()> {
        for (secret, location) in secrets(fixture) {
            let payload = if secret == fixture.ids.extract_secret {
                credentials_payload(PayloadFormat::Json, &unique_name("password"))
            } else {
                unique_name("secret-value")
            };
            let file = fixture.store_payload(&secret, payload)?;
            fixture.gcloud().create_secret(&secret, &location, &file).await?;
        }
        Ok(())
    }

    fn tests(&self) -> Vec<TestCase> {
        vec![
            TestCase::new("mount_global", mount_global),
            TestCase::new("mount_regional", mount_regional),
            TestCase::new("extract_json_key", extract_json_key),
            TestCase::new("rotation", rotation),
            TestCase::new("invalid_path", invalid_path),
        ]
    }

    async fn teardown(&self, fixture: &Fixture) -> usize {
        let mut failures = 0;
        for (secret, location) in secrets(fixture) {
            if !fixture.gcloud().delete_secret(&secret, &location).await {
                failures += 1;
            }
        }
        failures
    }
}

fn mount_global(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(async move {
        fixture
            .deploy_pod(MOUNT_GLOBAL_TEMPLATE, MOUNT_GLOBAL_POD)
            .await?;
        let secret = &fixture.ids.test_secret;
        expect_file_content(
            fixture.kubectl(),
            MOUNT_GLOBAL_POD,
            secret,
            fixture.payload(secret)?,
        )
        .await
    })
}

fn mount_regional(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(async move {
        fixture
            .deploy_pod(MOUNT_REGIONAL_TEMPLATE, MOUNT_REGIONAL_POD)
            .await?;
        let secret = &fixture.ids.regional_secret;
        expect_file_content(
            fixture.kubectl(),
            MOUNT_REGIONAL_POD,
            secret,
            fixture.payload(secret)?,
        )
        .await
    })
}

/// `extractJSONKey: user` mounts only the value of `user`
fn extract_json_key(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(async move {
        fixture.deploy_pod(EXTRACT_TEMPLATE, EXTRACT_POD).await?;
        let secret = &fixture.ids.extract_secret;
        let expected = extract_key(fixture.payload(secret)?, PayloadFormat::Json, EXTRACTED_KEY)?;
        expect_file_content(fixture.kubectl(), EXTRACT_POD, secret, &expected).await
    })
}

/// Add a version under a live mount and wait for the driver to pick it up
fn rotation(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(async move {
        fixture.deploy_pod(ROTATION_TEMPLATE, ROTATION_POD).await?;
        let targets = [
            (fixture.ids.rotation_secret.as_str(), Location::Global),
            (fixture.ids.regional_rotation_secret.as_str(), fixture.regional()),
        ];

        for (secret, _) in &targets {
            expect_file_content(
                fixture.kubectl(),
                ROTATION_POD,
                secret,
                fixture.payload(secret)?,
            )
            .await?;
        }
        let mut failures = Vec::new();
        for (secret, location) in &targets {
            match rotate(fixture, secret, location).await {
                Ok(()) => {}
                Err(TestFailure::Assertion(message)) => failures.push(message),
                Err(fatal) => return Err(fatal),
            }
        }
        if !failures.is_empty() {
            crate::fail!("{}", failures.join("; "));
        }
        Ok(())
    })
}

async fn rotate(fixture: &Fixture, secret: &str, location: &Location) -> TestResult {
    let timings = &fixture.config.timings;
    let rotated = unique_name("rotated-value");
    let file = fixture.write_payload_file(secret, rotated.as_bytes())?;
    fixture
        .gcloud()
        .add_secret_version(secret, location, &file)
        .await?;

    let gcloud = fixture.gcloud();
    poll_until(
        &format!("{secret} to list {ROTATED_VERSION_COUNT} versions"),
        timings.version_poll_timeout,
        timings.poll_interval,
        || async move {
            Ok(gcloud.secret_version_count(secret, location).await? >= ROTATED_VERSION_COUNT)
        },
    )
    .await?;

    await_file_content(
        fixture.kubectl(),
        ROTATION_POD,
        secret,
        rotated.as_bytes(),
        timings.rotation_timeout,
        timings.poll_interval,
    )
    .await
}

/// A `../` path must surface as a mount failure event and keep the pod unready
fn invalid_path(fixture: &Fixture) -> BoxFuture<'_, TestResult> {
    Box::pin(async move {
        fixture
            .apply_pod(INVALID_PATH_TEMPLATE, INVALID_PATH_POD)
            .await?;
        let kubectl = fixture.kubectl();
        let timings = &fixture.config.timings;

        let observed = poll_until(
            &format!("an `{INVALID_PATH_EVENT}` event for {INVALID_PATH_POD}"),
            timings.pod_ready_timeout,
            timings.poll_interval,
            || async move {
                let events = kubectl.events_for(INVALID_PATH_POD).await?;
                Ok(events_mention(&events, INVALID_PATH_EVENT))
            },
        )
        .await;
        match observed {
            Ok(()) => {}
            Err(HarnessError::Timeout { timeout, .. }) => crate::fail!(
                "no event mentioning `{}` for {} within {}s",
                INVALID_PATH_EVENT,
                INVALID_PATH_POD,
                timeout.as_secs()
            ),
            Err(e) => return Err(e.into()),
        }

        let pod = kubectl.get_pod(INVALID_PATH_POD).await?;
        if is_pod_ready(&pod) {
            crate::fail!("{} became Ready despite an invalid path", INVALID_PATH_POD);
        }
        info!("✅ {} rejected with `{}`", INVALID_PATH_POD, INVALID_PATH_EVENT);
        Ok(())
    })
}
