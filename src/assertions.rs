//! # Mounted State Assertions
//!
//! Helpers test bodies use to check what the driver mounted inside a pod.
//!
//! A mismatch is a [`TestFailure::Assertion`]; a failure to reach the pod at
//! all is a harness error and stops the run.

use crate::constants::{DATA_DIR_NAME, MOUNT_DIR};
use crate::error::{HarnessError, TestFailure, TestResult};
use crate::poll::poll_until;
use crate::tools::Kubectl;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Unix permission bits of a mounted file
///
/// Displayed as the 3-digit octal string `stat -c %a` prints. In templates
/// the mode is written as a YAML octal literal (`0440`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(u32);

impl FileMode {
    pub const fn new(bits: u32) -> Self {
        Self(bits & 0o777)
    }

    /// `0440`-style literal for manifests
    pub fn yaml_literal(self) -> String {
        format!("0{:03o}", self.0)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03o}", self.0)
    }
}

impl FromStr for FileMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.len() > 4 {
            return Err(HarnessError::parse("file mode", format!("`{s}`")));
        }
        u32::from_str_radix(s, 8)
            .ok()
            .filter(|bits| *bits <= 0o777)
            .map(Self)
            .ok_or_else(|| HarnessError::parse("file mode", format!("`{s}` is not an octal mode")))
    }
}

/// Path of a file under the pod's mount directory
pub fn mounted_path(file: &str) -> String {
    format!("{MOUNT_DIR}/{file}")
}

/// Literal path of a mounted file inside the atomic writer's data directory
pub fn data_path(file: &str) -> String {
    format!("{MOUNT_DIR}/{DATA_DIR_NAME}/{file}")
}

/// Compare the bytes of a mounted file with `expected`
pub async fn expect_file_content(
    kubectl: &Kubectl,
    pod: &str,
    file: &str,
    expected: &[u8],
) -> TestResult {
    let path = mounted_path(file);
    let actual = kubectl.read_file(pod, &path).await?;
    if actual != expected {
        return Err(TestFailure::Assertion(format!(
            "{pod}:{path} contains {:?}, expected {:?}",
            String::from_utf8_lossy(&actual),
            String::from_utf8_lossy(expected)
        )));
    }
    info!("✅ {}:{} has the expected content", pod, path);
    Ok(())
}

/// Compare the permission bits of a mounted file with `expected`
///
/// Stats the literal data path; the entry directly under the mount
/// directory is a symlink and always reports 777.
pub async fn expect_file_mode(
    kubectl: &Kubectl,
    pod: &str,
    file: &str,
    expected: FileMode,
) -> TestResult {
    let path = data_path(file);
    let reported = kubectl.file_mode(pod, &path).await?;
    let actual: FileMode = reported.parse()?;
    if actual != expected {
        return Err(TestFailure::Assertion(format!(
            "{pod}:{path} has mode {actual}, expected {expected}"
        )));
    }
    info!("✅ {}:{} has mode {}", pod, path, actual);
    Ok(())
}

/// Wait until a mounted file's bytes equal `expected`
///
/// Used after rotation: the driver rewrites the file on its own poll
/// interval, so the content is polled rather than read once.
pub async fn await_file_content(
    kubectl: &Kubectl,
    pod: &str,
    file: &str,
    expected: &[u8],
    timeout: Duration,
    interval: Duration,
) -> TestResult {
    let path = mounted_path(file);
    let path = path.as_str();
    let what = format!("{pod}:{path} to be rotated");
    let result = poll_until(&what, timeout, interval, || async move {
        Ok(kubectl.read_file(pod, path).await? == expected)
    })
    .await;

    match result {
        Ok(()) => {
            info!("✅ {}:{} picked up the new content", pod, path);
            Ok(())
        }
        Err(HarnessError::Timeout { .. }) => {
            let last = kubectl.read_file(pod, path).await?;
            Err(TestFailure::Assertion(format!(
                "{pod}:{path} still contains {:?} after {}s, expected {:?}",
                String::from_utf8_lossy(&last),
                timeout.as_secs(),
                String::from_utf8_lossy(expected)
            )))
        }
        Err(e) => Err(e.into()),
    }
}
