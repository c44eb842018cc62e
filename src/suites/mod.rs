//! # Suites
//!
//! A suite owns the cloud resources its tests need and an ordered list of
//! test bodies.
//!
//! - [`secretmanager`]: global and regional secrets, key extraction,
//!   rotation, invalid paths
//! - [`parametermanager`]: YAML and JSON parameter versions in both
//!   localities, rendered content and per-file modes

pub mod parametermanager;
pub mod secretmanager;

use crate::error::{Result, TestResult};
use crate::fixture::Fixture;
use async_trait::async_trait;
use clap::ValueEnum;
use futures::future::BoxFuture;
use std::fmt;
use std::str::FromStr;

pub use parametermanager::ParameterManagerSuite;
pub use secretmanager::SecretManagerSuite;

/// Body of one test; borrows the fixture read-only
pub type TestFn = for<'a> fn(&'a Fixture) -> BoxFuture<'a, TestResult>;

/// One named test body
#[derive(Clone, Copy)]
pub struct TestCase {
    pub name: &'static str,
    pub run: TestFn,
}

impl TestCase {
    pub const fn new(name: &'static str, run: TestFn) -> Self {
        Self { name, run }
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// A named group of tests sharing provisioned resources
#[async_trait]
pub trait Suite: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Create every remote resource the tests read
    async fn provision(&self, fixture: &mut Fixture) -> Result<()>;

    /// Tests in execution order
    fn tests(&self) -> Vec<TestCase>;

    /// Delete every resource [`Suite::provision`] may have created
    ///
    /// Best-effort and idempotent; returns the number of cleanup commands that
    /// failed.
    async fn teardown(&self, fixture: &Fixture) -> usize;
}

/// Which suites a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SuiteSelection {
    #[default]
    All,
    #[value(name = "secretmanager")]
    SecretManager,
    #[value(name = "parametermanager")]
    ParameterManager,
}

impl SuiteSelection {
    pub fn as_str(self) -> &'static str {
        match self {
            SuiteSelection::All => "all",
            SuiteSelection::SecretManager => "secretmanager",
            SuiteSelection::ParameterManager => "parametermanager",
        }
    }

    /// Suites to run, in order
    pub fn suites(self) -> Vec<Box<dyn Suite>> {
        match self {
            SuiteSelection::All => vec![
                Box::new(SecretManagerSuite),
                Box::new(ParameterManagerSuite),
            ],
            SuiteSelection::SecretManager => vec![Box::new(SecretManagerSuite)],
            SuiteSelection::ParameterManager => vec![Box::new(ParameterManagerSuite)],
        }
    }
}

impl fmt::Display for SuiteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuiteSelection {
    type Err = String;

    /// Accepts the `E2E_TEST_SUITE` values; empty means every suite
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(SuiteSelection::All),
            "secretmanager" => Ok(SuiteSelection::SecretManager),
            "parametermanager" => Ok(SuiteSelection::ParameterManager),
            other => Err(format!(
                "unknown suite `{other}` (expected secretmanager, parametermanager or all)"
            )),
        }
    }
}
