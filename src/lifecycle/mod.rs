//! # Lifecycle
//!
//! Drives one run: provision the cluster and every selected suite, execute
//! the tests in order, then tear everything down.
//!
//! - Setup errors and panics skip straight to teardown.
//! - An assertion failure fails one test; the next test still runs.
//! - A harness error or panic inside a test skips the remaining tests.
//! - Teardown runs once provisioning has begun, whatever happened before.
//!   Failed cleanup commands are only counted; a panicking teardown fails
//!   the run.

mod phase;
mod report;

pub use phase::SuitePhase;
pub use report::{FailedTest, RunReport};

use crate::error::{HarnessError, Result, TestFailure};
use crate::fixture::Fixture;
use crate::observability::metrics;
use crate::suites::{Suite, TestCase};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

/// Infrastructure shared by every suite (the test cluster and its driver)
#[async_trait]
pub trait Provisioner: Send + Sync + Debug {
    async fn provision(&self, fixture: &mut Fixture) -> Result<()>;

    /// Best-effort; returns the number of cleanup commands that failed
    async fn teardown(&self, fixture: &Fixture) -> usize;
}

/// Owns the phase of one run
#[derive(Debug)]
pub struct Coordinator {
    phase: SuitePhase,
    history: Vec<SuitePhase>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            phase: SuitePhase::Uninitialized,
            history: vec![SuitePhase::Uninitialized],
        }
    }

    pub fn phase(&self) -> SuitePhase {
        self.phase
    }

    fn advance(&mut self, next: SuitePhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(HarnessError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        info!("phase {} -> {}", self.phase, next);
        self.phase = next;
        self.history.push(next);
        Ok(())
    }

    /// Run every suite against `infrastructure` and report what happened
    pub async fn run(
        mut self,
        fixture: &mut Fixture,
        infrastructure: &dyn Provisioner,
        suites: &[Box<dyn Suite>],
    ) -> RunReport {
        let span = info_span!("e2e_run", cluster = %fixture.cluster_name);
        async move {
            let mut report = RunReport::start();

            match self.setup(fixture, infrastructure, suites).await {
                Ok(()) => {
                    if let Err(e) = self.execute(fixture, suites, &mut report).await {
                        report.fatal = Some(e.to_string());
                    }
                }
                Err(e) => {
                    error!("❌ setup failed: {}", e);
                    report.fatal = Some(e.to_string());
                    for (suite, test) in planned_tests(suites) {
                        metrics::increment_tests(suite, "skipped");
                        report.skipped.push(qualified_name(suite, &test));
                    }
                }
            }

            if self.phase.requires_teardown() {
                if let Err(e) = self.advance(SuitePhase::TearingDown) {
                    error!("❌ {}", e);
                }
                self.teardown(fixture, infrastructure, suites, &mut report).await;
                if let Err(e) = self.advance(SuitePhase::Done) {
                    error!("❌ {}", e);
                }
            }

            report.finish(self.history);
            report
        }
        .instrument(span)
        .await
    }

    async fn setup(
        &mut self,
        fixture: &mut Fixture,
        infrastructure: &dyn Provisioner,
        suites: &[Box<dyn Suite>],
    ) -> Result<()> {
        self.advance(SuitePhase::Provisioning)?;
        let started = Instant::now();

        guarded("cluster provisioning", infrastructure.provision(fixture)).await?;
        for suite in suites {
            let stage = format!("{} provisioning", suite.name());
            guarded(&stage, suite.provision(fixture))
                .instrument(info_span!("provision", suite = suite.name()))
                .await?;
            info!("✅ {} resources provisioned", suite.name());
        }

        metrics::observe_setup_duration(started.elapsed().as_secs_f64());
        self.advance(SuitePhase::Ready)
    }

    async fn execute(
        &mut self,
        fixture: &Fixture,
        suites: &[Box<dyn Suite>],
        report: &mut RunReport,
    ) -> Result<()> {
        self.advance(SuitePhase::Executing)?;

        let mut tests = planned_tests(suites).into_iter();
        while let Some((suite, test)) = tests.next() {
            let name = qualified_name(suite, &test);
            info!("▶️  {}", name);
            let started = Instant::now();
            let outcome = guarded(&name, (test.run)(fixture))
                .instrument(info_span!("test", name = %name))
                .await;
            metrics::observe_test_duration(suite, started.elapsed().as_secs_f64());

            match outcome {
                Ok(()) => {
                    info!("✅ {} passed", name);
                    metrics::increment_tests(suite, "passed");
                    report.passed.push(name);
                }
                Err(TestFailure::Assertion(message)) => {
                    error!("❌ {} failed: {}", name, message);
                    metrics::increment_tests(suite, "failed");
                    report.failed.push(FailedTest { name, message });
                }
                Err(TestFailure::Harness(e)) => {
                    error!("❌ {} aborted the run: {}", name, e);
                    metrics::increment_tests(suite, "failed");
                    report.failed.push(FailedTest {
                        name,
                        message: e.to_string(),
                    });
                    for (suite, test) in tests {
                        warn!("skipping {}", qualified_name(suite, &test));
                        metrics::increment_tests(suite, "skipped");
                        report.skipped.push(qualified_name(suite, &test));
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Suites in reverse order, then the cluster
    async fn teardown(
        &self,
        fixture: &Fixture,
        infrastructure: &dyn Provisioner,
        suites: &[Box<dyn Suite>],
        report: &mut RunReport,
    ) {
        for suite in suites.iter().rev() {
            report.record_teardown(guarded_teardown(suite.name(), suite.teardown(fixture)).await);
        }
        report.record_teardown(guarded_teardown("cluster", infrastructure.teardown(fixture)).await);

        metrics::increment_teardown_failures(report.teardown_failures);
        if report.teardown_failures == 0 {
            info!("✅ teardown complete");
        }
    }
}

fn planned_tests(suites: &[Box<dyn Suite>]) -> Vec<(&'static str, TestCase)> {
    suites
        .iter()
        .flat_map(|suite| {
            let name = suite.name();
            suite.tests().into_iter().map(move |test| (name, test))
        })
        .collect()
}

fn qualified_name(suite: &str, test: &TestCase) -> String {
    format!("{suite}::{}", test.name)
}

/// Await `future`, turning a panic into [`HarnessError::Panicked`]
async fn guarded<T, E, F>(stage: &str, future: F) -> std::result::Result<T, E>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: From<HarnessError>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(HarnessError::Panicked {
            stage: stage.to_string(),
            message: panic_message(panic.as_ref()),
        }
        .into()),
    }
}

/// Await a teardown, returning its failure count or the panic it raised
async fn guarded_teardown<F>(stage: &str, future: F) -> std::result::Result<usize, String>
where
    F: Future<Output = usize>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(failures) => Ok(failures),
        Err(panic) => {
            let message = format!(
                "teardown of {} panicked: {}",
                stage,
                panic_message(panic.as_ref())
            );
            error!("❌ {}", message);
            Err(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
