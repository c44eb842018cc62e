//! Outcome of one run.

use super::SuitePhase;
use chrono::{DateTime, Utc};
use std::process::ExitCode;
use tracing::{error, info, warn};

/// A test whose body returned a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTest {
    pub name: String,
    pub message: String,
}

/// Everything that happened during one run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub passed: Vec<String>,
    pub failed: Vec<FailedTest>,
    /// Tests that never ran because setup or an earlier test was fatal
    pub skipped: Vec<String>,
    /// Error that ended provisioning or execution early
    pub fatal: Option<String>,
    /// Cleanup commands that did not leave the remote state clean
    pub teardown_failures: usize,
    /// Teardown stages that panicked; these fail the run
    pub teardown_panics: Vec<String>,
    pub phases: Vec<SuitePhase>,
}

impl RunReport {
    pub(crate) fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            passed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            fatal: None,
            teardown_failures: 0,
            teardown_panics: Vec::new(),
            phases: Vec::new(),
        }
    }

    /// Count one teardown stage; a panic also counts as a failed cleanup
    pub(crate) fn record_teardown(&mut self, outcome: Result<usize, String>) {
        match outcome {
            Ok(failures) => self.teardown_failures += failures,
            Err(panic) => {
                self.teardown_failures += 1;
                self.teardown_panics.push(panic);
            }
        }
    }

    pub(crate) fn finish(&mut self, phases: Vec<SuitePhase>) {
        self.finished_at = Some(Utc::now());
        self.phases = phases;
    }

    /// No failed test, no fatal error and no panicking teardown
    ///
    /// Failed cleanup commands are reported but do not fail the run.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.fatal.is_none() && self.teardown_panics.is_empty()
    }

    /// Process exit status: 0 on success, 1 otherwise
    pub fn exit_status(&self) -> u8 {
        u8::from(!self.is_success())
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    pub fn log_summary(&self) {
        let elapsed = self
            .finished_at
            .map(|end| (end - self.started_at).num_seconds())
            .unwrap_or_default();
        info!(
            "run finished in {}s: {} passed, {} failed, {} skipped",
            elapsed,
            self.passed.len(),
            self.failed.len(),
            self.skipped.len()
        );
        for failure in &self.failed {
            error!("❌ {}: {}", failure.name, failure.message);
        }
        if let Some(fatal) = &self.fatal {
            error!("❌ run aborted: {}", fatal);
        }
        for panic in &self.teardown_panics {
            error!("❌ {}", panic);
        }
        if self.teardown_failures > 0 {
            warn!(
                "{} cleanup command(s) failed; remote resources may be orphaned",
                self.teardown_failures
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_run_succeeds() {
        let mut report = RunReport::start();
        report.passed.push("secretmanager::mount_global".to_string());
        report.finish(vec![SuitePhase::Uninitialized, SuitePhase::Done]);
        assert!(report.is_success());
        assert_eq!(report.exit_status(), 0);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_any_failure_is_nonzero() {
        let mut report = RunReport::start();
        report.failed.push(FailedTest {
            name: "parametermanager::global_modes".to_string(),
            message: "mode 644, expected 420".to_string(),
        });
        assert_eq!(report.exit_status(), 1);

        let mut report = RunReport::start();
        report.fatal = Some("timed out".to_string());
        assert_eq!(report.exit_status(), 1);
    }

    #[test]
    fn test_teardown_failures_do_not_fail_the_run() {
        let mut report = RunReport::start();
        report.teardown_failures = 3;
        assert!(report.is_success());
    }

    #[test]
    fn test_teardown_panic_fails_the_run() {
        let mut report = RunReport::start();
        report.record_teardown(Ok(2));
        assert!(report.is_success());

        report.record_teardown(Err("teardown of cluster panicked: boom".to_string()));
        assert_eq!(report.teardown_failures, 3);
        assert!(!report.is_success());
        assert_eq!(report.exit_status(), 1);
    }
}
