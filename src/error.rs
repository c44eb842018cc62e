//! # Error Types
//!
//! Two classes of failure flow through the harness:
//!
//! - [`HarnessError`]: infrastructure failures (configuration, subprocesses,
//!   timeouts, I/O). These are fatal to the current run and always route
//!   through teardown.
//! - [`TestFailure`]: what a test body returns. An `Assertion` fails only that
//!   test; a wrapped `HarnessError` aborts the remaining tests.

use crate::lifecycle::SuitePhase;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Infrastructure error raised by setup, teardown, or CLI plumbing
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("invalid value for {key}: {message}")]
    InvalidEnv { key: &'static str, message: String },

    #[error("required tool `{tool}` not found on PATH: {source}")]
    MissingTool {
        tool: &'static str,
        #[source]
        source: which::Error,
    },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("timed out after {}s waiting for {what}", timeout.as_secs())]
    Timeout { what: String, timeout: Duration },

    #[error("rendered {path} still contains tokens: {}", tokens.join(", "))]
    UnexpandedTokens { path: String, tokens: Vec<String> },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition { from: SuitePhase, to: SuitePhase },

    #[error("panic during {stage}: {message}")]
    Panicked { stage: String, message: String },
}

impl HarnessError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        HarnessError::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Outcome of a failed test body
#[derive(Debug, Error)]
pub enum TestFailure {
    /// Observed state did not match expectations; the run continues
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// Infrastructure failed mid-test; the run proceeds straight to teardown
    #[error(transparent)]
    Harness(#[from] HarnessError),
}

impl TestFailure {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TestFailure::Harness(_))
    }
}

pub type TestResult = std::result::Result<(), TestFailure>;

/// Fail the current test with a formatted message
#[macro_export]
macro_rules! fail {
    ($($arg:tt)*) => {
        return Err($crate::error::TestFailure::Assertion(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_message_carries_output() {
        let error = HarnessError::CommandFailed {
            command: "gcloud secrets create s".to_string(),
            status: "exit status: 1".to_string(),
            output: "ERROR: permission denied".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("gcloud secrets create s"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn test_timeout_message_in_seconds() {
        let error = HarnessError::Timeout {
            what: "pod/sm-global Ready".to_string(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(
            error.to_string(),
            "timed out after 300s waiting for pod/sm-global Ready"
        );
    }

    #[test]
    fn test_failure_classification() {
        assert!(!TestFailure::Assertion("mismatch".to_string()).is_fatal());
        assert!(TestFailure::from(HarnessError::MissingEnv("PROJECT_ID")).is_fatal());
    }
}
