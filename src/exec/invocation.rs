//! # Invocations and Captured Output

use std::fmt;

/// One subprocess call: program, argument vector, extra environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Whether the argument vector contains `needle` as a whole argument
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of an invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn status(&self) -> String {
        match self.code {
            Some(code) => format!("exit status: {code}"),
            None => "terminated by signal".to_string(),
        }
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// stdout followed by stderr, lossily decoded
    pub fn combined(&self) -> String {
        let mut combined = String::from_utf8_lossy(&self.stdout).into_owned();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&String::from_utf8_lossy(&self.stderr));
        }
        combined
    }

    /// gcloud reports `NOT_FOUND`; kubectl reports `NotFound` / `not found`
    pub fn is_not_found(&self) -> bool {
        let text = self.combined();
        text.contains("NOT_FOUND") || text.contains("NotFound") || text.contains("not found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_arguments_with_spaces() {
        let invocation = Invocation::new("kubectl")
            .args(["exec", "sm-global", "--", "sh", "-c"])
            .arg("cat /var/gcp-test-secrets/a b");
        assert_eq!(
            invocation.to_string(),
            "kubectl exec sm-global -- sh -c 'cat /var/gcp-test-secrets/a b'"
        );
    }

    #[test]
    fn test_has_arg_matches_whole_arguments() {
        let invocation = Invocation::new("gcloud").args(["secrets", "delete", "--quiet"]);
        assert!(invocation.has_arg("--quiet"));
        assert!(!invocation.has_arg("quiet"));
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            code: Some(1),
            stdout: b"partial".to_vec(),
            stderr: b"ERROR: boom".to_vec(),
        };
        assert_eq!(output.combined(), "partial\nERROR: boom");
        assert!(!output.success());
        assert_eq!(output.status(), "exit status: 1");
    }

    #[test]
    fn test_not_found_detection() {
        assert!(CommandOutput::failed(1, "ERROR: (gcloud.secrets.delete) NOT_FOUND: Secret [x] not found")
            .is_not_found());
        assert!(CommandOutput::failed(1, "Error from server (NotFound): pods \"x\" not found")
            .is_not_found());
        assert!(!CommandOutput::failed(1, "PERMISSION_DENIED").is_not_found());
    }

    #[test]
    fn test_signal_status() {
        let output = CommandOutput {
            code: None,
            ..CommandOutput::default()
        };
        assert!(!output.success());
        assert_eq!(output.status(), "terminated by signal");
    }
}
