//! Script health-check descriptors and outcome classification.

use std::fmt;
use std::time::Duration;

/// Descriptor for one external script health check.
#[derive(Debug, Clone)]
pub struct ServiceCheck {
    /// Human-readable check name.
    pub name: String,
    /// Program to execute.
    pub command: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Time between executions.
    pub interval: Duration,
    /// Deadline for a single execution.
    pub timeout: Duration,
}

/// Health states reported to the check registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Passing,
    Warning,
    Critical,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passing => "passing",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Classify a script exit code: 0 passing, 1 warning, anything else
    /// critical.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Passing,
            1 => Self::Warning,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one script execution.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Raw bytes the script wrote to stdout.
    pub stdout: Vec<u8>,
    /// Process exit code; -1 when the process was terminated by a signal.
    pub exit_code: i32,
}
