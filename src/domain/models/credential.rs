//! Credential declarations for supervised tasks.

use std::fmt;
use std::str::FromStr;

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// How a task reacts when its credential token is rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMode {
    /// Deliver the configured signal to the task.
    Signal,
    /// Request a non-failure restart of the task.
    Restart,
    /// Adopt the new token internally without touching the task.
    Noop,
    /// Unrecognized mode from a newer configuration. Treated like noop with
    /// an error log so forward-compatible configs don't tear down tasks.
    #[serde(other)]
    Unknown,
}

impl Default for ChangeMode {
    fn default() -> Self {
        Self::Restart
    }
}

impl ChangeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Restart => "restart",
            Self::Noop => "noop",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ChangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-task credential requirement.
///
/// Declares that a task needs a secret-store token and how the task should
/// be told about rotations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSpec {
    /// Reaction applied when the token is rotated.
    pub change_mode: ChangeMode,
    /// Signal name delivered on rotation; only consulted with
    /// `ChangeMode::Signal`.
    pub change_signal: Option<String>,
    /// Whether the consumer wants the token exposed in its environment.
    /// Opaque to the core; forwarded to the environment updater.
    pub env: bool,
}

impl CredentialSpec {
    /// Spec that signals the task on rotation.
    pub fn with_signal(signal: impl Into<String>) -> Self {
        Self {
            change_mode: ChangeMode::Signal,
            change_signal: Some(signal.into()),
            env: false,
        }
    }

    /// Spec that restarts the task on rotation.
    pub fn restart() -> Self {
        Self {
            change_mode: ChangeMode::Restart,
            ..Default::default()
        }
    }

    /// Spec that leaves the task alone on rotation.
    pub fn noop() -> Self {
        Self {
            change_mode: ChangeMode::Noop,
            ..Default::default()
        }
    }
}

/// Identity of a supervised task: the allocation it belongs to plus its
/// name within the allocation. Opaque to the core; passed verbatim to the
/// issuing client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskIdentity {
    pub alloc_id: Uuid,
    pub task: String,
}

impl TaskIdentity {
    pub fn new(alloc_id: Uuid, task: impl Into<String>) -> Self {
        Self {
            alloc_id,
            task: task.into(),
        }
    }
}

impl fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.alloc_id, self.task)
    }
}

/// Parse a platform signal name into a deliverable signal.
///
/// Accepts both `"SIGHUP"` and `"HUP"` spellings, case-insensitively.
pub fn parse_signal(name: &str) -> DomainResult<Signal> {
    let upper = name.trim().to_uppercase();
    let canonical = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };

    Signal::from_str(&canonical).map_err(|_| DomainError::InvalidSignal(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_mode_default_is_restart() {
        assert_eq!(ChangeMode::default(), ChangeMode::Restart);
    }

    #[test]
    fn test_change_mode_deserializes_unknown_values() {
        let mode: ChangeMode = serde_json_like("\"signal\"");
        assert_eq!(mode, ChangeMode::Signal);

        let mode: ChangeMode = serde_json_like("\"reload\"");
        assert_eq!(mode, ChangeMode::Unknown);
    }

    fn serde_json_like(raw: &str) -> ChangeMode {
        // toml has no bare top-level strings, so wrap in a table.
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ChangeMode,
        }
        let doc = format!("mode = {raw}");
        toml::from_str::<Wrapper>(&doc).unwrap().mode
    }

    #[test]
    fn test_parse_signal_with_and_without_prefix() {
        assert_eq!(parse_signal("SIGHUP").unwrap(), Signal::SIGHUP);
        assert_eq!(parse_signal("HUP").unwrap(), Signal::SIGHUP);
        assert_eq!(parse_signal("usr2").unwrap(), Signal::SIGUSR2);
    }

    #[test]
    fn test_parse_signal_rejects_garbage() {
        let err = parse_signal("NOTASIGNAL").unwrap_err();
        assert!(matches!(err, DomainError::InvalidSignal(_)));
        assert!(err.to_string().contains("NOTASIGNAL"));
    }

    #[test]
    fn test_credential_spec_presets() {
        let spec = CredentialSpec::with_signal("SIGHUP");
        assert_eq!(spec.change_mode, ChangeMode::Signal);
        assert_eq!(spec.change_signal.as_deref(), Some("SIGHUP"));

        assert_eq!(CredentialSpec::restart().change_mode, ChangeMode::Restart);
        assert_eq!(CredentialSpec::noop().change_mode, ChangeMode::Noop);
    }
}
