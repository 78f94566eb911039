//! Consumed interfaces for the supervisor core.
//!
//! The core drives these collaborators but does not implement them (except
//! for the default script executor under `adapters`): the secret-store
//! issuing client, the task lifecycle, the environment updater, the check
//! registrar, and the script executor.

use std::collections::HashMap;

use async_trait::async_trait;
use nix::sys::signal::Signal;
use thiserror::Error;
use tokio::sync::mpsc;

use super::models::check::{CheckStatus, ExecOutput};
use super::models::credential::TaskIdentity;

/// Error returned by the credential issuing client.
///
/// Carries two orthogonal classification bits: whether the failure happened
/// server-side, and whether retrying can help. The supervisor bases its
/// fatal-vs-retry decisions entirely on these bits.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
    server_side: bool,
    recoverable: bool,
}

impl ClientError {
    pub fn new(message: impl Into<String>, server_side: bool, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            server_side,
            recoverable,
        }
    }

    /// A failure inside the issuing service itself.
    pub fn server_side(message: impl Into<String>) -> Self {
        Self::new(message, true, false)
    }

    /// A client-side failure that retrying cannot fix.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(message, false, false)
    }

    /// A transient failure worth retrying.
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::new(message, false, true)
    }

    pub fn is_server_side(&self) -> bool {
        self.server_side
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

/// Client for the central credential issuing service.
#[async_trait]
pub trait CredentialClient: Send + Sync {
    /// Derive fresh tokens for the named tasks of an allocation.
    ///
    /// Returns a map from task name to token.
    async fn derive_token(
        &self,
        identity: &TaskIdentity,
        tasks: &[String],
    ) -> Result<HashMap<String, String>, ClientError>;

    /// Begin renewing a token, extending its lifetime by `increment_secs`
    /// per renewal round.
    ///
    /// Returns a channel that carries at most one renewal failure; the
    /// channel closing without a message is also a failure.
    async fn renew_token(
        &self,
        token: &str,
        increment_secs: u64,
    ) -> Result<mpsc::Receiver<ClientError>, ClientError>;

    /// Stop renewing a token. Best effort; callers log and continue on
    /// failure.
    async fn stop_renew_token(&self, token: &str) -> Result<(), ClientError>;
}

/// Error delivering a lifecycle action to a task.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LifecycleError(pub String);

/// Control surface for the supervised task.
#[async_trait]
pub trait TaskLifecycle: Send + Sync {
    /// Deliver a signal to the task.
    async fn signal(&self, source: &str, reason: &str, signal: Signal)
        -> Result<(), LifecycleError>;

    /// Restart the task. `failure` marks whether the restart counts against
    /// the task's failure budget.
    async fn restart(&self, source: &str, reason: &str, failure: bool);

    /// Kill the task with a human-readable reason.
    async fn kill(&self, source: &str, reason: &str, failure: bool);
}

/// Propagates a token into the task's visible environment.
#[async_trait]
pub trait TokenUpdater: Send + Sync {
    async fn set_token(&self, token: &str, expose_in_env: bool);
}

/// Error reporting a check outcome to the registrar.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RegistrarError(pub String);

/// Receives health-check outcomes.
#[async_trait]
pub trait CheckRegistrar: Send + Sync {
    /// Record a fresh outcome for a TTL-style check.
    async fn update_ttl(
        &self,
        check_id: &str,
        output: &str,
        status: CheckStatus,
    ) -> Result<(), RegistrarError>;
}

/// Error from a script execution attempt.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to spawn script: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to wait for script: {0}")]
    Wait(#[source] std::io::Error),
}

/// Runs a health-check script once.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Execute `command` with `args` and collect its stdout and exit code.
    ///
    /// Implementations must terminate the child process when the returned
    /// future is dropped; the check runner drops it on timeout and on
    /// cancellation.
    async fn exec(&self, command: &str, args: &[String]) -> Result<ExecOutput, ExecError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        let err = ClientError::server_side("backend down");
        assert!(err.is_server_side());
        assert!(!err.is_recoverable());

        let err = ClientError::permanent("bad identity");
        assert!(!err.is_server_side());
        assert!(!err.is_recoverable());

        let err = ClientError::recoverable("connection reset");
        assert!(!err.is_server_side());
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "connection reset");
    }
}
