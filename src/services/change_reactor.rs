//! Task-side reaction to credential rotation.

use std::sync::Arc;

use tracing::error;

use crate::domain::models::credential::{parse_signal, ChangeMode, CredentialSpec};
use crate::domain::ports::TaskLifecycle;

/// Result of applying a change mode to a rotated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactOutcome {
    /// The reaction was delivered (or deliberately skipped); keep
    /// supervising.
    Applied,
    /// The reaction failed; the task has already been killed.
    Fatal,
}

/// Applies the configured change mode when a rotated token becomes
/// known-renewable.
pub struct ChangeReactor {
    source: &'static str,
    spec: CredentialSpec,
    lifecycle: Arc<dyn TaskLifecycle>,
}

impl ChangeReactor {
    pub fn new(
        source: &'static str,
        spec: CredentialSpec,
        lifecycle: Arc<dyn TaskLifecycle>,
    ) -> Self {
        Self {
            source,
            spec,
            lifecycle,
        }
    }

    /// Apply the configured change mode for a freshly rotated token.
    ///
    /// Signal parse or delivery failures kill the task; an unusable change
    /// configuration must not leave the task running with a token it was
    /// never told about.
    pub async fn apply(&self) -> ReactOutcome {
        match self.spec.change_mode {
            ChangeMode::Signal => {
                let name = self.spec.change_signal.as_deref().unwrap_or_default();
                let signal = match parse_signal(name) {
                    Ok(signal) => signal,
                    Err(err) => {
                        error!(error = %err, "Failed to parse change signal");
                        self.lifecycle
                            .kill(self.source, &format!("failed to parse signal: {err}"), true)
                            .await;
                        return ReactOutcome::Fatal;
                    }
                };

                if let Err(err) = self
                    .lifecycle
                    .signal(self.source, "new credential token acquired", signal)
                    .await
                {
                    error!(error = %err, "Failed to send change signal");
                    self.lifecycle
                        .kill(self.source, &format!("failed to send signal: {err}"), true)
                        .await;
                    return ReactOutcome::Fatal;
                }

                ReactOutcome::Applied
            }
            ChangeMode::Restart => {
                const NO_FAILURE: bool = false;
                self.lifecycle
                    .restart(self.source, "new credential token acquired", NO_FAILURE)
                    .await;
                ReactOutcome::Applied
            }
            ChangeMode::Noop | ChangeMode::Unknown => {
                error!(
                    mode = self.spec.change_mode.as_str(),
                    "Invalid change mode for credential rotation"
                );
                ReactOutcome::Applied
            }
        }
    }
}
