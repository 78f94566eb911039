//! Periodic script health checks with TTL reporting.
//!
//! One runner per check: executes the configured script on an interval with
//! a per-run deadline, classifies the outcome, and reports it to the check
//! registrar. On shutdown the runner performs one final execute-and-report
//! pass so the registrar lands in a terminal state before exit.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, error::Elapsed, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::models::check::{CheckStatus, ExecOutput, ServiceCheck};
use crate::domain::ports::{CheckRegistrar, ExecError, ScriptExecutor};

/// Handle to a running script check.
pub struct ScriptCheckHandle {
    cancel: CancellationToken,
    done: JoinHandle<()>,
}

impl ScriptCheckHandle {
    /// Stop the check immediately, aborting any in-flight script.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the check loop to exit.
    pub async fn wait(self) {
        let _ = self.done.await;
    }
}

/// Periodic executor for one external script health check.
pub struct ScriptCheck {
    alloc_id: Uuid,
    task: String,
    check_id: String,
    check: ServiceCheck,
    executor: Arc<dyn ScriptExecutor>,
    registrar: Arc<dyn CheckRegistrar>,
    shutdown: CancellationToken,
}

impl ScriptCheck {
    pub fn new(
        alloc_id: Uuid,
        task: impl Into<String>,
        check_id: impl Into<String>,
        check: ServiceCheck,
        executor: Arc<dyn ScriptExecutor>,
        registrar: Arc<dyn CheckRegistrar>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            alloc_id,
            task: task.into(),
            check_id: check_id.into(),
            check,
            executor,
            registrar,
            shutdown,
        }
    }

    /// Spawn the check loop, returning a handle to cancel or await it.
    pub fn run(self) -> ScriptCheckHandle {
        let cancel = CancellationToken::new();
        let done = tokio::spawn(self.run_loop(cancel.clone()));
        ScriptCheckHandle { cancel, done }
    }

    async fn run_loop(self, cancel: CancellationToken) {
        // A zero interval would make the timer panic.
        let interval = self.check.interval.max(Duration::from_millis(1));
        let mut timer = time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick fires immediately; afterwards each wait is one
            // full interval. Shutdown falls through to a final run so the
            // registrar sees a terminal report; cancellation exits at once.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = self.shutdown.cancelled() => {}
                _ = timer.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                outcome = time::timeout(
                    self.check.timeout,
                    self.executor.exec(&self.check.command, &self.check.args),
                ) => outcome,
            };
            let (output, status) = classify(outcome, self.check.timeout);

            debug!(
                alloc_id = %self.alloc_id,
                task = %self.task,
                check_id = %self.check_id,
                status = status.as_str(),
                "Script check executed"
            );

            if let Err(err) = self
                .registrar
                .update_ttl(&self.check_id, &output, status)
                .await
            {
                warn!(check_id = %self.check_id, error = %err, "Failed to update check TTL");
            }

            if self.shutdown.is_cancelled() {
                return;
            }
        }
    }
}

/// Classify one execution outcome into registrar output and status.
///
/// Any error, including a blown deadline, is critical with the error text as
/// output; otherwise the exit code decides and the output is the raw stdout.
fn classify(
    outcome: Result<Result<ExecOutput, ExecError>, Elapsed>,
    timeout: Duration,
) -> (String, CheckStatus) {
    match outcome {
        Err(_) => (
            format!("script check timed out after {timeout:?}"),
            CheckStatus::Critical,
        ),
        Ok(Err(err)) => (err.to_string(), CheckStatus::Critical),
        Ok(Ok(output)) => (
            String::from_utf8_lossy(&output.stdout).into_owned(),
            CheckStatus::from_exit_code(output.exit_code),
        ),
    }
}
