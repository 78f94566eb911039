//! Per-task credential token supervision.
//!
//! Drives the derive -> persist -> renew -> react cycle for one task's
//! credential token: derive an initial token with bounded backoff, persist
//! it so it survives supervisor restarts, keep it alive through the issuing
//! client's renewal stream, and recover from renewal failures by deriving a
//! fresh token and applying the task's change mode.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::domain::models::credential::{ChangeMode, CredentialSpec, TaskIdentity};
use crate::domain::ports::{ClientError, CredentialClient, TaskLifecycle, TokenUpdater};
use crate::services::backoff::BackoffPolicy;
use crate::services::change_reactor::{ChangeReactor, ReactOutcome};
use crate::services::config::CredentialSettings;
use crate::services::token_future::TokenFuture;
use crate::services::token_store::TokenStore;

/// Event source reported to the task lifecycle for credential actions.
pub const CREDENTIAL_SOURCE: &str = "credentials";

/// Everything a [`TokenSupervisor`] needs to run.
pub struct TokenSupervisorConfig {
    pub identity: TaskIdentity,
    pub spec: CredentialSpec,
    pub client: Arc<dyn CredentialClient>,
    pub lifecycle: Arc<dyn TaskLifecycle>,
    pub updater: Arc<dyn TokenUpdater>,
    pub token_path: PathBuf,
    pub future: Arc<TokenFuture>,
    pub cancel: CancellationToken,
    pub settings: CredentialSettings,
}

/// Background supervisor for one task's credential token.
///
/// At most one supervisor runs per task; the owning hook spawns it exactly
/// once and cancels it when the task reaches its terminal lifecycle step.
pub struct TokenSupervisor {
    identity: TaskIdentity,
    spec: CredentialSpec,
    client: Arc<dyn CredentialClient>,
    lifecycle: Arc<dyn TaskLifecycle>,
    updater: Arc<dyn TokenUpdater>,
    store: TokenStore,
    token_path: PathBuf,
    future: Arc<TokenFuture>,
    cancel: CancellationToken,
    backoff: BackoffPolicy,
    renewal_increment_secs: u64,
    reactor: ChangeReactor,
    rotation_pending: bool,
}

impl TokenSupervisor {
    pub fn new(config: TokenSupervisorConfig) -> Self {
        let reactor = ChangeReactor::new(
            CREDENTIAL_SOURCE,
            config.spec.clone(),
            config.lifecycle.clone(),
        );
        Self {
            identity: config.identity,
            spec: config.spec,
            client: config.client,
            lifecycle: config.lifecycle,
            updater: config.updater,
            store: TokenStore,
            token_path: config.token_path,
            future: config.future,
            cancel: config.cancel,
            backoff: config.settings.backoff(),
            renewal_increment_secs: config.settings.renewal_increment_secs,
            reactor,
            rotation_pending: false,
        }
    }

    /// Run the supervision loop until cancellation or a fatal error.
    ///
    /// `token` optionally seeds the loop with a token recovered from disk;
    /// an empty seed triggers an initial derivation. Fatal paths kill the
    /// task through the lifecycle before returning.
    pub async fn run(mut self, mut token: String) {
        loop {
            if self.cancel.is_cancelled() {
                self.stop_renewal().await;
                return;
            }

            // The previous token (if any) is stale from here on.
            self.future.clear();

            if token.is_empty() {
                token = match self.derive_token().await {
                    Some(token) => token,
                    // Fatal or cancelled; any killing already happened.
                    None => return,
                };

                if let Err(err) = self.store.store(&self.token_path, &token).await {
                    error!(task = %self.identity, error = %err, "Failed to write token to disk");
                    self.lifecycle
                        .kill(CREDENTIAL_SOURCE, "failed to write token to disk", true)
                        .await;
                    return;
                }
            }

            // Start the renewal process. An error here means the token is
            // not being renewed; it is most likely invalid, so discard it
            // and derive a fresh one immediately rather than backing off.
            let mut renew_rx = match self
                .client
                .renew_token(&token, self.renewal_increment_secs)
                .await
            {
                Ok(rx) => rx,
                Err(err) => {
                    error!(task = %self.identity, error = %err, "Failed to start renewal of token");
                    token = String::new();
                    if self.spec.change_mode != ChangeMode::Noop {
                        self.rotation_pending = true;
                    }
                    continue;
                }
            };

            // The token is known-renewable now; publish it.
            self.future.set(&token);
            debug!(task = %self.identity, "Token published");

            if self.rotation_pending {
                if self.reactor.apply().await == ReactOutcome::Fatal {
                    return;
                }
                self.rotation_pending = false;
                self.updater.set_token(&token, self.spec.env).await;
            }

            // Watch for renewal failure, whichever way it is reported.
            tokio::select! {
                failure = renew_rx.recv() => {
                    match failure {
                        Some(err) => {
                            error!(task = %self.identity, error = %err, "Failed to renew token")
                        }
                        None => {
                            error!(task = %self.identity, "Renewal stream closed unexpectedly")
                        }
                    }

                    token = String::new();
                    self.stop_renewal().await;

                    if self.spec.change_mode != ChangeMode::Noop {
                        self.rotation_pending = true;
                    }
                }
                _ = self.cancel.cancelled() => {
                    self.stop_renewal().await;
                    return;
                }
            }
        }
    }

    /// Derive a token, retrying recoverable errors with bounded backoff.
    ///
    /// Returns `None` when the supervisor must exit: the task was killed for
    /// a fatal derivation error, or cancellation preempted the retry wait.
    /// The attempt counter is local to one derivation phase; a later phase
    /// starts over at the baseline delay.
    async fn derive_token(&self) -> Option<String> {
        let mut attempts: u32 = 0;
        loop {
            let result = self
                .client
                .derive_token(&self.identity, std::slice::from_ref(&self.identity.task))
                .await;

            let err = match result {
                Ok(mut tokens) => match tokens.remove(&self.identity.task) {
                    Some(token) if !token.is_empty() => return Some(token),
                    // The issuer answered but skipped this task; retrying is
                    // the only sensible recovery.
                    _ => ClientError::recoverable("issuing service returned no token for task"),
                },
                Err(err) => err,
            };

            if err.is_server_side() {
                error!(task = %self.identity, error = %err, server_side = true, "Failed to derive token");
                self.lifecycle
                    .kill(
                        CREDENTIAL_SOURCE,
                        &format!("server error deriving token: {err}"),
                        true,
                    )
                    .await;
                return None;
            }

            if !err.is_recoverable() {
                error!(task = %self.identity, error = %err, recoverable = false, "Failed to derive token");
                self.lifecycle
                    .kill(
                        CREDENTIAL_SOURCE,
                        &format!("failed to derive token: {err}"),
                        true,
                    )
                    .await;
                return None;
            }

            let delay = self.backoff.delay(attempts);
            error!(
                task = %self.identity,
                error = %err,
                recoverable = true,
                backoff = ?delay,
                "Failed to derive token"
            );
            attempts += 1;

            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = sleep(delay) => {}
            }
        }
    }

    /// Stop renewal for the last published token. Best effort.
    async fn stop_renewal(&self) {
        let token = self.future.get();
        if token.is_empty() {
            return;
        }
        if let Err(err) = self.client.stop_renew_token(&token).await {
            warn!(task = %self.identity, error = %err, "Failed to stop token renewal");
        }
    }
}
