//! Task-runner hook gating startup on credential availability.
//!
//! The prerun step recovers any token persisted in the task's secret
//! directory, launches the background token supervisor, and blocks the task
//! from starting until the first token is published (or the caller cancels).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::credential::{CredentialSpec, TaskIdentity};
use crate::domain::ports::{CredentialClient, TaskLifecycle, TokenUpdater};
use crate::services::config::CredentialSettings;
use crate::services::token_future::TokenFuture;
use crate::services::token_store::TokenStore;
use crate::services::token_supervisor::{TokenSupervisor, TokenSupervisorConfig};

/// Collaborators for a [`CredentialHook`].
pub struct CredentialHookConfig {
    pub identity: TaskIdentity,
    pub spec: CredentialSpec,
    pub client: Arc<dyn CredentialClient>,
    pub lifecycle: Arc<dyn TaskLifecycle>,
    pub updater: Arc<dyn TokenUpdater>,
    pub settings: CredentialSettings,
}

/// Per-task hook that supplies the task with a secret-store token before it
/// starts and keeps the token fresh for the task's lifetime.
pub struct CredentialHook {
    identity: TaskIdentity,
    spec: CredentialSpec,
    client: Arc<dyn CredentialClient>,
    lifecycle: Arc<dyn TaskLifecycle>,
    updater: Arc<dyn TokenUpdater>,
    settings: CredentialSettings,
    store: TokenStore,
    future: Arc<TokenFuture>,
    cancel: CancellationToken,
    token_path: PathBuf,
    first_run: bool,
}

impl CredentialHook {
    pub fn new(config: CredentialHookConfig) -> Self {
        Self {
            identity: config.identity,
            spec: config.spec,
            client: config.client,
            lifecycle: config.lifecycle,
            updater: config.updater,
            settings: config.settings,
            store: TokenStore,
            future: Arc::new(TokenFuture::new()),
            cancel: CancellationToken::new(),
            token_path: PathBuf::new(),
            first_run: true,
        }
    }

    pub fn name(&self) -> &'static str {
        "credentials"
    }

    /// Block task startup until the first token is available.
    ///
    /// Only the first invocation does work; later invocations return
    /// immediately so a restored task runner does not spawn a second
    /// supervisor. If `cancel` fires before a token is published the hook
    /// returns success without one; the task is being torn down anyway.
    pub async fn prerun(&mut self, secret_dir: &Path, cancel: &CancellationToken) -> DomainResult<()> {
        let first = self.first_run;
        self.first_run = false;
        if !first {
            return Ok(());
        }

        // Recover a token persisted by a previous supervisor run, if any.
        self.token_path = TokenStore::token_path(secret_dir);
        let (recovered, exists) = self.store.load(&self.token_path).await?;
        if exists {
            debug!(task = %self.identity, "Recovered persisted token");
        }

        let supervisor = TokenSupervisor::new(TokenSupervisorConfig {
            identity: self.identity.clone(),
            spec: self.spec.clone(),
            client: self.client.clone(),
            lifecycle: self.lifecycle.clone(),
            updater: self.updater.clone(),
            token_path: self.token_path.clone(),
            future: self.future.clone(),
            cancel: self.cancel.clone(),
            settings: self.settings.clone(),
        });
        tokio::spawn(supervisor.run(recovered));

        let ready = self.future.wait();
        tokio::select! {
            _ = ready => {}
            _ = cancel.cancelled() => return Ok(()),
        }

        self.updater
            .set_token(&self.future.get(), self.spec.env)
            .await;
        Ok(())
    }

    /// Stop the background supervisor. Does not wait for it to exit.
    pub fn poststop(&self) {
        self.cancel.cancel();
    }
}
