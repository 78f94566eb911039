//! Supervision services: credential lifecycle and script health checks.

pub mod backoff;
pub mod change_reactor;
pub mod config;
pub mod credential_hook;
pub mod script_check;
pub mod token_future;
pub mod token_store;
pub mod token_supervisor;

pub use backoff::BackoffPolicy;
pub use change_reactor::{ChangeReactor, ReactOutcome};
pub use config::{CheckSettings, Config, ConfigError, CredentialSettings};
pub use credential_hook::{CredentialHook, CredentialHookConfig};
pub use script_check::{ScriptCheck, ScriptCheckHandle};
pub use token_future::TokenFuture;
pub use token_store::{TokenStore, TOKEN_FILE};
pub use token_supervisor::{TokenSupervisor, TokenSupervisorConfig, CREDENTIAL_SOURCE};
