//! Domain errors for the Warden supervisor core.

use thiserror::Error;

/// Domain-level errors that can occur while supervising task credentials.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Failed to recover token from disk: {0}")]
    TokenRecovery(#[source] std::io::Error),

    #[error("Failed to write token to disk: {0}")]
    TokenPersist(#[source] std::io::Error),

    #[error("Invalid change signal: {0:?}")]
    InvalidSignal(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
