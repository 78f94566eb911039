//! Atomic persistence of credential tokens in a task's secret directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::domain::errors::{DomainError, DomainResult};

/// Name of the file holding the credential token inside the task's secret
/// directory.
pub const TOKEN_FILE: &str = "vault_token";

/// Reads and writes the per-task token file.
#[derive(Debug, Clone, Default)]
pub struct TokenStore;

impl TokenStore {
    /// Path of the token file inside `secret_dir`.
    pub fn token_path(secret_dir: &Path) -> PathBuf {
        secret_dir.join(TOKEN_FILE)
    }

    /// Load a previously persisted token.
    ///
    /// Returns `("", false)` when no token file exists; any other I/O error
    /// fails the call.
    pub async fn load(&self, path: &Path) -> DomainResult<(String, bool)> {
        match fs::read_to_string(path).await {
            Ok(token) => Ok((token, true)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok((String::new(), false)),
            Err(err) => Err(DomainError::TokenRecovery(err)),
        }
    }

    /// Persist `token` so that a reader sees either the prior contents or
    /// the new contents, never a partial write.
    ///
    /// The file mode is permissive; the surrounding system already sandboxes
    /// the secret directory.
    pub async fn store(&self, path: &Path, token: &str) -> DomainResult<()> {
        // Write a sibling temp file, then rename it over the destination.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, token)
            .await
            .map_err(DomainError::TokenPersist)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o666))
                .await
                .map_err(DomainError::TokenPersist)?;
        }

        fs::rename(&tmp, path)
            .await
            .map_err(DomainError::TokenPersist)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore;

        let (token, exists) = store
            .load(&TokenStore::token_path(dir.path()))
            .await
            .unwrap();
        assert_eq!(token, "");
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore;
        let path = TokenStore::token_path(dir.path());

        store.store(&path, "tok-A").await.unwrap();
        let (token, exists) = store.load(&path).await.unwrap();
        assert_eq!(token, "tok-A");
        assert!(exists);
    }

    #[tokio::test]
    async fn test_store_replaces_prior_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore;
        let path = TokenStore::token_path(dir.path());

        store.store(&path, "tok-A").await.unwrap();
        store.store(&path, "tok-B").await.unwrap();

        let (token, _) = store.load(&path).await.unwrap();
        assert_eq!(token, "tok-B");

        // No temp file is left behind.
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_load_propagates_non_not_found_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore;

        // Reading a directory as a file is an I/O error other than NotFound.
        let err = store.load(dir.path()).await.unwrap_err();
        assert!(matches!(err, DomainError::TokenRecovery(_)));
    }
}
