//! Credential record and its durable store.

use crate::error::AuthResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// The one credential set this server manages.
///
/// All fields are optional: an empty record means "never authenticated".
/// A refresh always supersedes `access_token` and `expires_at`;
/// `refresh_token` is retained when the server does not supply a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credential {
    /// Opaque bearer token for the content API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Opaque token exchanged for a fresh access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry of `access_token`, milliseconds since Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl Credential {
    /// The access token, if present and unexpired at `now_ms`.
    ///
    /// A usable token requires no network access.
    pub fn usable_access_token(&self, now_ms: i64) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if expires_at > now_ms => Some(token),
            _ => None,
        }
    }

    /// Whether any field is set.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.expires_at.is_none()
    }
}

/// Durable storage for the credential record.
///
/// The record is read and written as a whole; no other component touches
/// the file. Two concurrent invocations may both save and the last write
/// wins; no cross-process locking is performed.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store over the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the credential file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the stored credential.
    ///
    /// Never fails: a missing or unreadable/corrupt file yields the empty
    /// credential.
    pub async fn load(&self) -> Credential {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = ?self.path, error = %e, "No stored credential");
                return Credential::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Stored credential is corrupt, ignoring");
                Credential::default()
            }
        }
    }

    /// Persist the credential, replacing any prior record.
    ///
    /// # Errors
    ///
    /// Surfaces I/O faults to the caller; they are not retried here.
    pub async fn save(&self, credential: &Credential) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(credential)?;
        tokio::fs::write(&self.path, &content).await?;

        // Tokens are secrets; keep the file owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, perms).await?;
        }

        debug!(path = ?self.path, "Wrote credential file");
        Ok(())
    }

    /// Delete the stored credential, if any. Returns `true` if a record
    /// was removed.
    pub async fn clear(&self) -> AuthResult<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (CredentialStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        (CredentialStore::new(path), dir)
    }

    fn sample_credential() -> Credential {
        Credential {
            access_token: Some("at-1".to_string()),
            refresh_token: Some("rt-1".to_string()),
            expires_at: Some(1_700_000_000_000),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let (store, _dir) = test_store();
        let credential = store.load().await;
        assert!(credential.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let (store, _dir) = test_store();
        let credential = sample_credential();

        store.save(&credential).await.unwrap();
        let loaded = store.load().await;
        assert_eq!(loaded, credential);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let (store, _dir) = test_store();
        tokio::fs::create_dir_all(store.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(store.path(), "{not json").await.unwrap();

        let credential = store.load().await;
        assert!(credential.is_empty());
    }

    #[tokio::test]
    async fn test_save_overwrites_whole_record() {
        let (store, _dir) = test_store();
        store.save(&sample_credential()).await.unwrap();

        let replacement = Credential {
            access_token: Some("at-2".to_string()),
            refresh_token: None,
            expires_at: Some(42),
        };
        store.save(&replacement).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded, replacement);
        assert_eq!(loaded.refresh_token, None);
    }

    #[tokio::test]
    async fn test_clear() {
        let (store, _dir) = test_store();
        store.save(&sample_credential()).await.unwrap();

        assert!(store.clear().await.unwrap());
        assert!(!store.clear().await.unwrap());
        assert!(store.load().await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _dir) = test_store();
        store.save(&sample_credential()).await.unwrap();

        let metadata = std::fs::metadata(store.path()).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_usable_access_token() {
        let credential = sample_credential();
        assert_eq!(
            credential.usable_access_token(1_600_000_000_000),
            Some("at-1")
        );
        assert_eq!(credential.usable_access_token(1_700_000_000_000), None);
        assert_eq!(credential.usable_access_token(1_800_000_000_000), None);
    }

    #[test]
    fn test_usable_access_token_requires_expiry() {
        let credential = Credential {
            access_token: Some("at".to_string()),
            refresh_token: None,
            expires_at: None,
        };
        assert_eq!(credential.usable_access_token(0), None);
    }
}
