//! Local durable storage for the live secret.
//!
//! Reads take the shared side of an `RwLock`, rotation takes the exclusive
//! side for its whole read-compare-replace. Replacement goes through a
//! sibling temp file and a rename, so the file on disk always holds either
//! the old secret or the new one.

use rotor_common::{RotorError, SecretHash, hash_secret};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// File mode for the secret
const SECRET_FILE_MODE: u32 = 0o600;

/// File-backed holder of the Agent's secret
pub struct SecretStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl SecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current secret, as raw bytes
    pub async fn read(&self) -> Result<Vec<u8>, RotorError> {
        let _guard = self.lock.read().await;
        self.read_unlocked().await
    }

    /// Hash of the current secret
    pub async fn current_hash(&self) -> Result<SecretHash, RotorError> {
        Ok(hash_secret(&self.read().await?))
    }

    /// Replace the secret if `presented` proves knowledge of the current one.
    ///
    /// `presented` is the hex SHA-256 of the current secret, the same value
    /// the Registry holds. Compared in constant time. Nothing is written on
    /// a mismatch.
    pub async fn rotate(&self, presented: &str, new_secret: &str) -> Result<(), RotorError> {
        if new_secret.is_empty() {
            return Err(RotorError::InvalidInput("new_key is empty".to_string()));
        }

        let _guard = self.lock.write().await;
        let current = hash_secret(&self.read_unlocked().await?);
        let presented = SecretHash::from_stored(presented);

        if !presented.ct_eq(&current) {
            return Err(RotorError::Unauthorized("Invalid old key".to_string()));
        }

        write_atomic(&self.path, new_secret.as_bytes(), SECRET_FILE_MODE).await
    }

    /// Hold the writer side, stalling every reader and rotation
    #[cfg(test)]
    pub(crate) async fn lock_exclusive(&self) -> tokio::sync::RwLockWriteGuard<'_, ()> {
        self.lock.write().await
    }

    async fn read_unlocked(&self) -> Result<Vec<u8>, RotorError> {
        match tokio::fs::read(&self.path).await {
            Ok(secret) if secret.is_empty() => {
                Err(RotorError::MissingSecret(self.path.display().to_string()))
            }
            Ok(secret) => Ok(secret),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RotorError::MissingSecret(self.path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `contents` to `path` via temp file + fsync + rename.
///
/// On failure the temp file is removed and `path` is untouched.
pub async fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<(), RotorError> {
    let tmp = temp_path(path);

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        set_mode(&tmp, mode).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await?;
        sync_parent(path).await;
        Ok::<(), std::io::Error>(())
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "secret".to_string());
    path.with_file_name(format!(".{}.rotor-tmp", name))
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Make the rename durable. Best effort: not every platform allows
/// opening a directory for sync.
#[cfg(unix)]
async fn sync_parent(path: &Path) {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    if let Ok(dir) = tokio::fs::File::open(parent).await {
        let _ = dir.sync_all().await;
    }
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    async fn store_with(secret: impl AsRef<[u8]>) -> (tempfile::TempDir, SecretStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret_key");
        tokio::fs::write(&path, secret).await.unwrap();
        (dir, SecretStore::new(path))
    }

    #[tokio::test]
    async fn test_rotate_with_matching_hash() {
        let (_dir, store) = store_with("s3cr3t").await;
        let credential = hash_secret("s3cr3t");

        assert_ok!(store.rotate(credential.as_str(), "n3w").await);
        assert_eq!(store.read().await.unwrap(), b"n3w");
        assert_eq!(store.current_hash().await.unwrap(), hash_secret("n3w"));
    }

    #[tokio::test]
    async fn test_rotate_rejects_every_wrong_credential() {
        let (_dir, store) = store_with("s3cr3t").await;

        let wrong = [
            "s3cr3t".to_string(),
            String::new(),
            hash_secret("other").to_string(),
            hash_secret("s3cr3t").as_str()[..63].to_string(),
            format!("{}0", hash_secret("s3cr3t")),
        ];

        for credential in &wrong {
            let err = store.rotate(credential, "n3w").await.unwrap_err();
            assert!(matches!(err, RotorError::Unauthorized(_)), "{credential:?}");
            assert_eq!(store.read().await.unwrap(), b"s3cr3t");
        }
    }

    #[tokio::test]
    async fn test_rotate_accepts_uppercase_credential() {
        let (_dir, store) = store_with("s3cr3t").await;
        let upper = hash_secret("s3cr3t").as_str().to_ascii_uppercase();
        assert_ok!(store.rotate(&upper, "n3w").await);
    }

    #[tokio::test]
    async fn test_rotate_rejects_empty_new_secret() {
        let (_dir, store) = store_with("s3cr3t").await;
        let err = store
            .rotate(hash_secret("s3cr3t").as_str(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, RotorError::InvalidInput(_)));
        assert_eq!(store.read().await.unwrap(), b"s3cr3t");
    }

    #[tokio::test]
    async fn test_missing_secret() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::new(dir.path().join("absent"));

        assert!(matches!(
            store.read().await.unwrap_err(),
            RotorError::MissingSecret(_)
        ));
        assert!(matches!(
            store.rotate("anything", "n3w").await.unwrap_err(),
            RotorError::MissingSecret(_)
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_secret_intact() {
        let (dir, store) = store_with("s3cr3t").await;

        // A directory squatting on the temp path makes the create fail
        tokio::fs::create_dir(dir.path().join(".secret_key.rotor-tmp"))
            .await
            .unwrap();

        let err = store
            .rotate(hash_secret("s3cr3t").as_str(), "n3w")
            .await
            .unwrap_err();
        assert!(matches!(err, RotorError::Io(_)));
        assert_eq!(store.read().await.unwrap(), b"s3cr3t");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rotated_secret_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store_with("s3cr3t").await;
        store
            .rotate(hash_secret("s3cr3t").as_str(), "n3w")
            .await
            .unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_concurrent_reads_never_torn() {
        let (_dir, store) = store_with("old-secret").await;
        let store = Arc::new(store);

        let mut readers = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            readers.push(tokio::spawn(async move { store.read().await.unwrap() }));
        }

        store
            .rotate(hash_secret("old-secret").as_str(), "new-secret-value")
            .await
            .unwrap();

        for reader in readers {
            let seen = reader.await.unwrap();
            assert!(
                seen == b"old-secret" || seen == b"new-secret-value",
                "{seen:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_second_rotation_needs_new_credential() {
        let (_dir, store) = store_with("s3cr3t").await;
        let old = hash_secret("s3cr3t");

        store.rotate(old.as_str(), "n3w").await.unwrap();
        assert!(store.rotate(old.as_str(), "again").await.is_err());
        assert_ok!(store.rotate(hash_secret("n3w").as_str(), "again").await);
    }

    #[tokio::test]
    async fn test_binary_secret_is_hashed_and_rotated() {
        let binary = [0xffu8, 0xfe, 0x00, 0x41];
        let (_dir, store) = store_with(binary).await;

        assert_eq!(store.read().await.unwrap(), binary);
        let credential = store.current_hash().await.unwrap();
        assert_eq!(credential, hash_secret(binary));

        assert_ok!(store.rotate(credential.as_str(), "n3w").await);
        assert_eq!(store.read().await.unwrap(), b"n3w");
    }
}
