//! Local filesystem credential storage.
//!
//! The credential lives in a single in-memory slot backed by one JSON file.
//! Writes go to a temp file that is renamed over the old one, all under one
//! write lock, so there is no window in which the slot is empty.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::Credential;
use crate::storage::CredentialStore;

/// File-backed single-slot credential store.
pub struct FileCredentialStore {
    path: PathBuf,
    slot: RwLock<Option<Credential>>,
}

impl FileCredentialStore {
    /// Open the store, loading any credential already on disk.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let slot = match read_bytes(&path).await? {
            Some(bytes) => Some(serde_json::from_slice(&bytes)?),
            None => None,
        };

        if slot.is_some() {
            log::debug!("Loaded stored credential from {}", path.display());
        }

        Ok(Self {
            path,
            slot: RwLock::new(slot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        restrict_permissions(&tmp).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save(&self, credential: Credential) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&credential)?;

        let mut slot = self.slot.write().await;
        self.write_bytes(&bytes).await?;
        *slot = Some(credential);

        log::info!("Stored credential at {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot.read().await.clone())
    }

    async fn is_authenticated(&self) -> bool {
        self.slot.read().await.is_some()
    }
}

/// Read bytes, returning None if file doesn't exist.
async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
