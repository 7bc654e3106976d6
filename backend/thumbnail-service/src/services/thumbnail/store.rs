//! Artifact store - filesystem-backed thumbnail cache
//!
//! Artifacts are write-once. Writes land in a temp file next to the target
//! and are renamed into place, so readers only ever see complete files.

use crate::error::{AppError, Result};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `Ok(false)` when the path is missing, including when one of its
    /// parents is a regular file. Permission and other I/O failures are
    /// storage errors, not misses.
    pub async fn exists(&self, path: &Path) -> Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                Ok(false)
            }
            Err(e) => Err(AppError::storage(format!("stat {}", path.display()), e)),
        }
    }

    pub async fn read(&self, path: &Path) -> Result<Bytes> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::storage(format!("read {}", path.display()), e))?;
        Ok(Bytes::from(data))
    }

    /// Write `data` to `path` via temp file + rename.
    ///
    /// Only paths under the store's root are accepted. Creates parent
    /// directories. Replacing an existing artifact is benign: encodings for a
    /// key are deterministic.
    pub async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        if !path.starts_with(&self.root) {
            return Err(AppError::Storage(format!(
                "{} is outside cache root {}",
                path.display(),
                self.root.display()
            )));
        }

        let parent = path
            .parent()
            .ok_or_else(|| AppError::Storage(format!("no parent for {}", path.display())))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::storage(format!("create {}", parent.display()), e))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Storage(format!("no file name in {}", path.display())))?;
        let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Err(e) = write_and_sync(&tmp_path, data).await {
            remove_tmp(&tmp_path).await;
            return Err(AppError::storage(format!("write {}", tmp_path.display()), e));
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            remove_tmp(&tmp_path).await;
            return Err(AppError::storage(format!("rename into {}", path.display()), e));
        }

        debug!(path = %path.display(), size = data.len(), "Artifact written");
        Ok(())
    }
}

async fn write_and_sync(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

async fn remove_tmp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove temp file");
        }
    }
}
