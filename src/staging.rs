//! In-flight uploads: written to the hidden staging directory, then renamed
//! into their folder in one step.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::STAGING_DIR_NAME;
use crate::storage::{Storage, StorageError};

pub struct StagedUpload {
    path: PathBuf,
    file: File,
    written: u64,
}

impl StagedUpload {
    pub async fn create(storage: &Storage) -> Result<Self, StorageError> {
        let path = storage
            .staging_dir()
            .await?
            .join(format!("{}.part", Uuid::new_v4()));
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far.
    pub fn len(&self) -> u64 {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub async fn discard(self) {
        drop(self.file);
        if let Err(err) = fs::remove_file(&self.path).await {
            warn!(path = ?self.path, error = %err, "failed to remove staged upload");
        }
    }

    /// Syncs the staged data and renames it to `target`. On failure the staged
    /// file is removed and `target` is left untouched.
    pub async fn persist(self, target: &Path) -> io::Result<()> {
        let Self { path, mut file, .. } = self;
        let synced = async {
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        let result = match synced {
            Ok(()) => fs::rename(&path, target).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!(path = ?path, error = %cleanup, "failed to remove staged upload");
            }
            return Err(err);
        }

        if let Some(parent) = target.parent()
            && let Err(err) = sync_dir(parent).await
        {
            warn!(dir = ?parent, error = %err, "failed to sync upload folder");
        }
        Ok(())
    }
}

async fn sync_dir(path: &Path) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = std::fs::File::open(path)?;
        dir.sync_all()
    })
    .await
    .map_err(|err| io::Error::other(err.to_string()))?
}

/// Removes staged uploads older than `ttl`, left behind by aborted requests.
pub async fn cleanup_stale_uploads(storage: &Storage, ttl: Duration) -> io::Result<usize> {
    if ttl.is_zero() {
        return Ok(0);
    }

    let staging = storage.root_path().join(STAGING_DIR_NAME);
    let mut dir = match fs::read_dir(&staging).await {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    while let Some(entry) = dir.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let Some(age) = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
        else {
            continue;
        };
        if age >= ttl {
            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    info!(path = ?path, "removed stale staged upload");
                }
                Err(err) => warn!(path = ?path, error = %err, "failed to remove stale staged upload"),
            }
        }
    }

    Ok(removed)
}
