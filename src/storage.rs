//! Folder-scoped file storage under a single base directory.

use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use std::cmp::Ordering;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::{MAX_UPLOAD_SIZE, PUBLIC_UPLOAD_PREFIX, STAGING_DIR_NAME};
use crate::names::{NameError, raw_extension, validate_file_name, validate_folder_name};
use crate::staging::StagedUpload;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Name(#[from] NameError),
    #[error("Upload base directory not found")]
    BaseDirMissing,
    #[error("Target folder not found")]
    FolderNotFound,
    #[error("Failed to create directory")]
    DirectoryCreateFailed(#[source] io::Error),
    #[error("Failed to save file")]
    MoveFailed(#[source] io::Error),
    #[error("Storage operation failed")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File too large")]
    TooLarge { size: u64, limit: u64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of a successful upload, serialized as the `/api/upload/run` payload.
#[derive(Debug, Serialize)]
pub struct StoredFile {
    pub folder: String,
    pub original_name: String,
    pub saved_as: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub name: String,
    pub extension: String,
    pub updated_at: i64,
    pub updated_at_iso: String,
    pub full_path: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DeleteFailureReason {
    #[serde(rename = "Invalid file name")]
    InvalidName,
    #[serde(rename = "File not found")]
    NotFound,
    #[serde(rename = "Delete failed")]
    DeleteFailed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeleteFailure {
    pub file: String,
    pub reason: DeleteFailureReason,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteFailure>,
}

enum EntryKind {
    Missing,
    Directory,
    File,
    Other,
}

#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// The base directory, provided it currently exists as a directory.
    async fn base_dir(&self) -> Result<&Path, StorageError> {
        match fs::metadata(&self.root).await {
            Ok(metadata) if metadata.is_dir() => Ok(&self.root),
            Ok(_) => Err(StorageError::BaseDirMissing),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StorageError::BaseDirMissing),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Hidden directory holding uploads that are still being received.
    pub async fn staging_dir(&self) -> Result<PathBuf, StorageError> {
        let dir = self.base_dir().await?.join(STAGING_DIR_NAME);
        fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::DirectoryCreateFailed)?;
        Ok(dir)
    }

    pub async fn create_folder_if_absent(&self, folder: &str) -> Result<PathBuf, StorageError> {
        let folder = validate_folder_name(folder)?;
        let path = self.base_dir().await?.join(folder);
        match entry_kind(&path).await? {
            EntryKind::Directory => return Ok(path),
            EntryKind::Missing => {}
            EntryKind::File | EntryKind::Other => {
                return Err(StorageError::DirectoryCreateFailed(io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", path.display()),
                )));
            }
        }
        fs::create_dir_all(&path)
            .await
            .map_err(StorageError::DirectoryCreateFailed)?;
        info!(folder, "created upload folder");
        Ok(path)
    }

    /// Moves a fully received upload into `folder` under a fresh random name.
    ///
    /// The staged file is consumed: it ends up either at its final location or
    /// removed, never half-written under the stored name.
    pub async fn save_file(
        &self,
        folder: &str,
        staged: StagedUpload,
        original_name: &str,
        size: u64,
    ) -> Result<StoredFile, UploadError> {
        if size > MAX_UPLOAD_SIZE {
            staged.discard().await;
            return Err(UploadError::TooLarge {
                size,
                limit: MAX_UPLOAD_SIZE,
            });
        }

        let dir = match self.create_folder_if_absent(folder).await {
            Ok(dir) => dir,
            Err(err) => {
                staged.discard().await;
                return Err(err.into());
            }
        };

        let stored_name = generate_stored_name(original_name);
        staged
            .persist(&dir.join(&stored_name))
            .await
            .map_err(StorageError::MoveFailed)?;

        info!(folder, stored_name, original_name, size, "file stored");
        Ok(StoredFile {
            folder: folder.to_string(),
            original_name: original_name.to_string(),
            saved_as: stored_name,
            size,
        })
    }

    /// Folder names directly under the base directory, ascending.
    pub async fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        let base = self.base_dir().await?;
        let mut dir = fs::read_dir(base).await?;
        let mut folders = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                folders.push(name);
            }
        }

        folders.sort();
        Ok(folders)
    }

    /// Regular files in `folder`, newest first. A missing folder is empty.
    pub async fn list_files(&self, folder: &str) -> Result<Vec<FileItem>, StorageError> {
        let folder = validate_folder_name(folder)?;
        let path = self.base_dir().await?.join(folder);
        if !matches!(entry_kind(&path).await?, EntryKind::Directory) {
            return Ok(Vec::new());
        }

        let mut dir = fs::read_dir(&path).await?;
        let mut files = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(item) = describe_file(&path, folder, name).await? {
                files.push(item);
            }
        }

        files.sort_by(|a, b| match b.updated_at.cmp(&a.updated_at) {
            Ordering::Equal => a.name.cmp(&b.name),
            other => other,
        });
        debug!(folder, count = files.len(), "listed files");
        Ok(files)
    }

    /// Deletes each named file independently, reporting per-file outcomes.
    pub async fn delete_files(
        &self,
        folder: &str,
        names: &[String],
    ) -> Result<DeleteReport, StorageError> {
        let folder = validate_folder_name(folder)?;
        let dir = self.base_dir().await?.join(folder);
        if !matches!(entry_kind(&dir).await?, EntryKind::Directory) {
            return Err(StorageError::FolderNotFound);
        }

        let mut report = DeleteReport::default();
        for name in names {
            let reason = match validate_file_name(name) {
                Err(_) => Some(DeleteFailureReason::InvalidName),
                Ok(name) => delete_one(&dir, folder, name).await,
            };
            match reason {
                None => report.deleted.push(name.clone()),
                Some(reason) => report.errors.push(DeleteFailure {
                    file: name.clone(),
                    reason,
                }),
            }
        }

        info!(
            folder,
            deleted = report.deleted.len(),
            failed = report.errors.len(),
            "delete files"
        );
        Ok(report)
    }
}

/// Listing entry for `dir/name`, or `None` when it is not a regular file.
/// A file removed since the directory was read is skipped, not an error.
async fn describe_file(dir: &Path, folder: &str, name: String) -> io::Result<Option<FileItem>> {
    let metadata = match fs::symlink_metadata(dir.join(&name)).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(folder, file = name, "file vanished while listing");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };
    if !metadata.is_file() {
        return Ok(None);
    }

    let updated_at = metadata
        .modified()
        .ok()
        .and_then(|ts| ts.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or_default();
    Ok(Some(FileItem {
        extension: raw_extension(&name).unwrap_or_default().to_string(),
        updated_at,
        updated_at_iso: format_timestamp(updated_at),
        full_path: format!("{PUBLIC_UPLOAD_PREFIX}/{folder}/{name}"),
        name,
    }))
}

async fn delete_one(dir: &Path, folder: &str, name: &str) -> Option<DeleteFailureReason> {
    let path = dir.join(name);
    match entry_kind(&path).await {
        Ok(EntryKind::File) => {}
        Ok(_) => return Some(DeleteFailureReason::NotFound),
        Err(err) => {
            warn!(folder, file = name, error = %err, "failed to stat file for deletion");
            return Some(DeleteFailureReason::DeleteFailed);
        }
    }
    match fs::remove_file(&path).await {
        Ok(()) => None,
        // Lost a race with a concurrent delete.
        Err(err) if err.kind() == ErrorKind::NotFound => Some(DeleteFailureReason::NotFound),
        Err(err) => {
            warn!(folder, file = name, error = %err, "failed to delete file");
            Some(DeleteFailureReason::DeleteFailed)
        }
    }
}

/// Classifies `path` without following symlinks; a symlink is `Other`.
async fn entry_kind(path: &Path) -> io::Result<EntryKind> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(EntryKind::Directory),
        Ok(metadata) if metadata.is_file() => Ok(EntryKind::File),
        Ok(_) => Ok(EntryKind::Other),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(EntryKind::Missing),
        Err(err) => Err(err),
    }
}

/// 32 hex characters from 16 random bytes, plus the original's extension in
/// lowercase. `raw_extension` never yields a path separator; NUL is dropped.
pub fn generate_stored_name(original_name: &str) -> String {
    let token: [u8; 16] = rand::random();
    let mut name: String = token.iter().map(|byte| format!("{byte:02x}")).collect();
    if let Some(ext) = raw_extension(original_name)
        && !ext.contains('\0')
    {
        name.push('.');
        name.push_str(&ext.to_lowercase());
    }
    name
}

fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|utc| {
            utc.with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Secs, false)
        })
        .unwrap_or_default()
}
