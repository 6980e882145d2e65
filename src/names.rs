//! Folder and file name whitelisting shared by every storage operation.

use thiserror::Error;

use crate::config::FOLDER_NAME_MAX_LEN;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("Invalid folder name")]
    InvalidFolderName,
    #[error("Invalid file name")]
    InvalidFileName,
}

/// Accepts `^[A-Za-z0-9_-]{1,50}$`.
pub fn validate_folder_name(name: &str) -> Result<&str, NameError> {
    let valid = !name.is_empty()
        && name.len() <= FOLDER_NAME_MAX_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(name)
    } else {
        Err(NameError::InvalidFolderName)
    }
}

/// Accepts any single path segment: no separators, no `.`/`..`, no NUL.
///
/// Looser than [`validate_folder_name`] because stored names carry the
/// original extension, which may contain characters outside the folder set.
pub fn validate_file_name(name: &str) -> Result<&str, NameError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if valid {
        Ok(name)
    } else {
        Err(NameError::InvalidFileName)
    }
}

/// Text after the last `.` of the final segment, if non-empty.
pub fn raw_extension(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}
