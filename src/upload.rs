//! Upload, listing and deletion endpoints under `/api/upload`.

use axum::extract::multipart::{Field, Multipart, MultipartRejection};
use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::AuthUser;
use crate::config::{DEFAULT_FOLDER_NAME, MAX_UPLOAD_SIZE};
use crate::envelope::{ApiJson, ApiQuery, ApiResponse};
use crate::error::ApiError;
use crate::names::validate_folder_name;
use crate::staging::StagedUpload;
use crate::storage::{DeleteReport, FileItem, Storage, StorageError, StoredFile};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    stored: StoredFile,
    uploaded_by: String,
}

#[derive(Debug, Serialize)]
pub struct FolderListResponse {
    folders: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListQuery {
    #[serde(default)]
    folder_name: String,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    files: Vec<FileItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFilesRequest {
    #[serde(default)]
    folder_name: String,
    #[serde(default)]
    files: Vec<String>,
}

/// A `file` part spooled to the staging area.
struct ReceivedFile {
    staged: StagedUpload,
    original_name: String,
    /// Bytes seen, which may exceed what was kept once the limit is passed.
    size: u64,
}

/// POST /api/upload/run
///
/// One file per request, in the `file` part; `folderName` defaults to
/// `default`.
pub async fn upload_run(
    AuthUser(claims): AuthUser,
    Extension(storage): Extension<Arc<Storage>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection, "upload is not multipart");
        ApiError::bad_request("No file uploaded")
    })?;

    let mut folder_name: Option<String> = None;
    let mut received: Option<ReceivedFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "failed to read multipart field");
                discard(received).await;
                return Err(ApiError::bad_request("Upload error"));
            }
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("folderName") if folder_name.is_none() => match field.text().await {
                Ok(text) => folder_name = Some(text),
                Err(err) => {
                    warn!(error = %err, "failed to read folderName");
                    discard(received).await;
                    return Err(ApiError::bad_request("Upload error"));
                }
            },
            Some("file") if received.is_none() && field.file_name().is_some() => {
                let file = receive_file(&storage, field).await?;
                let oversized = file.size > MAX_UPLOAD_SIZE;
                received = Some(file);
                // The remaining parts are irrelevant once the file is rejected.
                if oversized {
                    break;
                }
            }
            _ => {}
        }
    }

    let ReceivedFile {
        staged,
        original_name,
        size,
    } = received.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let folder = folder_name.unwrap_or_else(|| DEFAULT_FOLDER_NAME.to_string());

    let stored = storage
        .save_file(&folder, staged, &original_name, size)
        .await?;
    info!(
        folder = stored.folder,
        saved_as = stored.saved_as,
        uploaded_by = claims.sub,
        "upload complete"
    );

    Ok(Json(ApiResponse::new(UploadResponse {
        stored,
        uploaded_by: claims.sub,
    })))
}

/// Streams one file part into a staged upload, stopping once the size limit
/// is exceeded.
async fn receive_file(storage: &Storage, mut field: Field<'_>) -> Result<ReceivedFile, ApiError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let mut staged = StagedUpload::create(storage).await?;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "failed to read upload body");
                staged.discard().await;
                return Err(ApiError::bad_request("Upload error"));
            }
        };

        let size = staged.len() + chunk.len() as u64;
        if size > MAX_UPLOAD_SIZE {
            debug!(original_name, size, "upload exceeds size limit");
            return Ok(ReceivedFile {
                staged,
                original_name,
                size,
            });
        }
        if let Err(err) = staged.write_chunk(&chunk).await {
            staged.discard().await;
            return Err(StorageError::Io(err).into());
        }
    }

    let size = staged.len();
    Ok(ReceivedFile {
        staged,
        original_name,
        size,
    })
}

async fn discard(received: Option<ReceivedFile>) {
    if let Some(file) = received {
        file.staged.discard().await;
    }
}

/// GET /api/upload/folderList
pub async fn folder_list(
    AuthUser(_): AuthUser,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Json<ApiResponse<FolderListResponse>>, ApiError> {
    let folders = storage.list_folders().await?;
    debug!(count = folders.len(), "list folders");
    Ok(Json(ApiResponse::new(FolderListResponse { folders })))
}

/// GET /api/upload/fileList?folderName=...
pub async fn file_list(
    AuthUser(_): AuthUser,
    Extension(storage): Extension<Arc<Storage>>,
    ApiQuery(query): ApiQuery<FileListQuery>,
) -> Result<Json<ApiResponse<FileListResponse>>, ApiError> {
    let files = storage.list_files(&query.folder_name).await?;
    Ok(Json(ApiResponse::new(FileListResponse { files })))
}

/// POST /api/upload/deleteFiles
pub async fn delete_files(
    AuthUser(claims): AuthUser,
    Extension(storage): Extension<Arc<Storage>>,
    ApiJson(payload): ApiJson<DeleteFilesRequest>,
) -> Result<Json<ApiResponse<DeleteReport>>, ApiError> {
    validate_folder_name(&payload.folder_name)?;
    if payload.files.is_empty() {
        return Err(ApiError::unprocessable("No files specified"));
    }

    let report = storage
        .delete_files(&payload.folder_name, &payload.files)
        .await?;
    info!(
        folder = payload.folder_name,
        requested_by = claims.sub,
        deleted = report.deleted.len(),
        "delete request handled"
    );
    Ok(Json(ApiResponse::new(report)))
}
