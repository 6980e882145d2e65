//! API error type rendered as the failure envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;
use crate::names::NameError;
use crate::storage::{StorageError, UploadError};

/// Failure envelope: `{success: false, message, code?}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<&'static str>,
}

impl ApiError {
    /// Builds an error from a raw status; anything outside 400-599 becomes 500.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status)
            .ok()
            .filter(|status| status.is_client_error() || status.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(413, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(422, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<NameError> for ApiError {
    fn from(err: NameError) -> Self {
        ApiError::unprocessable(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::unprocessable(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::Unauthorized => ApiError::unauthorized(err.to_string()),
            AuthError::Forbidden => ApiError::forbidden(err.to_string()),
            AuthError::Signing(ref source) => {
                error!(error = %source, "failed to sign token");
                ApiError::internal("Failed to issue token")
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Name(name) => name.into(),
            StorageError::FolderNotFound => ApiError::not_found(err.to_string()),
            StorageError::BaseDirMissing => {
                error!("upload base directory is missing");
                ApiError::internal(err.to_string()).with_code("BASE_DIR_MISSING")
            }
            StorageError::DirectoryCreateFailed(ref source)
            | StorageError::MoveFailed(ref source)
            | StorageError::Io(ref source) => {
                error!(error = %source, "{err}");
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { .. } => {
                ApiError::payload_too_large(err.to_string()).with_code("FILE_TOO_LARGE")
            }
            UploadError::Storage(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn out_of_range_status_becomes_500() {
        assert_eq!(ApiError::new(200, "ok?").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::new(302, "moved").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::new(600, "nope").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::new(0, "zero").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::new(418, "teapot").status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (
                NameError::InvalidFolderName.into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid folder name",
            ),
            (
                AuthError::MissingCredentials.into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "username and password are required",
            ),
            (
                AuthError::InvalidCredentials.into(),
                StatusCode::UNAUTHORIZED,
                "Invalid credentials",
            ),
            (
                AuthError::Unauthorized.into(),
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
            ),
            (AuthError::Forbidden.into(), StatusCode::FORBIDDEN, "Forbidden"),
            (
                StorageError::FolderNotFound.into(),
                StatusCode::NOT_FOUND,
                "Target folder not found",
            ),
            (
                UploadError::TooLarge {
                    size: 2,
                    limit: 1,
                }
                .into(),
                StatusCode::PAYLOAD_TOO_LARGE,
                "File too large",
            ),
            (
                StorageError::MoveFailed(io::Error::other("disk full")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save file",
            ),
            (
                StorageError::BaseDirMissing.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upload base directory not found",
            ),
        ];

        for (err, status, message) in cases {
            assert_eq!(err.status(), status, "{message}");
            assert_eq!(err.message(), message);
        }
    }
}
