//! Build metadata endpoint.

use axum::Json;
use serde::Serialize;

use crate::envelope::ApiResponse;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    version: &'static str,
    commit: &'static str,
    build_time: &'static str,
    build_env: String,
}

/// GET /api/version
pub async fn get_version_info() -> Json<ApiResponse<VersionInfo>> {
    Json(ApiResponse::new(VersionInfo {
        version: crate::build::PKG_VERSION,
        commit: crate::build::SHORT_COMMIT,
        build_time: crate::build::BUILD_TIME,
        build_env: format!(
            "{},{}",
            crate::build::RUST_VERSION,
            crate::build::RUST_CHANNEL
        ),
    }))
}
