//! Embedded admin frontend with SPA fallback.

use axum::http::{Uri, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

use crate::error::ApiError;

const INDEX: &str = "index.html";

#[derive(RustEmbed)]
#[folder = "frontend/dist"]
pub struct FrontendAssets;

/// Router fallback. Serves a bundled asset, or `index.html` for client-side
/// routes such as `/admin/login`. Unmatched `/api/` paths get a JSON 404.
pub async fn serve_frontend(uri: Uri) -> Result<Response, ApiError> {
    let path = uri.path().trim_start_matches('/');
    if path == "api" || path.starts_with("api/") {
        return Err(ApiError::not_found("Not found"));
    }

    let requested = if path.is_empty() { INDEX } else { path };
    asset_response(requested)
        .or_else(|| (!requested.contains('.')).then(|| asset_response(INDEX)).flatten())
        .ok_or_else(|| ApiError::not_found("Not found"))
}

fn asset_response(path: &str) -> Option<Response> {
    let asset = FrontendAssets::get(path)?;
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_owned();
    let cache_control = if path == INDEX { "no-cache" } else { "public, max-age=3600" };

    Some(
        (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, cache_control.to_owned()),
            ],
            asset.data.into_owned(),
        )
            .into_response(),
    )
}
