//! Router assembly: API routes, public file serving and the SPA fallback.

use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::auth::{self, AdminCredentials};
use crate::config::PUBLIC_UPLOAD_PREFIX;
use crate::http::{add_security_headers, build_cors_layer, client_ip, hide_dot_entries};
use crate::storage::Storage;
use crate::token::TokenService;
use crate::{frontend, upload, version};

/// Shared, immutable services handed to every request.
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<Storage>,
    pub credentials: Arc<AdminCredentials>,
    pub tokens: Arc<TokenService>,
}

pub fn build_router(services: &AppServices, cors_origins: Option<&str>) -> Router {
    let mut app = Router::new()
        .route("/api/auth/login", post(auth::auth_login))
        .route("/api/auth/me", get(auth::auth_me))
        .route(
            "/api/upload/run",
            post(upload::upload_run).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/upload/folderList", get(upload::folder_list))
        .route("/api/upload/fileList", get(upload::file_list))
        .route("/api/upload/deleteFiles", post(upload::delete_files))
        .route("/api/version", get(version::get_version_info))
        .nest_service(
            PUBLIC_UPLOAD_PREFIX,
            ServeDir::new(services.storage.root_path()),
        )
        .fallback(frontend::serve_frontend)
        .layer(middleware::from_fn(hide_dot_entries))
        .layer(middleware::from_fn(add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = client_ip(request)
                        .map(|ip| ip.to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(services.storage.clone()))
        .layer(Extension(services.credentials.clone()))
        .layer(Extension(services.tokens.clone()));

    if let Some(cors_layer) = build_cors_layer(cors_origins) {
        app = app.layer(cors_layer);
    }

    app
}
