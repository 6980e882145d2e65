//! HTTP helpers: CORS, security headers and client address resolution.

use axum::body::Body as AxumBody;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{HeaderMap, HeaderValue, Method, Request, header};
use axum::{middleware, response::Response};
use std::net::{IpAddr, SocketAddr};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::PUBLIC_UPLOAD_PREFIX;
use crate::error::ApiError;

/// Builds a CORS layer from a comma separated origin list.
///
/// Tokens travel in the `Authorization` header, so credentials mode is not
/// enabled.
pub fn build_cors_layer(cors_origins: Option<&str>) -> Option<CorsLayer> {
    let mut origins = Vec::new();
    for origin in cors_origins?.split(',').map(str::trim) {
        if origin.is_empty() {
            continue;
        }
        match HeaderValue::from_str(origin) {
            Ok(value) => origins.push(value),
            Err(_) => warn!(origin, "ignoring invalid cors origin"),
        }
    }
    if origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    Some(layer)
}

/// Address reported by a reverse proxy: the first `x-forwarded-for` hop, or
/// `x-real-ip`.
pub fn extract_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str, first_hop: bool| {
        let value = headers.get(name)?.to_str().ok()?;
        let candidate = if first_hop {
            value.split(',').next()?
        } else {
            value
        };
        candidate.trim().parse::<IpAddr>().ok()
    };
    header_ip("x-forwarded-for", true).or_else(|| header_ip("x-real-ip", false))
}

/// Client address for logging: proxy headers first, then the peer.
pub fn client_ip<B>(request: &Request<B>) -> Option<IpAddr> {
    if let Some(ip) = extract_forwarded_ip(request.headers()) {
        return Some(ip);
    }
    let ConnectInfo(peer) = request.extensions().get::<ConnectInfo<SocketAddr>>()?;
    Some(peer.ip())
}

/// Response headers applied to everything the server returns.
pub async fn add_security_headers(request: Request<AxumBody>, next: middleware::Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in [
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::REFERRER_POLICY, "same-origin"),
    ] {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

/// True when a public file path names a hidden entry such as the staging
/// area. Segments are checked after percent-decoding, which is what
/// `ServeDir` resolves against; undecodable paths count as hidden.
fn is_hidden_public_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix(PUBLIC_UPLOAD_PREFIX) else {
        return false;
    };
    match urlencoding::decode(rest) {
        Ok(decoded) => decoded
            .split(['/', '\\'])
            .any(|segment| segment.starts_with('.')),
        Err(_) => true,
    }
}

/// Keeps dot entries under the public upload prefix out of static serving.
pub async fn hide_dot_entries(
    request: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, ApiError> {
    if is_hidden_public_path(request.uri().path()) {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(next.run(request).await)
}
