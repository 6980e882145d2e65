//! Admin credential check, bearer-token guard and the auth endpoints.

use axum::extract::{Extension, FromRequestParts, Json};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::envelope::{ApiJson, ApiResponse};
use crate::error::ApiError;
use crate::token::{Claims, Role, TokenService};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing Authorization header")]
    MissingToken,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// The single admin identity allowed to log in.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Plain equality against the configured pair; empty input never reaches
    /// the comparison.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if username != self.username || password != self.password {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(())
    }
}

/// Extractor for requests carrying a valid `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn require_role(self, role: Role) -> Result<Self, AuthError> {
        if self.0.role == role {
            Ok(self)
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::MissingToken)?;
        let tokens = parts
            .extensions
            .get::<Arc<TokenService>>()
            .ok_or_else(|| ApiError::internal("token service not configured"))?;
        let claims = tokens.verify(bearer.token(), Utc::now())?;
        Ok(AuthUser(claims))
    }
}

/// [`AuthUser`] narrowed to the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state)
            .await?
            .require_role(Role::Admin)?;
        Ok(AdminUser(claims))
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
}

/// POST /api/auth/login
pub async fn auth_login(
    Extension(credentials): Extension<Arc<AdminCredentials>>,
    Extension(tokens): Extension<Arc<TokenService>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if let Err(err) = credentials.authenticate(&payload.username, &payload.password) {
        warn!(username = %payload.username, reason = %err, "login rejected");
        return Err(err.into());
    }

    let token = tokens.issue(&payload.username, Role::Admin, Utc::now())?;
    info!(username = %payload.username, "admin logged in");
    Ok(Json(ApiResponse::new(LoginResponse { token })))
}

/// GET /api/auth/me
pub async fn auth_me(AuthUser(claims): AuthUser) -> Json<ApiResponse<Claims>> {
    Json(ApiResponse::new(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode, header};

    fn credentials() -> AdminCredentials {
        AdminCredentials::new("admin", "secret")
    }

    #[test]
    fn authenticate_checks_empty_input_first() {
        let creds = credentials();
        assert!(matches!(
            creds.authenticate("", "secret"),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            creds.authenticate("admin", ""),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn authenticate_requires_exact_match() {
        let creds = credentials();
        assert!(creds.authenticate("admin", "secret").is_ok());
        for (user, pass) in [
            ("admin", "wrong"),
            ("Admin", "secret"),
            ("admin ", "secret"),
            ("admin", "secret2"),
        ] {
            assert!(matches!(
                creds.authenticate(user, pass),
                Err(AuthError::InvalidCredentials)
            ));
        }
    }

    #[test]
    fn unconfigured_admin_cannot_log_in() {
        let creds = AdminCredentials::new("", "");
        assert!(matches!(
            creds.authenticate("", ""),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn login_issues_admin_token() {
        let tokens = Arc::new(TokenService::new("test-secret").unwrap());
        let Json(response) = auth_login(
            Extension(Arc::new(credentials())),
            Extension(tokens.clone()),
            ApiJson(LoginRequest {
                username: "admin".into(),
                password: "secret".into(),
            }),
        )
        .await
        .unwrap_or_else(|err| panic!("login failed: {err}"));

        assert!(response.success);
        let claims = tokens.verify(&response.data.token, Utc::now()).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, Role::Admin);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_401() {
        let result = auth_login(
            Extension(Arc::new(credentials())),
            Extension(Arc::new(TokenService::new("test-secret").unwrap())),
            ApiJson(LoginRequest {
                username: "admin".into(),
                password: "wrong".into(),
            }),
        )
        .await;

        let err = result.err().expect("login should fail");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Invalid credentials");
    }

    async fn extract(request: Request<()>) -> Result<AuthUser, ApiError> {
        let (mut parts, _) = request.into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn guard_distinguishes_missing_header_only() {
        let tokens = Arc::new(TokenService::new("test-secret").unwrap());

        let mut request = Request::new(());
        request.extensions_mut().insert(tokens.clone());
        let err = extract(request).await.unwrap_err();
        assert_eq!(err.message(), "Missing Authorization header");

        let mut request = Request::builder()
            .header(header::AUTHORIZATION, "Basic YWRtaW46c2VjcmV0")
            .body(())
            .unwrap();
        request.extensions_mut().insert(tokens.clone());
        let err = extract(request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let mut request = Request::builder()
            .header(header::AUTHORIZATION, "Bearer garbage")
            .body(())
            .unwrap();
        request.extensions_mut().insert(tokens.clone());
        let err = extract(request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Unauthorized");

        let token = tokens.issue("admin", Role::Admin, Utc::now()).unwrap();
        let mut request = Request::builder()
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap();
        request.extensions_mut().insert(tokens);
        let AuthUser(claims) = extract(request).await.unwrap();
        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn require_role_accepts_matching_role() {
        let user = AuthUser(Claims {
            sub: "admin".into(),
            role: Role::Admin,
            iat: 0,
            exp: 1,
        });
        assert!(user.require_role(Role::Admin).is_ok());
    }
}
