//! Drop Panel: a single-admin file hosting panel.
//!
//! The library holds the JWT auth flow, the folder-scoped upload storage and
//! the Axum router; `main.rs` only parses configuration and serves it.

pub mod auth;
pub mod background;
pub mod config;
pub mod envelope;
pub mod error;
pub mod frontend;
pub mod http;
pub mod logging;
pub mod names;
pub mod routes;
pub mod staging;
pub mod storage;
pub mod token;
pub mod upload;
pub mod version;

shadow_rs::shadow!(build);

pub use auth::{AdminCredentials, AdminUser, AuthError, AuthUser};
pub use config::{AppConfig, Args, ConfigError};
pub use error::ApiError;
pub use routes::{AppServices, build_router};
pub use storage::{Storage, StorageError, UploadError};
pub use token::{Claims, Role, TokenService};
