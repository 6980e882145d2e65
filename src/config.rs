//! CLI arguments, environment configuration and server defaults.

use clap::Parser;
use shadow_rs::formatcp;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const MAX_UPLOAD_SIZE: u64 = 20 * 1024 * 1024;
pub const TOKEN_TTL_HOURS: i64 = 150;
pub const FOLDER_NAME_MAX_LEN: usize = 50;
pub const DEFAULT_FOLDER_NAME: &str = "default";
pub const PUBLIC_UPLOAD_PREFIX: &str = "/storage/uploads";
pub const STAGING_DIR_NAME: &str = ".staging";
pub const DEFAULT_STAGING_TTL_SECS: u64 = 60 * 60;
pub const STAGING_CLEAN_INTERVAL_SECS: u64 = 900;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "drop-panel", version = VERSION_INFO, about = "Drop Panel file hosting server")]
pub struct Args {
    #[arg(
        long,
        env = "ADMIN_USERNAME",
        default_value = "",
        help = "Admin username accepted by /api/auth/login"
    )]
    pub admin_username: String,
    #[arg(
        long,
        env = "ADMIN_PASSWORD",
        default_value = "",
        hide_env_values = true,
        help = "Admin password accepted by /api/auth/login"
    )]
    pub admin_password: String,
    #[arg(
        long,
        env = "JWT_SECRET",
        hide_env_values = true,
        help = "HS256 signing secret for session tokens"
    )]
    pub jwt_secret: Option<String>,
    #[arg(
        short = 's',
        long,
        env = "UPLOAD_BASE_DIR",
        default_value = "storage/uploads",
        help = "Base directory holding upload folders"
    )]
    pub upload_base_dir: String,
    #[arg(
        long,
        env = "UPLOAD_CREATE_BASE_DIR",
        help = "Create the base directory at startup when it is missing"
    )]
    pub create_base_dir: bool,
    #[arg(
        short = 'b',
        long,
        env = "DROP_PANEL_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "DROP_PANEL_PORT",
        default_value_t = 8080,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        long,
        env = "DROP_PANEL_CORS_ORIGINS",
        help = "Comma separated CORS origins"
    )]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "UPLOAD_STAGING_TTL_SECS",
        default_value_t = DEFAULT_STAGING_TTL_SECS,
        help = "Age after which abandoned staged uploads are removed (0 to disable)"
    )]
    pub staging_ttl_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET is not configured")]
    MissingJwtSecret,
    #[error("invalid bind address `{0}`")]
    InvalidBindAddress(String),
}

/// Server configuration resolved once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub admin_username: String,
    pub admin_password: String,
    pub jwt_secret: String,
    pub upload_base_dir: PathBuf,
    pub create_base_dir: bool,
    pub bind_addr: SocketAddr,
    pub cors_origins: Option<String>,
    pub staging_ttl: Duration,
}

impl AppConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let jwt_secret = args
            .jwt_secret
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingJwtSecret)?;
        let host = args
            .host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidBindAddress(args.host.clone()))?;

        Ok(Self {
            admin_username: args.admin_username,
            admin_password: args.admin_password,
            jwt_secret,
            upload_base_dir: PathBuf::from(args.upload_base_dir),
            create_base_dir: args.create_base_dir,
            bind_addr: SocketAddr::new(host, args.port),
            cors_origins: args.cors_origins,
            staging_ttl: Duration::from_secs(args.staging_ttl_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["drop-panel", "--admin-username", "admin"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("parse args")
    }

    #[test]
    fn missing_secret_is_fatal() {
        let mut args = parse(&[]);
        args.jwt_secret = None;
        assert!(matches!(
            AppConfig::from_args(args),
            Err(ConfigError::MissingJwtSecret)
        ));

        let args = parse(&["--jwt-secret", ""]);
        assert!(matches!(
            AppConfig::from_args(args),
            Err(ConfigError::MissingJwtSecret)
        ));
    }

    #[test]
    fn resolves_bind_address_and_paths() {
        let args = parse(&[
            "--jwt-secret",
            "s3cret",
            "-b",
            "127.0.0.1",
            "-p",
            "9000",
            "-s",
            "/srv/uploads",
        ]);
        let config = AppConfig::from_args(args).expect("config");
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.upload_base_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.jwt_secret, "s3cret");
    }

    #[test]
    fn rejects_unparseable_host() {
        let args = parse(&["--jwt-secret", "s3cret", "-b", "localhost"]);
        assert!(matches!(
            AppConfig::from_args(args),
            Err(ConfigError::InvalidBindAddress(host)) if host == "localhost"
        ));
    }
}
