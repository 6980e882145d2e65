//! Drop Panel server binary.

use clap::Parser;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use drop_panel::background::spawn_background_tasks;
use drop_panel::logging;
use drop_panel::{
    AdminCredentials, AppConfig, AppServices, Args, Storage, TokenService, build_router,
};

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), io::Error> {
    logging::init_logging();

    let config = AppConfig::from_args(Args::parse()).map_err(|err| {
        error!(error = %err, "invalid configuration");
        io::Error::other(err)
    })?;
    let tokens = Arc::new(TokenService::new(&config.jwt_secret).map_err(io::Error::other)?);

    let storage = Arc::new(Storage::new(config.upload_base_dir.clone()));
    if config.create_base_dir {
        storage.ensure_root().await?;
    } else if !storage.root_path().is_dir() {
        warn!(
            path = ?storage.root_path(),
            "upload base directory does not exist; storage requests will fail"
        );
    }

    if config.admin_username.is_empty() || config.admin_password.is_empty() {
        warn!("admin credentials are not configured; login is disabled");
    }
    let credentials = Arc::new(AdminCredentials::new(
        config.admin_username.clone(),
        config.admin_password.clone(),
    ));

    let services = AppServices {
        storage: storage.clone(),
        credentials,
        tokens,
    };
    let app = build_router(&services, config.cors_origins.as_deref());

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        "🚀 Starting HTTP server at {} (storage: {})",
        config.bind_addr,
        storage.root_path().display()
    );

    spawn_background_tasks(storage, config.staging_ttl);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
}
