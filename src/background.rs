//! Periodic cleanup of abandoned staged uploads.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::STAGING_CLEAN_INTERVAL_SECS;
use crate::staging::cleanup_stale_uploads;
use crate::storage::Storage;

pub fn spawn_background_tasks(storage: Arc<Storage>, staging_ttl: Duration) {
    if staging_ttl.is_zero() {
        debug!("staged upload cleanup disabled");
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(STAGING_CLEAN_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if let Err(err) = cleanup_stale_uploads(&storage, staging_ttl).await {
                warn!(error = %err, "staged upload cleanup failed");
            }
        }
    });
}
