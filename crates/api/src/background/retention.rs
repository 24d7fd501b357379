//! Periodic cleanup of old artifacts in the output directory.
//!
//! Spawns a background task that deletes the oldest files once the
//! configured cap is exceeded. Runs on a fixed interval using
//! `tokio::time::interval`; deletion is best-effort and never interferes
//! with running jobs (their records simply go 404 on fetch).

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::files::FileMaterializer;

/// How often the retention sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(600); // 10 minutes

/// Run the artifact retention loop until `cancel` is triggered.
pub async fn run(materializer: FileMaterializer, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Artifact retention job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Artifact retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let deleted = materializer.sweep().await;
                if deleted > 0 {
                    tracing::info!(deleted, "Artifact retention: purged old files");
                } else {
                    tracing::debug!("Artifact retention: nothing to purge");
                }
            }
        }
    }
}
