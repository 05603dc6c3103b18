use std::sync::Arc;
use std::time::Duration;

use musicgen::ArtifactStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Periodic removal of expired artifacts from the scratch directory
pub struct Sweeper {
    pub store: Arc<ArtifactStore>,
    pub retention: Duration,
    pub interval: Duration,
}

impl Sweeper {
    /// Run until `shutdown` is cancelled, sweeping once immediately
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => self.sweep_once().await,
                }
            }

            tracing::debug!("artifact sweeper stopped");
        })
    }

    async fn sweep_once(&self) {
        let store = Arc::clone(&self.store);
        let retention = self.retention;

        match tokio::task::spawn_blocking(move || store.sweep(retention)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(removed)) => tracing::info!(removed, "swept expired artifacts"),
            Ok(Err(e)) => tracing::warn!(
                directory = %self.store.directory().display(),
                error = %e,
                "failed to sweep artifacts"
            ),
            Err(e) => tracing::error!(error = %e, "artifact sweep task failed"),
        }
    }
}
