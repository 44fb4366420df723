//! Slow cycle: internet speed test.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{run_periodic, ScanStats};
use crate::probe::{with_timeout, SpeedProbe};
use crate::store::SnapshotStore;
use crate::types::InternetStatus;

/// Runs speed tests and publishes the internet fields.
pub struct SlowScanner {
    probe: Arc<dyn SpeedProbe>,
    store: Arc<SnapshotStore>,
    stats: Arc<ScanStats>,
    timeout: Duration,
}

impl SlowScanner {
    /// Create a scanner writing into `store`, giving each test `timeout`.
    #[must_use]
    pub fn new(
        probe: Arc<dyn SpeedProbe>,
        store: Arc<SnapshotStore>,
        stats: Arc<ScanStats>,
        timeout: Duration,
    ) -> Self {
        Self {
            probe,
            store,
            stats,
            timeout,
        }
    }

    /// Run one speed test and publish it.
    ///
    /// A failure or timeout publishes the disconnected sentinel, replacing
    /// whatever measurement was there before.
    pub async fn run_cycle(&self) -> InternetStatus {
        let status = match with_timeout(self.timeout, self.probe.measure()).await {
            Ok(measurement) => InternetStatus::connected(measurement),
            Err(e) => {
                self.stats.record_speed_failure();
                warn!(error = %e, "Speed test failed, reporting disconnected");
                InternetStatus::disconnected()
            }
        };

        let version = self.store.write_slow(status).await;
        self.stats.record_slow_cycle();
        debug!(
            version,
            connected = status.connected,
            download_mbps = status.download_mbps,
            "Speed test published"
        );

        status
    }

    /// Speed tests until `cancel` fires, the first one immediately.
    pub async fn run(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        run_periodic("slow", period, true, cancel, || {
            let scanner = Arc::clone(&self);
            async move {
                scanner.run_cycle().await;
            }
        })
        .await;
    }
}
