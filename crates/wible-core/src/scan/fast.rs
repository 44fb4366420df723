//! Fast cycle: Wi-Fi listing, BLE discovery, rogue detection.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{run_periodic, ScanStats};
use crate::config::ScanConfig;
use crate::probe::{with_timeout, BleProbe, WifiProbe};
use crate::store::{FastUpdate, FastWriteOutcome, SnapshotStore};
use crate::types::{BleObservation, WifiObservation};

/// Extra time granted to a BLE probe on top of its discovery window, for
/// adapter setup and reading device properties afterwards.
const BLE_GRACE: Duration = Duration::from_secs(4);

/// How long BLE is skipped after the probe reports no adapter.
pub const BLE_RECHECK: Duration = Duration::from_secs(300);

/// Runs fast cycles against a Wi-Fi and a BLE probe.
pub struct FastScanner {
    wifi: Arc<dyn WifiProbe>,
    ble: Arc<dyn BleProbe>,
    store: Arc<SnapshotStore>,
    stats: Arc<ScanStats>,
    wifi_timeout: Duration,
    ble_window: Duration,
    /// Set while BLE is skipped after an unavailable report.
    ble_recheck_at: Mutex<Option<Instant>>,
}

impl FastScanner {
    /// Create a scanner writing into `store`.
    #[must_use]
    pub fn new(
        wifi: Arc<dyn WifiProbe>,
        ble: Arc<dyn BleProbe>,
        store: Arc<SnapshotStore>,
        stats: Arc<ScanStats>,
        config: &ScanConfig,
    ) -> Self {
        Self {
            wifi,
            ble,
            store,
            stats,
            wifi_timeout: config.wifi_timeout(),
            ble_window: config.ble_discovery_timeout(),
            ble_recheck_at: Mutex::new(None),
        }
    }

    /// Whether BLE is probed on the next cycle.
    ///
    /// Turns `false` when the probe reports the capability missing, and back
    /// to `true` once a later check after [`BLE_RECHECK`] succeeds.
    #[must_use]
    pub fn ble_capable(&self) -> bool {
        self.recheck_at().is_none()
    }

    fn recheck_at(&self) -> Option<Instant> {
        *self
            .ble_recheck_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_recheck_at(&self, at: Option<Instant>) -> Option<Instant> {
        let mut guard = self
            .ble_recheck_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, at)
    }

    /// Run one cycle and publish it.
    ///
    /// Wi-Fi and BLE are probed concurrently. A failed probe degrades only
    /// its own fields: Wi-Fi to an empty list with no rogues, BLE to an empty
    /// list with `ble_available = false`.
    pub async fn run_cycle(&self) -> FastWriteOutcome {
        let generation = self.store.begin_fast_cycle();
        let (wifi, ble) = tokio::join!(self.scan_wifi(), self.scan_ble());

        let wifi_count = wifi.as_ref().map(Vec::len);
        let ble_count = ble.as_ref().map(Vec::len);

        let outcome = self
            .store
            .write_fast(FastUpdate {
                generation,
                wifi,
                ble,
            })
            .await;
        self.stats.record_fast_cycle();

        match outcome {
            FastWriteOutcome::Published {
                version,
                rogue_count,
                ..
            } => {
                if rogue_count > 0 {
                    info!(version, rogue_count, "Rogue access points in range");
                }
                debug!(
                    generation,
                    version,
                    wifi = ?wifi_count,
                    ble = ?ble_count,
                    "Fast scan published"
                );
            }
            FastWriteOutcome::Stale => self.stats.record_stale_result(),
        }

        outcome
    }

    async fn scan_wifi(&self) -> Option<Vec<WifiObservation>> {
        match with_timeout(self.wifi_timeout, self.wifi.list_networks()).await {
            Ok(networks) => Some(networks),
            Err(e) => {
                self.stats.record_wifi_failure();
                warn!(error = %e, "Wi-Fi scan failed");
                None
            }
        }
    }

    async fn scan_ble(&self) -> Option<Vec<BleObservation>> {
        if self.recheck_at().is_some_and(|at| Instant::now() < at) {
            return None;
        }

        let budget = self.ble_window + BLE_GRACE;
        match with_timeout(budget, self.ble.discover(self.ble_window)).await {
            Ok(devices) => {
                if self.set_recheck_at(None).is_some() {
                    info!("BLE available again, resuming BLE scans");
                }
                Some(devices)
            }
            Err(e) if e.is_unavailable() => {
                self.stats.record_ble_failure();
                let previous = self.set_recheck_at(Some(Instant::now() + BLE_RECHECK));
                if previous.is_none() {
                    warn!(
                        error = %e,
                        recheck_secs = BLE_RECHECK.as_secs(),
                        "BLE unavailable on this host, pausing BLE scans"
                    );
                } else {
                    debug!(error = %e, "BLE still unavailable");
                }
                None
            }
            Err(e) => {
                self.stats.record_ble_failure();
                warn!(error = %e, "BLE scan failed");
                None
            }
        }
    }

    /// Scheduled fast cycles every `period` until `cancel` fires.
    ///
    /// The first cycle waits one period; callers run the initial cycle
    /// themselves.
    pub async fn run(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        run_periodic("fast", period, false, cancel, || {
            let scanner = Arc::clone(&self);
            async move {
                scanner.run_cycle().await;
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::mock::{MockBleProbe, MockWifiProbe};
    use crate::probe::ProbeError;
    use crate::types::BleObservation;

    fn scanner(wifi: MockWifiProbe, ble: MockBleProbe) -> (FastScanner, Arc<SnapshotStore>) {
        let store = Arc::new(SnapshotStore::new());
        let scanner = FastScanner::new(
            Arc::new(wifi),
            Arc::new(ble),
            Arc::clone(&store),
            Arc::new(ScanStats::default()),
            &ScanConfig::default(),
        );
        (scanner, store)
    }

    fn ssids(snapshot: &crate::types::Snapshot) -> Vec<&str> {
        snapshot.wifi.iter().map(|w| w.ssid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_home_net_then_evil_twin() {
        let wifi = MockWifiProbe::new(vec![
            Ok(vec![
                WifiObservation::new("HomeNet", -45.0),
                WifiObservation::new("Neighbor", -70.0),
            ]),
            Ok(vec![
                WifiObservation::new("HomeNet", -46.0),
                WifiObservation::new("Neighbor", -71.0),
                WifiObservation::new("EvilTwin", -40.0),
            ]),
        ]);
        let (scanner, store) = scanner(wifi, MockBleProbe::empty());

        scanner.run_cycle().await;
        let first = store.read().await;
        assert_eq!(ssids(&first), vec!["HomeNet", "Neighbor"]);
        assert!(first.rogue_aps.is_empty());

        scanner.run_cycle().await;
        let second = store.read().await;
        assert_eq!(second.rogue_aps, vec!["EvilTwin".to_string()]);
    }

    #[tokio::test]
    async fn test_ble_failure_keeps_wifi() {
        let wifi = MockWifiProbe::fixed(&[("HomeNet", -45.0)]);
        let ble = MockBleProbe::new(vec![Err(ProbeError::failed("adapter busy"))]);
        let (scanner, store) = scanner(wifi, ble);

        scanner.run_cycle().await;
        let snapshot = store.read().await;
        assert_eq!(ssids(&snapshot), vec!["HomeNet"]);
        assert!(snapshot.ble.is_empty());
        assert!(!snapshot.ble_available);
        assert!(scanner.ble_capable());
    }

    #[tokio::test]
    async fn test_wifi_failure_clears_wifi_and_rogues() {
        let wifi = MockWifiProbe::new(vec![
            Ok(vec![WifiObservation::new("HomeNet", -45.0)]),
            Ok(vec![
                WifiObservation::new("HomeNet", -45.0),
                WifiObservation::new("EvilTwin", -40.0),
            ]),
            Err(ProbeError::failed("netsh exited 1")),
        ]);
        let ble = MockBleProbe::new(vec![Ok(vec![BleObservation::new(
            Some("Watch".into()),
            "AA:BB:CC:DD:EE:FF",
            -60,
        )])]);
        let (scanner, store) = scanner(wifi, ble);

        scanner.run_cycle().await;
        scanner.run_cycle().await;
        assert_eq!(store.read().await.rogue_aps.len(), 1);

        scanner.run_cycle().await;
        let snapshot = store.read().await;
        assert!(snapshot.wifi.is_empty());
        assert!(snapshot.rogue_aps.is_empty());
        assert_eq!(snapshot.ble.len(), 1);
        assert!(snapshot.ble_available);
        assert!(store.baseline().await.is_captured());
    }

    #[tokio::test]
    async fn test_unavailable_ble_is_skipped_during_backoff() {
        let ble = Arc::new(MockBleProbe::new(vec![Err(ProbeError::unavailable(
            "no adapter",
        ))]));
        let store = Arc::new(SnapshotStore::new());
        let stats = Arc::new(ScanStats::default());
        let scanner = FastScanner::new(
            Arc::new(MockWifiProbe::fixed(&[("HomeNet", -45.0)])),
            Arc::clone(&ble) as Arc<dyn BleProbe>,
            Arc::clone(&store),
            Arc::clone(&stats),
            &ScanConfig::default(),
        );

        scanner.run_cycle().await;
        scanner.run_cycle().await;
        scanner.run_cycle().await;

        assert_eq!(ble.calls(), 1);
        assert!(!scanner.ble_capable());
        assert!(!store.read().await.ble_available);
        assert_eq!(stats.counters().ble_failures, 1);
        assert_eq!(stats.counters().fast_cycles, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_ble_is_rechecked_after_backoff() {
        let ble = Arc::new(MockBleProbe::new(vec![
            Err(ProbeError::unavailable("no adapter")),
            Ok(vec![BleObservation::new(
                Some("Watch".into()),
                "AA:BB:CC:DD:EE:FF",
                -60,
            )]),
        ]));
        let store = Arc::new(SnapshotStore::new());
        let scanner = FastScanner::new(
            Arc::new(MockWifiProbe::fixed(&[("HomeNet", -45.0)])),
            Arc::clone(&ble) as Arc<dyn BleProbe>,
            Arc::clone(&store),
            Arc::new(ScanStats::default()),
            &ScanConfig::default(),
        );

        scanner.run_cycle().await;
        assert!(!scanner.ble_capable());

        tokio::time::sleep(BLE_RECHECK - Duration::from_secs(1)).await;
        scanner.run_cycle().await;
        assert_eq!(ble.calls(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        scanner.run_cycle().await;
        assert_eq!(ble.calls(), 2);
        assert!(scanner.ble_capable());

        let snapshot = store.read().await;
        assert!(snapshot.ble_available);
        assert_eq!(snapshot.ble.len(), 1);
    }

    #[tokio::test]
    async fn test_transient_ble_failure_recovers_next_cycle() {
        let ble = Arc::new(MockBleProbe::new(vec![
            Err(ProbeError::failed("BlueZ session: ServiceUnknown")),
            Ok(vec![BleObservation::new(
                Some("Watch".into()),
                "AA:BB:CC:DD:EE:FF",
                -60,
            )]),
        ]));
        let store = Arc::new(SnapshotStore::new());
        let scanner = FastScanner::new(
            Arc::new(MockWifiProbe::fixed(&[("HomeNet", -45.0)])),
            Arc::clone(&ble) as Arc<dyn BleProbe>,
            Arc::clone(&store),
            Arc::new(ScanStats::default()),
            &ScanConfig::default(),
        );

        scanner.run_cycle().await;
        assert!(!store.read().await.ble_available);
        assert!(scanner.ble_capable());

        scanner.run_cycle().await;
        assert_eq!(ble.calls(), 2);
        let snapshot = store.read().await;
        assert!(snapshot.ble_available);
        assert_eq!(snapshot.ble.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_wifi_probe_times_out() {
        let wifi = MockWifiProbe::fixed(&[("HomeNet", -45.0)]).with_delay(Duration::from_secs(600));
        let (scanner, store) = scanner(wifi, MockBleProbe::empty());

        let outcome = scanner.run_cycle().await;
        assert!(matches!(outcome, FastWriteOutcome::Published { .. }));

        let snapshot = store.read().await;
        assert!(snapshot.wifi.is_empty());
        assert!(snapshot.ble_available);
        assert!(!store.baseline().await.is_captured());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slower_overlapping_cycle_is_discarded() {
        let store = Arc::new(SnapshotStore::new());
        let stats = Arc::new(ScanStats::default());
        let config = ScanConfig::default();

        let slow = Arc::new(FastScanner::new(
            Arc::new(MockWifiProbe::fixed(&[("Old", -50.0)]).with_delay(Duration::from_secs(5))),
            Arc::new(MockBleProbe::empty()),
            Arc::clone(&store),
            Arc::clone(&stats),
            &config,
        ));
        let quick = FastScanner::new(
            Arc::new(MockWifiProbe::fixed(&[("New", -50.0)])),
            Arc::new(MockBleProbe::empty()),
            Arc::clone(&store),
            Arc::clone(&stats),
            &config,
        );

        let pending = tokio::spawn({
            let slow = Arc::clone(&slow);
            async move { slow.run_cycle().await }
        });
        tokio::task::yield_now().await;

        quick.run_cycle().await;
        assert_eq!(pending.await.unwrap(), FastWriteOutcome::Stale);

        let snapshot = store.read().await;
        assert_eq!(ssids(&snapshot), vec!["New"]);
        assert_eq!(stats.counters().stale_results, 1);
    }
}
