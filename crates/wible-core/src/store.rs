//! The shared, versioned snapshot of the radio environment.
//!
//! The store is the only shared mutable state in the engine. It owns the
//! current [`Snapshot`] and the rogue-detection [`Baseline`]; both scan loops
//! and the query API go through its atomic read and merge operations.
//!
//! Readers get an `Arc<Snapshot>` that is never mutated after publication.
//! Writers build a fresh snapshot under the write lock and swap it in, so a
//! reader sees either the previous cycle or the next one, never a mix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::rogue::{ssid_set, Baseline};
use crate::types::{BleObservation, InternetStatus, Snapshot, WifiObservation};

/// Results of one fast scan cycle, ready to be merged into the store.
#[derive(Debug, Clone)]
pub struct FastUpdate {
    /// Generation obtained from [`SnapshotStore::begin_fast_cycle`] before probing.
    pub generation: u64,

    /// Wi-Fi scan result. `None` when the probe failed.
    pub wifi: Option<Vec<WifiObservation>>,

    /// BLE scan result. `None` when the probe failed or BLE is unavailable.
    pub ble: Option<Vec<BleObservation>>,
}

/// What happened to a [`FastUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastWriteOutcome {
    /// The update is now visible to readers.
    Published {
        /// Snapshot version after the write.
        version: u64,
        /// Number of rogue SSIDs in the published snapshot.
        rogue_count: usize,
        /// Whether this write froze the baseline.
        baseline_captured: bool,
    },

    /// A newer cycle had already been published; the update was discarded.
    Stale,
}

struct StoreInner {
    snapshot: Arc<Snapshot>,
    baseline: Baseline,
    fast_generation: u64,
}

/// Holder of the current [`Snapshot`] and the [`Baseline`].
pub struct SnapshotStore {
    inner: RwLock<StoreInner>,
    next_generation: AtomicU64,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Create a store holding the default, empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                snapshot: Arc::new(Snapshot::default()),
                baseline: Baseline::new(),
                fast_generation: 0,
            }),
            next_generation: AtomicU64::new(0),
        }
    }

    /// The latest merged snapshot.
    pub async fn read(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.read().await.snapshot)
    }

    /// A copy of the rogue-detection baseline.
    pub async fn baseline(&self) -> Baseline {
        self.inner.read().await.baseline.clone()
    }

    /// Reserve a generation number for a fast cycle that is about to probe.
    pub fn begin_fast_cycle(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Merge one fast cycle's results.
    ///
    /// Under a single write lock this captures the baseline if none exists
    /// and the Wi-Fi probe succeeded, computes rogue APs against it, and
    /// replaces the Wi-Fi, rogue and BLE fields. `internet` is carried over.
    pub async fn write_fast(&self, update: FastUpdate) -> FastWriteOutcome {
        let mut inner = self.inner.write().await;

        if update.generation < inner.fast_generation {
            debug!(
                generation = update.generation,
                latest = inner.fast_generation,
                "Discarding stale fast scan result"
            );
            return FastWriteOutcome::Stale;
        }

        let wifi_ok = update.wifi.is_some();
        let wifi = update.wifi.unwrap_or_default();
        let ssids = ssid_set(&wifi);

        let baseline_captured = wifi_ok && inner.baseline.capture_if_empty(&ssids);
        if baseline_captured {
            info!(ssids = ssids.len(), "Captured Wi-Fi baseline");
        }

        let rogue_aps: Vec<String> = inner.baseline.rogues(&ssids).into_iter().collect();
        let rogue_count = rogue_aps.len();

        let ble_available = update.ble.is_some();
        let version = inner.snapshot.version + 1;

        let next = Snapshot {
            wifi,
            rogue_aps,
            ble: update.ble.unwrap_or_default(),
            ble_available,
            internet: inner.snapshot.internet,
            timestamp: Some(Utc::now()),
            version,
        };
        inner.snapshot = Arc::new(next);
        inner.fast_generation = update.generation;

        FastWriteOutcome::Published {
            version,
            rogue_count,
            baseline_captured,
        }
    }

    /// Replace the internet fields, leaving Wi-Fi, rogue and BLE fields untouched.
    ///
    /// Returns the snapshot version after the write.
    pub async fn write_slow(&self, internet: InternetStatus) -> u64 {
        let mut inner = self.inner.write().await;
        let current = &inner.snapshot;
        let version = current.version + 1;

        let next = Snapshot {
            wifi: current.wifi.clone(),
            rogue_aps: current.rogue_aps.clone(),
            ble: current.ble.clone(),
            ble_available: current.ble_available,
            internet,
            timestamp: Some(Utc::now()),
            version,
        };
        inner.snapshot = Arc::new(next);

        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpeedMeasurement;

    fn wifi(items: &[(&str, f64)]) -> Vec<WifiObservation> {
        items
            .iter()
            .map(|(ssid, dbm)| WifiObservation::new(*ssid, *dbm))
            .collect()
    }

    async fn publish(store: &SnapshotStore, scan: Option<Vec<WifiObservation>>) -> FastWriteOutcome {
        let generation = store.begin_fast_cycle();
        store
            .write_fast(FastUpdate {
                generation,
                wifi: scan,
                ble: Some(Vec::new()),
            })
            .await
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_empty() {
        let store = SnapshotStore::new();
        let snapshot = store.read().await;
        assert!(snapshot.wifi.is_empty());
        assert!(snapshot.timestamp.is_none());
        assert_eq!(snapshot.version, 0);
        assert!(!snapshot.internet.connected);
    }

    #[tokio::test]
    async fn test_first_scan_captures_baseline_and_later_scans_detect_rogues() {
        let store = SnapshotStore::new();

        let outcome = publish(&store, Some(wifi(&[("HomeNet", -50.0)]))).await;
        assert!(matches!(
            outcome,
            FastWriteOutcome::Published {
                baseline_captured: true,
                rogue_count: 0,
                ..
            }
        ));

        publish(&store, Some(wifi(&[("HomeNet", -50.0), ("EvilTwin", -40.0)]))).await;
        let snapshot = store.read().await;
        assert_eq!(snapshot.rogue_aps, vec!["EvilTwin".to_string()]);
        assert_eq!(snapshot.wifi.len(), 2);
    }

    #[tokio::test]
    async fn test_baseline_never_recaptured() {
        let store = SnapshotStore::new();
        publish(&store, Some(wifi(&[("A", -50.0)]))).await;
        publish(&store, Some(wifi(&[("B", -50.0)]))).await;
        publish(&store, Some(wifi(&[("C", -50.0)]))).await;

        let baseline = store.baseline().await;
        assert_eq!(baseline.ssids().len(), 1);
        assert!(baseline.ssids().contains("A"));
    }

    #[tokio::test]
    async fn test_failed_wifi_probe_does_not_capture_or_flag() {
        let store = SnapshotStore::new();

        publish(&store, None).await;
        assert!(!store.baseline().await.is_captured());

        publish(&store, Some(wifi(&[("HomeNet", -50.0)]))).await;
        publish(&store, None).await;

        let snapshot = store.read().await;
        assert!(snapshot.wifi.is_empty());
        assert!(snapshot.rogue_aps.is_empty());
        assert!(store.baseline().await.ssids().contains("HomeNet"));
    }

    #[tokio::test]
    async fn test_fast_write_keeps_internet_and_slow_write_keeps_radio_fields() {
        let store = SnapshotStore::new();
        store
            .write_slow(InternetStatus::connected(SpeedMeasurement {
                download_mbps: 50.0,
                upload_mbps: 10.0,
                ping_ms: 20.0,
            }))
            .await;
        publish(&store, Some(wifi(&[("HomeNet", -50.0)]))).await;

        let snapshot = store.read().await;
        assert!(snapshot.internet.connected);
        assert_eq!(snapshot.wifi.len(), 1);

        store.write_slow(InternetStatus::disconnected()).await;
        let snapshot = store.read().await;
        assert!(!snapshot.internet.connected);
        assert_eq!(snapshot.wifi.len(), 1);
        assert_eq!(snapshot.version, 3);
    }

    #[tokio::test]
    async fn test_ble_failure_marks_unavailable() {
        let store = SnapshotStore::new();
        let generation = store.begin_fast_cycle();
        store
            .write_fast(FastUpdate {
                generation,
                wifi: Some(wifi(&[("HomeNet", -50.0)])),
                ble: None,
            })
            .await;

        let snapshot = store.read().await;
        assert!(!snapshot.ble_available);
        assert!(snapshot.ble.is_empty());
        assert_eq!(snapshot.wifi.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let store = SnapshotStore::new();
        let older = store.begin_fast_cycle();
        let newer = store.begin_fast_cycle();

        store
            .write_fast(FastUpdate {
                generation: newer,
                wifi: Some(wifi(&[("HomeNet", -50.0)])),
                ble: Some(Vec::new()),
            })
            .await;
        let outcome = store
            .write_fast(FastUpdate {
                generation: older,
                wifi: Some(wifi(&[("Old", -50.0)])),
                ble: Some(Vec::new()),
            })
            .await;

        assert_eq!(outcome, FastWriteOutcome::Stale);
        assert_eq!(store.read().await.wifi[0].ssid, "HomeNet");
    }

    #[tokio::test]
    async fn test_held_snapshot_is_not_mutated_by_later_writes() {
        let store = SnapshotStore::new();
        publish(&store, Some(wifi(&[("HomeNet", -50.0)]))).await;
        let held = store.read().await;

        publish(&store, Some(wifi(&[("HomeNet", -50.0), ("EvilTwin", -40.0)]))).await;

        assert_eq!(held.wifi.len(), 1);
        assert!(held.rogue_aps.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_rogues_from_another_cycle() {
        let store = Arc::new(SnapshotStore::new());
        publish(&store, Some(wifi(&[("HomeNet", -50.0)]))).await;

        let mut writers = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            writers.push(tokio::spawn(async move {
                for j in 0..50 {
                    let name = format!("rogue-{i}-{j}");
                    publish(&store, Some(wifi(&[("HomeNet", -50.0), (name.as_str(), -40.0)])))
                        .await;
                    if j % 7 == 0 {
                        store.write_slow(InternetStatus::disconnected()).await;
                    }
                }
            }));
        }

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..500 {
                    let snapshot = store.read().await;
                    let expected: Vec<String> = snapshot
                        .wifi
                        .iter()
                        .filter(|w| w.ssid != "HomeNet")
                        .map(|w| w.ssid.clone())
                        .collect();
                    assert_eq!(snapshot.rogue_aps, expected);
                    tokio::task::yield_now().await;
                }
            })
        };

        for writer in writers {
            writer.await.unwrap();
        }
        reader.await.unwrap();
    }
}
