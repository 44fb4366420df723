//! Scan orchestration: lifecycle of the fast and slow loops.
//!
//! [`Orchestrator`] owns the [`SnapshotStore`], both scanners, and the
//! cancellation token that stops them. It is the single entry point the HTTP
//! layer talks to.
//!
//! ```rust,no_run
//! use wible_core::{Orchestrator, WibleConfig};
//!
//! # async fn run() -> wible_core::Result<()> {
//! let config = WibleConfig::load()?;
//! let orchestrator = Orchestrator::from_config(&config);
//! orchestrator.start().await?;
//!
//! let snapshot = orchestrator.snapshot().await;
//! println!("{} networks, {} rogue", snapshot.wifi.len(), snapshot.rogue_aps.len());
//!
//! orchestrator.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{ScanConfig, WibleConfig};
use crate::error::{Result, WibleError};
use crate::probe::{BleProbe, HttpSpeedProbe, SpeedProbe, SystemWifiProbe, WifiProbe};
use crate::rogue::Baseline;
use crate::scan::{FastScanner, ScanCounters, ScanStats, SlowScanner};
use crate::store::SnapshotStore;
use crate::types::Snapshot;

/// The probes an [`Orchestrator`] drives.
#[derive(Clone)]
pub struct Probes {
    /// Wi-Fi lister.
    pub wifi: Arc<dyn WifiProbe>,
    /// BLE discoverer.
    pub ble: Arc<dyn BleProbe>,
    /// Speed tester. `None` disables the slow loop.
    pub speed: Option<Arc<dyn SpeedProbe>>,
}

impl Probes {
    /// The host's real probes, selected from `config`.
    #[must_use]
    pub fn system(config: &WibleConfig) -> Self {
        let speed = if config.scan.speed_test_enabled {
            match HttpSpeedProbe::new(config.speed_test.clone()) {
                Ok(probe) => Some(Arc::new(probe) as Arc<dyn SpeedProbe>),
                Err(e) => {
                    warn!(error = %e, "Speed test disabled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            wifi: Arc::new(SystemWifiProbe::from_config(&config.wifi)),
            ble: system_ble_probe(),
            speed,
        }
    }
}

#[cfg(feature = "bluetooth")]
fn system_ble_probe() -> Arc<dyn BleProbe> {
    Arc::new(crate::probe::BluerBleProbe)
}

#[cfg(not(feature = "bluetooth"))]
fn system_ble_probe() -> Arc<dyn BleProbe> {
    Arc::new(crate::probe::UnsupportedBleProbe)
}

/// Where an [`Orchestrator`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Constructed, loops not spawned yet.
    NotStarted,
    /// Loops running.
    Running,
    /// Shut down. Cannot be restarted.
    Stopped,
}

/// Acknowledgement of an out-of-cycle rescan.
///
/// Requests made while a rescan is still running get that rescan's ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RescanAck {
    /// Correlates the request with the rescan's log lines.
    pub id: Uuid,
    /// When the rescan was requested.
    pub requested_at: DateTime<Utc>,
}

struct LoopState {
    lifecycle: Lifecycle,
    handles: Vec<JoinHandle<()>>,
}

type RescanSlot = Arc<Mutex<Option<RescanAck>>>;

/// Frees the rescan slot when the rescan task ends, however it ends.
struct InFlightRescan(RescanSlot);

impl Drop for InFlightRescan {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Drives the fast and slow scan loops over a shared snapshot store.
pub struct Orchestrator {
    store: Arc<SnapshotStore>,
    stats: Arc<ScanStats>,
    fast: Arc<FastScanner>,
    slow: Option<Arc<SlowScanner>>,
    fast_interval: Duration,
    slow_interval: Duration,
    cancel: CancellationToken,
    state: Mutex<LoopState>,
    rescan: RescanSlot,
}

impl Orchestrator {
    /// Build an orchestrator around `probes`.
    ///
    /// The speed probe is ignored when `config.speed_test_enabled` is off.
    #[must_use]
    pub fn new(config: &ScanConfig, probes: Probes) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let stats = Arc::new(ScanStats::default());

        let fast = Arc::new(FastScanner::new(
            probes.wifi,
            probes.ble,
            Arc::clone(&store),
            Arc::clone(&stats),
            config,
        ));
        let slow = probes
            .speed
            .filter(|_| config.speed_test_enabled)
            .map(|speed| {
                Arc::new(SlowScanner::new(
                    speed,
                    Arc::clone(&store),
                    Arc::clone(&stats),
                    config.speed_test_timeout(),
                ))
            });

        Self {
            store,
            stats,
            fast,
            slow,
            fast_interval: config.fast_interval(),
            slow_interval: config.slow_interval(),
            cancel: CancellationToken::new(),
            state: Mutex::new(LoopState {
                lifecycle: Lifecycle::NotStarted,
                handles: Vec::new(),
            }),
            rescan: Arc::new(Mutex::new(None)),
        }
    }

    /// Build an orchestrator with the host's real probes.
    #[must_use]
    pub fn from_config(config: &WibleConfig) -> Self {
        Self::new(&config.scan, Probes::system(config))
    }

    fn state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one fast cycle, then spawn the periodic loops.
    ///
    /// When this returns, the snapshot already holds a Wi-Fi/BLE scan. The
    /// first speed test runs in the background.
    ///
    /// # Errors
    ///
    /// - [`WibleError::AlreadyStarted`] if called more than once
    /// - [`WibleError::RuntimeUnavailable`] outside a Tokio runtime
    pub async fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| WibleError::RuntimeUnavailable)?;

        {
            let mut state = self.state();
            if state.lifecycle != Lifecycle::NotStarted {
                return Err(WibleError::AlreadyStarted);
            }
            state.lifecycle = Lifecycle::Running;
        }

        info!(
            fast_interval_secs = self.fast_interval.as_secs(),
            slow_interval_secs = self.slow_interval.as_secs(),
            speed_test = self.slow.is_some(),
            "Starting scan loops"
        );

        self.fast.run_cycle().await;

        let mut handles = vec![runtime.spawn(
            Arc::clone(&self.fast).run(self.fast_interval, self.cancel.child_token()),
        )];
        if let Some(slow) = &self.slow {
            handles.push(runtime.spawn(
                Arc::clone(slow).run(self.slow_interval, self.cancel.child_token()),
            ));
        }

        let mut state = self.state();
        if state.lifecycle == Lifecycle::Running {
            state.handles = handles;
        } else {
            // shut down while the initial cycle was running
            self.cancel.cancel();
        }
        Ok(())
    }

    /// The latest snapshot. Never blocks on a scan in progress.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.store.read().await
    }

    /// The rogue-detection baseline.
    pub async fn baseline(&self) -> Baseline {
        self.store.baseline().await
    }

    /// Scan counters so far.
    #[must_use]
    pub fn stats(&self) -> ScanCounters {
        self.stats.counters()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.state().lifecycle
    }

    /// Whether the slow loop exists.
    #[must_use]
    pub const fn speed_test_enabled(&self) -> bool {
        self.slow.is_some()
    }

    /// Whether BLE is probed on the next fast cycle.
    #[must_use]
    pub fn ble_capable(&self) -> bool {
        self.fast.ble_capable()
    }

    /// Fast loop interval.
    #[must_use]
    pub const fn fast_interval(&self) -> Duration {
        self.fast_interval
    }

    /// Slow loop interval.
    #[must_use]
    pub const fn slow_interval(&self) -> Duration {
        self.slow_interval
    }

    /// Start a fast cycle now, outside the regular schedule.
    ///
    /// Returns as soon as the cycle is spawned. If it overlaps a scheduled
    /// cycle, whichever started later wins. While a triggered cycle is still
    /// running, further requests join it and get its ack.
    ///
    /// # Errors
    ///
    /// [`WibleError::NotRunning`] unless the loops are running.
    pub fn trigger_rescan(&self) -> Result<RescanAck> {
        if self.lifecycle() != Lifecycle::Running {
            return Err(WibleError::NotRunning);
        }
        let runtime = Handle::try_current().map_err(|_| WibleError::RuntimeUnavailable)?;

        let mut slot = self.rescan.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ack) = *slot {
            debug!(rescan_id = %ack.id, "Rescan already running, joining it");
            return Ok(ack);
        }

        let ack = RescanAck {
            id: Uuid::now_v7(),
            requested_at: Utc::now(),
        };
        *slot = Some(ack);
        drop(slot);
        self.stats.record_rescan();
        info!(rescan_id = %ack.id, "Rescan requested");

        let in_flight = InFlightRescan(Arc::clone(&self.rescan));
        let fast = Arc::clone(&self.fast);
        let cancel = self.cancel.child_token();
        let span = tracing::info_span!("rescan", rescan_id = %ack.id);
        runtime.spawn(
            async move {
                let _in_flight = in_flight;
                tokio::select! {
                    () = cancel.cancelled() => {}
                    _ = fast.run_cycle() => {}
                }
            }
            .instrument(span),
        );

        Ok(ack)
    }

    /// Stop both loops and wait for them to exit.
    ///
    /// A cycle in flight finishes first. Calling this again is a no-op.
    pub async fn shutdown(&self) {
        let handles = {
            let mut state = self.state();
            if state.lifecycle == Lifecycle::Stopped {
                return;
            }
            state.lifecycle = Lifecycle::Stopped;
            std::mem::take(&mut state.handles)
        };

        self.cancel.cancel();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scan loop ended abnormally");
            }
        }
        info!("Scan loops stopped");
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
