//! Periodic scan loops.
//!
//! - [`FastScanner`] - Wi-Fi + BLE + rogue detection, every few seconds
//! - [`SlowScanner`] - speed test, on its own slower cadence
//!
//! Both write into the shared [`SnapshotStore`](crate::store::SnapshotStore)
//! and never wait on each other. Probe failures are absorbed here, counted in
//! [`ScanStats`], and only degrade the fields they feed.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use utoipa::ToSchema;

pub mod fast;
pub mod slow;

pub use fast::FastScanner;
pub use slow::SlowScanner;

/// Live counters shared by the scan loops.
#[derive(Debug, Default)]
pub struct ScanStats {
    fast_cycles: AtomicU64,
    wifi_failures: AtomicU64,
    ble_failures: AtomicU64,
    stale_results: AtomicU64,
    slow_cycles: AtomicU64,
    speed_failures: AtomicU64,
    rescans_triggered: AtomicU64,
}

impl ScanStats {
    pub(crate) fn record_fast_cycle(&self) {
        self.fast_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wifi_failure(&self) {
        self.wifi_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ble_failure(&self) {
        self.ble_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_result(&self) {
        self.stale_results.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_slow_cycle(&self) {
        self.slow_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_speed_failure(&self) {
        self.speed_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rescan(&self) {
        self.rescans_triggered.fetch_add(1, Ordering::Relaxed);
    }

    /// A point-in-time copy of the counters.
    #[must_use]
    pub fn counters(&self) -> ScanCounters {
        ScanCounters {
            fast_cycles: self.fast_cycles.load(Ordering::Relaxed),
            wifi_failures: self.wifi_failures.load(Ordering::Relaxed),
            ble_failures: self.ble_failures.load(Ordering::Relaxed),
            stale_results: self.stale_results.load(Ordering::Relaxed),
            slow_cycles: self.slow_cycles.load(Ordering::Relaxed),
            speed_failures: self.speed_failures.load(Ordering::Relaxed),
            rescans_triggered: self.rescans_triggered.load(Ordering::Relaxed),
        }
    }
}

/// Scan counters at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScanCounters {
    /// Fast cycles completed (scheduled and triggered).
    pub fast_cycles: u64,
    /// Fast cycles whose Wi-Fi probe failed or timed out.
    pub wifi_failures: u64,
    /// Fast cycles whose BLE probe failed, timed out, or was unavailable.
    pub ble_failures: u64,
    /// Fast results discarded because a newer cycle had already published.
    pub stale_results: u64,
    /// Speed tests completed.
    pub slow_cycles: u64,
    /// Speed tests that failed or timed out.
    pub speed_failures: u64,
    /// Out-of-cycle rescans started. Requests that joined a running one are
    /// not counted.
    pub rescans_triggered: u64,
}

/// Run `tick` every `period` until `cancel` fires.
///
/// Fixed delay: the wait starts after the previous tick finishes, so ticks
/// of one loop never overlap. With `immediate` the first tick runs before
/// the first wait. Cancellation is observed between ticks only.
pub(crate) async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    immediate: bool,
    cancel: CancellationToken,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    debug!(loop_name = name, period_secs = period.as_secs(), "Scan loop started");

    if immediate && !cancel.is_cancelled() {
        tick().await;
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(period) => {}
        }
        tick().await;
    }

    debug!(loop_name = name, "Scan loop stopped");
}
