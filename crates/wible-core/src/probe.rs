//! Probe contracts and platform adapters.
//!
//! The scan loops talk to the radio environment only through three traits:
//!
//! - [`WifiProbe`] - list visible Wi-Fi networks
//! - [`BleProbe`] - discover BLE advertisers for a bounded time
//! - [`SpeedProbe`] - measure internet throughput and latency
//!
//! Adapters live in the submodules. Scripted doubles for tests live in
//! [`mock`] (enabled for unit tests and by the `mock-probes` feature).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{BleObservation, SpeedMeasurement, WifiObservation};

pub mod ble;
pub mod speed;
pub mod wifi;

#[cfg(any(test, feature = "mock-probes"))]
pub mod mock;

pub use ble::UnsupportedBleProbe;
#[cfg(feature = "bluetooth")]
pub use ble::BluerBleProbe;
pub use speed::HttpSpeedProbe;
pub use wifi::{NetshWifiProbe, NmcliWifiProbe, SystemWifiProbe};

/// Why a single probe call produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The probe ran and failed (command error, unparseable output, I/O).
    #[error("probe failed: {message}")]
    Failed {
        /// What went wrong.
        message: String,
    },

    /// The probe did not finish in time.
    #[error("probe timed out after {after_secs} seconds")]
    Timeout {
        /// The budget that was exceeded.
        after_secs: u64,
    },

    /// The host lacks the capability the probe needs (no adapter, no stack).
    #[error("capability unavailable: {message}")]
    Unavailable {
        /// Why the capability is missing.
        message: String,
    },
}

impl ProbeError {
    /// Shorthand for [`ProbeError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Shorthand for [`ProbeError::Unavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether this error means the capability is absent rather than a one-off failure.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result type for probe calls.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Lists currently visible Wi-Fi networks.
#[async_trait]
pub trait WifiProbe: Send + Sync {
    /// Enumerate visible networks with signal strength in dBm.
    async fn list_networks(&self) -> ProbeResult<Vec<WifiObservation>>;
}

/// Discovers nearby BLE advertisers.
#[async_trait]
pub trait BleProbe: Send + Sync {
    /// Discover advertisers for at most `timeout`.
    async fn discover(&self, timeout: Duration) -> ProbeResult<Vec<BleObservation>>;
}

/// Measures internet throughput.
#[async_trait]
pub trait SpeedProbe: Send + Sync {
    /// Run one measurement.
    async fn measure(&self) -> ProbeResult<SpeedMeasurement>;
}

/// Run a probe future with a time budget; expiry becomes [`ProbeError::Timeout`].
pub async fn with_timeout<T, F>(budget: Duration, probe: F) -> ProbeResult<T>
where
    F: Future<Output = ProbeResult<T>>,
{
    tokio::time::timeout(budget, probe)
        .await
        .unwrap_or_else(|_| {
            Err(ProbeError::Timeout {
                after_secs: budget.as_secs(),
            })
        })
}
