//! Shared types and OpenAPI schemas.
//!
//! Observations produced by the probes and the consolidated [`Snapshot`]
//! served to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Name reported for BLE advertisers that do not broadcast one.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// One visible Wi-Fi network.
///
/// Several access points broadcasting the same SSID show up as separate
/// observations with the same `ssid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "ssid": "HomeNet", "signal_dbm": -50.0 }))]
pub struct WifiObservation {
    /// Network name.
    #[schema(example = "HomeNet")]
    pub ssid: String,

    /// Signal strength in dBm.
    #[schema(example = -50.0)]
    pub signal_dbm: f64,
}

impl WifiObservation {
    /// Create an observation from an SSID and a dBm reading.
    pub fn new(ssid: impl Into<String>, signal_dbm: f64) -> Self {
        Self {
            ssid: ssid.into(),
            signal_dbm,
        }
    }
}

/// Convert a signal quality percentage into dBm (`percent / 2 - 100`),
/// rounded to one decimal place.
#[must_use]
pub fn percent_to_dbm(percent: u8) -> f64 {
    let dbm = f64::from(percent) / 2.0 - 100.0;
    (dbm * 10.0).round() / 10.0
}

/// One nearby BLE advertiser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Pixel 8",
    "address": "AA:BB:CC:DD:EE:FF",
    "signal_dbm": -62
}))]
pub struct BleObservation {
    /// Advertised name, or `"Unknown"`.
    #[schema(example = "Pixel 8")]
    pub name: String,

    /// Device address.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub address: String,

    /// RSSI in dBm.
    #[schema(example = -62)]
    pub signal_dbm: i16,
}

impl BleObservation {
    /// Create an observation, substituting `"Unknown"` for a missing name.
    pub fn new(name: Option<String>, address: impl Into<String>, signal_dbm: i16) -> Self {
        Self {
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string()),
            address: address.into(),
            signal_dbm,
        }
    }
}

/// Raw throughput numbers returned by a speed probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpeedMeasurement {
    /// Download throughput in Mbit/s.
    pub download_mbps: f64,
    /// Upload throughput in Mbit/s.
    pub upload_mbps: f64,
    /// Round-trip latency in milliseconds.
    pub ping_ms: f64,
}

/// Internet reachability and throughput.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "connected": true,
    "download_mbps": 94.12,
    "upload_mbps": 38.5,
    "ping_ms": 12.31
}))]
pub struct InternetStatus {
    /// Whether the last speed measurement succeeded.
    pub connected: bool,

    /// Download throughput in Mbit/s (0 when disconnected).
    #[schema(example = 94.12)]
    pub download_mbps: f64,

    /// Upload throughput in Mbit/s (0 when disconnected).
    #[schema(example = 38.5)]
    pub upload_mbps: f64,

    /// Latency in milliseconds (-1 when disconnected).
    #[schema(example = 12.31)]
    pub ping_ms: f64,
}

impl InternetStatus {
    /// The value published when a measurement has never succeeded or just failed.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            download_mbps: 0.0,
            upload_mbps: 0.0,
            ping_ms: -1.0,
        }
    }

    /// The value published after a successful measurement.
    #[must_use]
    pub const fn connected(measurement: SpeedMeasurement) -> Self {
        Self {
            connected: true,
            download_mbps: measurement.download_mbps,
            upload_mbps: measurement.upload_mbps,
            ping_ms: measurement.ping_ms,
        }
    }
}

impl Default for InternetStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// The consolidated view of the radio environment.
///
/// Wi-Fi, rogue and BLE fields always come from the same fast scan cycle.
/// `internet` is refreshed on its own cadence and may be older.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "wifi": [
        { "ssid": "HomeNet", "signal_dbm": -50.0 },
        { "ssid": "EvilTwin", "signal_dbm": -40.0 }
    ],
    "rogue_aps": ["EvilTwin"],
    "ble": [
        { "name": "Pixel 8", "address": "AA:BB:CC:DD:EE:FF", "signal_dbm": -62 }
    ],
    "ble_available": true,
    "internet": {
        "connected": true,
        "download_mbps": 94.12,
        "upload_mbps": 38.5,
        "ping_ms": 12.31
    },
    "timestamp": "2025-01-15T03:30:00Z",
    "version": 42
}))]
pub struct Snapshot {
    /// Visible Wi-Fi networks.
    pub wifi: Vec<WifiObservation>,

    /// SSIDs in `wifi` that are absent from the baseline, sorted.
    pub rogue_aps: Vec<String>,

    /// Nearby BLE advertisers.
    pub ble: Vec<BleObservation>,

    /// `false` when the BLE probe failed this cycle or BLE is unusable on this host.
    pub ble_available: bool,

    /// Internet reachability and throughput.
    pub internet: InternetStatus,

    /// Time of the most recent write by either scan loop. `None` before the first write.
    pub timestamp: Option<DateTime<Utc>>,

    /// Incremented on every write.
    pub version: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            wifi: Vec::new(),
            rogue_aps: Vec::new(),
            ble: Vec::new(),
            ble_available: false,
            internet: InternetStatus::disconnected(),
            timestamp: None,
            version: 0,
        }
    }
}
