//! # wible-core
//!
//! Scan engine for the wible wireless environment monitor.
//!
//! This crate provides:
//! - Periodic Wi-Fi and BLE scanning behind pluggable probes
//! - Rogue access point detection against a baseline frozen at first scan
//! - Internet speed testing on a separate, slower cadence
//! - A versioned snapshot that readers can fetch without waiting on scans
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`probe`] - Probe traits and the netsh/nmcli, BlueZ and HTTP adapters
//! - [`rogue`] - Baseline capture and set-difference rogue detection
//! - [`store`] - The shared snapshot and its atomic merge operations
//! - [`scan`] - Fast and slow scan loops
//! - [`orchestrator`] - Loop lifecycle, on-demand rescans, snapshot queries
//! - [`config`] - Layered configuration loading and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod rogue;
pub mod scan;
pub mod store;
pub mod types;

// Re-export primary types for convenience
pub use config::{
    ConfigError, ConfigResult, ScanConfig, ServerConfig, SpeedTestConfig, WibleConfig,
    WifiBackend, WifiConfig,
};
pub use error::{Result, WibleError};
pub use orchestrator::{Lifecycle, Orchestrator, Probes, RescanAck};
pub use probe::{BleProbe, ProbeError, ProbeResult, SpeedProbe, WifiProbe};
pub use rogue::{detect_rogue, Baseline};
pub use scan::ScanCounters;
pub use store::SnapshotStore;
pub use types::{
    BleObservation, InternetStatus, Snapshot, SpeedMeasurement, WifiObservation,
    UNKNOWN_DEVICE_NAME,
};
