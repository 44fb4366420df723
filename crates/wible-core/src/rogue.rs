//! Rogue access point detection.
//!
//! A rogue AP is any SSID visible now that was not visible in the trusted
//! [`Baseline`]. Comparison is exact: `"HomeNet"` and `"homenet"` are
//! different networks, as are SSIDs that differ only in whitespace.
//! Multiple access points sharing one SSID collapse into that SSID.

use std::collections::BTreeSet;

use crate::types::WifiObservation;

/// Returns `current - baseline`.
#[must_use]
pub fn detect_rogue(current: &BTreeSet<String>, baseline: &BTreeSet<String>) -> BTreeSet<String> {
    current.difference(baseline).cloned().collect()
}

/// Collect the distinct SSIDs of a Wi-Fi scan.
#[must_use]
pub fn ssid_set(wifi: &[WifiObservation]) -> BTreeSet<String> {
    wifi.iter().map(|w| w.ssid.clone()).collect()
}

/// The trusted SSID set, captured once from the first successful Wi-Fi scan
/// that saw at least one network.
///
/// Once non-empty it never changes for the lifetime of the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    ssids: BTreeSet<String>,
}

impl Baseline {
    /// An empty, not yet captured baseline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ssids: BTreeSet::new(),
        }
    }

    /// Whether a baseline has been captured.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        !self.ssids.is_empty()
    }

    /// The captured SSIDs (empty until captured).
    #[must_use]
    pub const fn ssids(&self) -> &BTreeSet<String> {
        &self.ssids
    }

    /// Freeze `ssids` as the baseline if none has been captured yet.
    ///
    /// Returns `true` if this call captured the baseline. Capturing an empty
    /// set leaves the baseline uncaptured.
    pub fn capture_if_empty(&mut self, ssids: &BTreeSet<String>) -> bool {
        if self.is_captured() || ssids.is_empty() {
            return false;
        }
        self.ssids = ssids.clone();
        true
    }

    /// Rogue SSIDs in `current` relative to this baseline.
    #[must_use]
    pub fn rogues(&self, current: &BTreeSet<String>) -> BTreeSet<String> {
        detect_rogue(current, &self.ssids)
    }
}
