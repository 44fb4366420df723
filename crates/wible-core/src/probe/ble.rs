//! BLE advertiser discovery.
//!
//! On Linux with the `bluetooth` feature, [`BluerBleProbe`] drives BlueZ
//! through `bluer`. Builds without the feature use [`UnsupportedBleProbe`],
//! which reports the capability as unavailable so the scan loop backs off.
//!
//! Only a host that has no adapter at all is reported as unavailable. A
//! `bluetoothd` that is down or restarting is an ordinary failure and is
//! retried on the next cycle.

use std::time::Duration;

use async_trait::async_trait;

use super::{BleProbe, ProbeError, ProbeResult};
use crate::types::BleObservation;

/// BLE probe for hosts without a usable BLE stack.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedBleProbe;

#[async_trait]
impl BleProbe for UnsupportedBleProbe {
    async fn discover(&self, _timeout: Duration) -> ProbeResult<Vec<BleObservation>> {
        Err(ProbeError::unavailable(
            "built without Bluetooth support (enable the `bluetooth` feature)",
        ))
    }
}

#[cfg(feature = "bluetooth")]
pub use bluez::BluerBleProbe;

#[cfg(feature = "bluetooth")]
mod bluez {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use async_trait::async_trait;
    use bluer::{AdapterEvent, Address, ErrorKind, Session};
    use futures::{pin_mut, StreamExt};
    use tracing::{debug, warn};

    use super::super::{BleProbe, ProbeError, ProbeResult};
    use crate::types::BleObservation;

    /// BLE probe backed by BlueZ via `bluer`.
    ///
    /// Opens a fresh session per discovery so a restarted `bluetoothd` is
    /// picked up on the next cycle.
    #[derive(Debug, Clone, Default)]
    pub struct BluerBleProbe;

    #[async_trait]
    impl BleProbe for BluerBleProbe {
        async fn discover(&self, timeout: Duration) -> ProbeResult<Vec<BleObservation>> {
            let session = Session::new()
                .await
                .map_err(|e| ProbeError::failed(format!("BlueZ session: {e}")))?;
            let adapter = session
                .default_adapter()
                .await
                .map_err(|e| adapter_error(&e.kind, &e))?;

            if !adapter.is_powered().await.unwrap_or(false) {
                adapter
                    .set_powered(true)
                    .await
                    .map_err(|e| ProbeError::failed(format!("cannot power on adapter: {e}")))?;
            }

            let events = adapter
                .discover_devices()
                .await
                .map_err(|e| ProbeError::failed(format!("discovery failed to start: {e}")))?;
            pin_mut!(events);

            let mut seen: BTreeSet<Address> = BTreeSet::new();
            let deadline = tokio::time::sleep(timeout);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    () = &mut deadline => break,
                    event = events.next() => match event {
                        Some(AdapterEvent::DeviceAdded(address)) => {
                            seen.insert(address);
                        }
                        Some(_) => {}
                        None => break,
                    },
                }
            }

            let mut devices = Vec::with_capacity(seen.len());
            for address in seen {
                let device = match adapter.device(address) {
                    Ok(device) => device,
                    Err(e) => {
                        warn!(%address, error = %e, "Discovered device vanished");
                        continue;
                    }
                };
                let Some(rssi) = device.rssi().await.ok().flatten() else {
                    continue;
                };
                let name = device.name().await.ok().flatten();
                devices.push(BleObservation::new(name, address.to_string(), rssi));
            }

            debug!(count = devices.len(), "BLE discovery finished");
            Ok(devices)
        }
    }

    /// Classifies a failure to obtain the default adapter.
    pub(super) fn adapter_error(kind: &ErrorKind, err: impl std::fmt::Display) -> ProbeError {
        match kind {
            ErrorKind::NotFound | ErrorKind::NotSupported => {
                ProbeError::unavailable(format!("no Bluetooth adapter: {err}"))
            }
            _ => ProbeError::failed(format!("Bluetooth adapter: {err}")),
        }
    }
}
