//! Scripted probe doubles.
//!
//! Each double replays a queue of results, repeating the last one once the
//! queue is drained, and can sleep before answering to simulate a slow probe.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{BleProbe, ProbeError, ProbeResult, SpeedProbe, WifiProbe};
use crate::types::{BleObservation, SpeedMeasurement, WifiObservation};

#[derive(Debug)]
struct Script<T> {
    responses: Mutex<VecDeque<ProbeResult<T>>>,
    last: Mutex<ProbeResult<T>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl<T: Clone> Script<T> {
    fn new(responses: Vec<ProbeResult<T>>, delay: Duration) -> Self {
        let last = responses
            .last()
            .cloned()
            .unwrap_or_else(|| Err(ProbeError::failed("no scripted response")));
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(last),
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    async fn next(&self) -> ProbeResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let popped = self
            .responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(response) = popped {
            *last = response;
        }
        last.clone()
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Scripted [`WifiProbe`].
#[derive(Debug)]
pub struct MockWifiProbe(Script<Vec<WifiObservation>>);

impl MockWifiProbe {
    /// Replay `responses` in order.
    #[must_use]
    pub fn new(responses: Vec<ProbeResult<Vec<WifiObservation>>>) -> Self {
        Self(Script::new(responses, Duration::ZERO))
    }

    /// Always return the given networks.
    #[must_use]
    pub fn fixed(networks: &[(&str, f64)]) -> Self {
        Self::new(vec![Ok(networks
            .iter()
            .map(|(ssid, dbm)| WifiObservation::new(*ssid, *dbm))
            .collect())])
    }

    /// Sleep for `delay` before every answer.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        Self(Script { delay, ..self.0 })
    }

    /// How many times the probe was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.0.calls()
    }
}

#[async_trait]
impl WifiProbe for MockWifiProbe {
    async fn list_networks(&self) -> ProbeResult<Vec<WifiObservation>> {
        self.0.next().await
    }
}

/// Scripted [`BleProbe`].
#[derive(Debug)]
pub struct MockBleProbe(Script<Vec<BleObservation>>);

impl MockBleProbe {
    /// Replay `responses` in order.
    #[must_use]
    pub fn new(responses: Vec<ProbeResult<Vec<BleObservation>>>) -> Self {
        Self(Script::new(responses, Duration::ZERO))
    }

    /// Always discover nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![Ok(Vec::new())])
    }

    /// Sleep for `delay` before every answer.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        Self(Script { delay, ..self.0 })
    }

    /// How many times the probe was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.0.calls()
    }
}

#[async_trait]
impl BleProbe for MockBleProbe {
    async fn discover(&self, _timeout: Duration) -> ProbeResult<Vec<BleObservation>> {
        self.0.next().await
    }
}

/// Scripted [`SpeedProbe`].
#[derive(Debug)]
pub struct MockSpeedProbe(Script<SpeedMeasurement>);

impl MockSpeedProbe {
    /// Replay `responses` in order.
    #[must_use]
    pub fn new(responses: Vec<ProbeResult<SpeedMeasurement>>) -> Self {
        Self(Script::new(responses, Duration::ZERO))
    }

    /// Sleep for `delay` before every answer.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        Self(Script { delay, ..self.0 })
    }

    /// How many times the probe was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.0.calls()
    }
}

#[async_trait]
impl SpeedProbe for MockSpeedProbe {
    async fn measure(&self) -> ProbeResult<SpeedMeasurement> {
        self.0.next().await
    }
}
