//! Internet throughput measurement over plain HTTP(S).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::{ProbeError, ProbeResult, SpeedProbe};
use crate::config::SpeedTestConfig;
use crate::types::SpeedMeasurement;

/// Number of round trips sampled for latency; the fastest one wins.
const PING_SAMPLES: usize = 3;

/// Speed probe that times a small request, a download, and an upload.
#[derive(Debug, Clone)]
pub struct HttpSpeedProbe {
    client: reqwest::Client,
    config: SpeedTestConfig,
}

impl HttpSpeedProbe {
    /// Create a probe for the endpoints in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Unavailable`] if the HTTP client cannot be built
    /// (e.g. no TLS backend).
    pub fn new(config: SpeedTestConfig) -> ProbeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wible/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ProbeError::unavailable(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn ping_ms(&self) -> ProbeResult<f64> {
        let mut best: Option<Duration> = None;
        for _ in 0..PING_SAMPLES {
            let start = Instant::now();
            self.client
                .get(self.config.ping_url.as_str())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| ProbeError::failed(format!("ping request: {e}")))?;
            let elapsed = start.elapsed();
            best = Some(best.map_or(elapsed, |b| b.min(elapsed)));
        }
        Ok(round2(best.unwrap_or_default().as_secs_f64() * 1000.0))
    }

    async fn download_mbps(&self) -> ProbeResult<f64> {
        let start = Instant::now();
        let mut response = self
            .client
            .get(self.config.download_url.as_str())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ProbeError::failed(format!("download request: {e}")))?;

        let mut bytes: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProbeError::failed(format!("download body: {e}")))?
        {
            bytes += chunk.len() as u64;
        }

        Ok(mbps(bytes, start.elapsed()))
    }

    async fn upload_mbps(&self) -> ProbeResult<f64> {
        let payload = vec![0u8; self.config.upload_bytes];
        let bytes = payload.len() as u64;

        let start = Instant::now();
        self.client
            .post(self.config.upload_url.as_str())
            .body(payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ProbeError::failed(format!("upload request: {e}")))?;

        Ok(mbps(bytes, start.elapsed()))
    }
}

#[async_trait]
impl SpeedProbe for HttpSpeedProbe {
    async fn measure(&self) -> ProbeResult<SpeedMeasurement> {
        let ping_ms = self.ping_ms().await?;
        let download_mbps = self.download_mbps().await?;
        let upload_mbps = self.upload_mbps().await?;

        debug!(download_mbps, upload_mbps, ping_ms, "Speed measurement finished");
        Ok(SpeedMeasurement {
            download_mbps,
            upload_mbps,
            ping_ms,
        })
    }
}

/// Throughput in Mbit/s, rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-3);
    round2(bytes as f64 * 8.0 / secs / 1e6)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
