//! System status endpoint: scanner lifecycle, cadence, and counters.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use wible_core::{Lifecycle, ScanCounters};

use crate::state::SharedState;

/// Creates the system router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/status", get(get_status))
}

/// System status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "version": "0.1.0",
    "uptime_secs": 3600,
    "lifecycle": "running",
    "fast_interval_secs": 10,
    "slow_interval_secs": 15,
    "speed_test_enabled": true,
    "ble_capable": true,
    "stats": {
        "fast_cycles": 360,
        "wifi_failures": 2,
        "ble_failures": 0,
        "stale_results": 1,
        "slow_cycles": 48,
        "speed_failures": 3,
        "rescans_triggered": 4
    }
}))]
pub struct SystemStatusResponse {
    /// Server version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Server uptime in seconds.
    #[schema(example = 3600)]
    pub uptime_secs: u64,

    /// Scanner lifecycle state.
    pub lifecycle: Lifecycle,

    /// Delay between fast scans.
    #[schema(example = 10)]
    pub fast_interval_secs: u64,

    /// Delay between speed tests.
    #[schema(example = 15)]
    pub slow_interval_secs: u64,

    /// Whether speed tests run at all.
    pub speed_test_enabled: bool,

    /// Whether BLE is scanned on the next cycle. `false` while backing off
    /// after the host reported no adapter.
    pub ble_capable: bool,

    /// Scan counters since start.
    pub stats: ScanCounters,
}

/// Get system status.
#[utoipa::path(
    get,
    path = "/api/system/status",
    tag = "system",
    operation_id = "getSystemStatus",
    summary = "Get scanner status",
    description = "Returns version, uptime, scanner lifecycle, configured cadence, \
        and scan counters (cycles, probe failures, discarded results, rescans).",
    responses(
        (status = 200, description = "System status retrieved", body = SystemStatusResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<SystemStatusResponse> {
    let orchestrator = state.orchestrator();

    Json(SystemStatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime().as_secs(),
        lifecycle: orchestrator.lifecycle(),
        fast_interval_secs: orchestrator.fast_interval().as_secs(),
        slow_interval_secs: orchestrator.slow_interval().as_secs(),
        speed_test_enabled: orchestrator.speed_test_enabled(),
        ble_capable: orchestrator.ble_capable(),
        stats: orchestrator.stats(),
    })
}
