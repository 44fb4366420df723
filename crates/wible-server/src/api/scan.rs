//! Scan API endpoints: the current snapshot, on-demand rescans, and the
//! rogue-detection baseline.
//!
//! Reads never wait on a scan in progress; they return whatever the last
//! completed cycle published.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use wible_core::Snapshot;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the scan router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/rescan", post(rescan))
        .route("/baseline", get(get_baseline))
}

// ============================================================================
// Response Types
// ============================================================================

/// Acknowledgement that a rescan was started.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "scanning_started",
    "rescan_id": "01936f0e-8a3c-7d1e-9b7a-3c5e2f1d4a6b",
    "requested_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct RescanResponse {
    /// Always `scanning_started`.
    #[schema(example = "scanning_started")]
    pub status: String,

    /// Identifies the rescan in the server logs.
    pub rescan_id: Uuid,

    /// When the rescan was requested.
    pub requested_at_utc: DateTime<Utc>,
}

/// The Wi-Fi baseline rogue detection compares against.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "captured": true,
    "ssids": ["HomeNet", "Neighbor"]
}))]
pub struct BaselineResponse {
    /// Whether a scan has seen networks yet. Until then nothing is flagged.
    pub captured: bool,

    /// SSIDs present when the baseline was captured, sorted.
    pub ssids: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the current scan snapshot.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "scan",
    operation_id = "getStatus",
    summary = "Get the latest scan snapshot",
    description = "Returns visible Wi-Fi networks, rogue SSIDs (present now but absent \
        from the baseline), nearby BLE devices, and the last internet measurement. \
        Wi-Fi, rogue and BLE fields always come from the same scan cycle.",
    responses(
        (status = 200, description = "Snapshot retrieved", body = Snapshot)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<Snapshot> {
    let snapshot = state.orchestrator().snapshot().await;
    Json(Snapshot::clone(&snapshot))
}

/// Trigger an immediate Wi-Fi/BLE scan.
#[utoipa::path(
    post,
    path = "/api/rescan",
    tag = "scan",
    operation_id = "rescan",
    summary = "Start a scan now",
    description = "Starts a fast scan cycle outside the regular schedule and returns \
        immediately. A request made while a triggered scan is still running joins \
        it and gets the same `rescan_id`. Poll `/api/status` for the result.",
    responses(
        (status = 202, description = "Scan started", body = RescanResponse),
        (status = 503, description = "Scanner is not running", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn rescan(
    State(state): State<SharedState>,
) -> ApiResult<(StatusCode, Json<RescanResponse>)> {
    let ack = state.orchestrator().trigger_rescan()?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RescanResponse {
            status: "scanning_started".to_string(),
            rescan_id: ack.id,
            requested_at_utc: ack.requested_at,
        }),
    ))
}

/// Get the rogue-detection baseline.
#[utoipa::path(
    get,
    path = "/api/baseline",
    tag = "scan",
    operation_id = "getBaseline",
    summary = "Get the Wi-Fi baseline",
    description = "Returns the SSIDs captured by the first successful Wi-Fi scan. \
        The baseline never changes while the server runs.",
    responses(
        (status = 200, description = "Baseline retrieved", body = BaselineResponse)
    )
)]
pub async fn get_baseline(State(state): State<SharedState>) -> Json<BaselineResponse> {
    let baseline = state.orchestrator().baseline().await;

    Json(BaselineResponse {
        captured: baseline.is_captured(),
        ssids: baseline.ssids().iter().cloned().collect(),
    })
}
