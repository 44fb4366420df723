//! OpenAPI specification for the wible API.
//!
//! Served at `/api/openapi.json`, browsable through Swagger UI at `/docs`, and
//! written to disk by the `gen-openapi` binary.

use utoipa::OpenApi;
use wible_core::{
    BleObservation, InternetStatus, Lifecycle, ScanCounters, Snapshot, WifiObservation,
};

use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::scan::{BaselineResponse, RescanResponse};
use super::system::SystemStatusResponse;

/// The OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for wible.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "wible API",
        version = "0.1.0",
        description = r#"
# wible API

wible watches the local wireless environment and flags access points that were
not there when it started.

## Overview

Two background loops keep a shared snapshot up to date:

1. **Fast scan** (every few seconds): visible Wi-Fi networks with signal
   strength, nearby BLE devices, and rogue detection
2. **Slow scan** (own cadence): internet download, upload, and latency

## Rogue detection

The first Wi-Fi scan that sees any network is frozen as the **baseline**. From
then on every SSID that is visible but not in the baseline is reported in
`rogue_aps`. Matching is exact: case and whitespace matter.

## Degraded results

A failed probe never fails a request. A failed Wi-Fi scan publishes an empty
network list; a failed BLE scan publishes an empty device list with
`ble_available: false`; a failed speed test publishes `connected: false` with
`ping_ms: -1`.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local wible server")
    ),
    tags(
        (
            name = "scan",
            description = "Scan snapshot, on-demand rescans, and the rogue-detection baseline"
        ),
        (
            name = "system",
            description = "Health checks and scanner status"
        )
    ),
    paths(
        super::health::health_check,
        super::scan::get_status,
        super::scan::rescan,
        super::scan::get_baseline,
        super::system::get_status,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            // Snapshot types
            Snapshot,
            WifiObservation,
            BleObservation,
            InternetStatus,
            // Scan control
            RescanResponse,
            BaselineResponse,
            // System types
            SystemStatusResponse,
            Lifecycle,
            ScanCounters,
        )
    )
)]
pub struct ApiDoc;
