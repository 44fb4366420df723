//! HTTP API routes and handlers.
//!
//! - `health` - Liveness check
//! - `scan` - Snapshot, on-demand rescan, and baseline
//! - `system` - Scanner lifecycle and counters
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod error;
pub mod health;
pub mod openapi;
pub mod scan;
pub mod system;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::{get_openapi_json, ApiDoc};

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /docs                  - Swagger UI
/// /api
/// ├── /status            - Latest scan snapshot
/// ├── /rescan            - Start a fast scan now (POST)
/// ├── /baseline          - Rogue-detection baseline
/// ├── /system/status     - Scanner lifecycle, cadence, counters
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .merge(scan::router())
                .nest("/system", system::router()),
        )
        .merge(SwaggerUi::new("/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use wible_core::probe::mock::{MockBleProbe, MockSpeedProbe, MockWifiProbe};
    use wible_core::{
        InternetStatus, Lifecycle, Orchestrator, Probes, ProbeError, ScanConfig, Snapshot,
        SpeedMeasurement, WifiObservation,
    };

    use super::*;
    use crate::api::health::HealthResponse;
    use crate::api::scan::{BaselineResponse, RescanResponse};
    use crate::api::system::SystemStatusResponse;
    use crate::state::AppState;

    fn orchestrator(wifi: MockWifiProbe, speed: Option<MockSpeedProbe>) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            &ScanConfig::default(),
            Probes {
                wifi: Arc::new(wifi),
                ble: Arc::new(MockBleProbe::new(vec![Err(ProbeError::unavailable(
                    "no adapter",
                ))])),
                speed: speed.map(|s| Arc::new(s) as Arc<dyn wible_core::SpeedProbe>),
            },
        ))
    }

    fn server(orchestrator: &Arc<Orchestrator>) -> TestServer {
        TestServer::new(create_router(AppState::new(Arc::clone(orchestrator)))).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let orchestrator = orchestrator(MockWifiProbe::fixed(&[]), None);
        let response = server(&orchestrator).get("/health").await;

        response.assert_status_ok();
        let body: HealthResponse = response.json();
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_status_before_start_is_empty() {
        let orchestrator = orchestrator(MockWifiProbe::fixed(&[("HomeNet", -45.0)]), None);
        let response = server(&orchestrator).get("/api/status").await;

        response.assert_status_ok();
        let snapshot: Snapshot = response.json();
        assert!(snapshot.wifi.is_empty());
        assert!(snapshot.timestamp.is_none());
        assert_eq!(snapshot.internet, InternetStatus::disconnected());
    }

    #[tokio::test]
    async fn test_status_after_start() {
        let orchestrator = orchestrator(
            MockWifiProbe::fixed(&[("HomeNet", -45.0), ("Neighbor", -70.0)]),
            None,
        );
        orchestrator.start().await.unwrap();

        let response = server(&orchestrator).get("/api/status").await;
        response.assert_status_ok();

        let json: serde_json::Value = response.json();
        assert_eq!(json["wifi"][0]["ssid"], "HomeNet");
        assert_eq!(json["wifi"][0]["signal_dbm"], -45.0);
        assert_eq!(json["rogue_aps"], serde_json::json!([]));
        assert_eq!(json["ble"], serde_json::json!([]));
        assert_eq!(json["ble_available"], false);
        assert_eq!(json["internet"]["ping_ms"], -1.0);
        assert!(json["timestamp"].is_string());

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_rescan_before_start_is_unavailable() {
        let orchestrator = orchestrator(MockWifiProbe::fixed(&[("HomeNet", -45.0)]), None);
        let response = server(&orchestrator).post("/api/rescan").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "NOT_RUNNING");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescan_flags_new_network() {
        let orchestrator = orchestrator(
            MockWifiProbe::new(vec![
                Ok(vec![WifiObservation::new("HomeNet", -45.0)]),
                Ok(vec![
                    WifiObservation::new("HomeNet", -45.0),
                    WifiObservation::new("EvilTwin", -40.0),
                ]),
            ]),
            None,
        );
        orchestrator.start().await.unwrap();
        let server = server(&orchestrator);

        let response = server.post("/api/rescan").await;
        response.assert_status(StatusCode::ACCEPTED);
        let ack: RescanResponse = response.json();
        assert_eq!(ack.status, "scanning_started");

        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot: Snapshot = server.get("/api/status").await.json();
        assert_eq!(snapshot.rogue_aps, vec!["EvilTwin".to_string()]);

        let baseline: BaselineResponse = server.get("/api/baseline").await.json();
        assert!(baseline.captured);
        assert_eq!(baseline.ssids, vec!["HomeNet".to_string()]);

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_baseline_not_captured_after_failed_scan() {
        let orchestrator = orchestrator(
            MockWifiProbe::new(vec![Err(ProbeError::failed("no wlan interface"))]),
            None,
        );
        orchestrator.start().await.unwrap();

        let baseline: BaselineResponse = server(&orchestrator).get("/api/baseline").await.json();
        assert!(!baseline.captured);
        assert!(baseline.ssids.is_empty());

        orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_status() {
        let orchestrator = orchestrator(
            MockWifiProbe::fixed(&[("HomeNet", -45.0)]),
            Some(MockSpeedProbe::new(vec![Ok(SpeedMeasurement {
                download_mbps: 90.0,
                upload_mbps: 20.0,
                ping_ms: 12.0,
            })])),
        );
        orchestrator.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let status: SystemStatusResponse =
            server(&orchestrator).get("/api/system/status").await.json();
        assert_eq!(status.lifecycle, Lifecycle::Running);
        assert_eq!(status.fast_interval_secs, 10);
        assert!(status.speed_test_enabled);
        assert!(!status.ble_capable);
        assert_eq!(status.stats.fast_cycles, 1);
        assert_eq!(status.stats.slow_cycles, 1);
        assert_eq!(status.stats.ble_failures, 1);

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_openapi_served() {
        let orchestrator = orchestrator(MockWifiProbe::fixed(&[]), None);
        let response = server(&orchestrator).get("/api/openapi.json").await;

        response.assert_status_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["info"]["title"], "wible API");
    }
}
