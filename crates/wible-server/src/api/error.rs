//! API error types and response handling.
//!
//! Handlers return [`ApiResult`]; any [`WibleError`] converts into the
//! matching [`ApiError`] and renders as a JSON [`ErrorResponse`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use wible_core::WibleError;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// 500 Internal Server Error - unexpected server-side error.
    #[error("Internal Error: {message}")]
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - the scan loops are not running.
    #[error("Service Unavailable: {message}")]
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "NOT_RUNNING",
    "message": "Scan orchestrator is not running"
}))]
pub struct ErrorResponse {
    /// Machine-readable error code.
    #[schema(example = "NOT_RUNNING")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Scan orchestrator is not running")]
    pub message: String,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (Self::InternalError {
            error_code,
            message,
        }
        | Self::ServiceUnavailable {
            error_code,
            message,
        }) = self;

        if status.is_server_error() {
            tracing::error!(%status, error_code = %error_code, message = %message, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: error_code,
                message,
            }),
        )
            .into_response()
    }
}

impl From<WibleError> for ApiError {
    fn from(err: WibleError) -> Self {
        let error_code = err.error_code().to_string();
        let message = err.to_string();

        match err.http_status_code() {
            503 => Self::ServiceUnavailable {
                error_code,
                message,
            },
            _ => Self::InternalError {
                error_code,
                message,
            },
        }
    }
}
