//! Unified error types for the wible core library.
//!
//! [`WibleError`] covers the failures the engine surfaces to a caller:
//! configuration that cannot be loaded and misuse of the orchestrator
//! lifecycle. [`ConfigError`](crate::config::ConfigError) converts into it.
//!
//! Probe failures never appear here. The scan loops absorb them and only
//! degrade the affected snapshot fields.
//!
//! # Example
//!
//! ```rust
//! use wible_core::error::{WibleError, Result};
//!
//! fn require_interval(secs: u64) -> Result<u64> {
//!     if secs == 0 {
//!         return Err(WibleError::ConfigValidationError(
//!             "scan.fast_interval_secs: must be at least 1".into(),
//!         ));
//!     }
//!     Ok(secs)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all wible operations.
#[derive(Debug, Error)]
pub enum WibleError {
    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // LIFECYCLE ERRORS
    // =========================================================================
    /// `start` was called on an orchestrator that already started.
    #[error("Scan orchestrator has already been started")]
    AlreadyStarted,

    /// The operation needs running scan loops.
    #[error("Scan orchestrator is not running")]
    NotRunning,

    /// No Tokio runtime was available to spawn the scan loops on.
    #[error("Cannot start scan loops: no async runtime available")]
    RuntimeUnavailable,
}

/// A specialized [`Result`] type for wible operations.
pub type Result<T> = std::result::Result<T, WibleError>;

impl WibleError {
    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AlreadyStarted => 409,
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,
            Self::ConfigNotFound(_) | Self::RuntimeUnavailable => 500,
            Self::NotRunning => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::NotRunning => "NOT_RUNNING",
            Self::RuntimeUnavailable => "RUNTIME_UNAVAILABLE",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for WibleError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::ParseError(message) => Self::ConfigParseError(message),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_config_error_classification() {
        assert!(WibleError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(WibleError::ConfigParseError("syntax".into()).is_config_error());
        assert!(WibleError::ConfigValidationError("bad".into()).is_config_error());
        assert!(!WibleError::NotRunning.is_config_error());
        assert!(!WibleError::AlreadyStarted.is_config_error());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(WibleError::AlreadyStarted.http_status_code(), 409);
        assert_eq!(
            WibleError::ConfigValidationError("x".into()).http_status_code(),
            422
        );
        assert_eq!(WibleError::RuntimeUnavailable.http_status_code(), 500);
        assert_eq!(WibleError::NotRunning.http_status_code(), 503);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(WibleError::AlreadyStarted.error_code(), "ALREADY_STARTED");
        assert_eq!(WibleError::NotRunning.error_code(), "NOT_RUNNING");
        assert_eq!(
            WibleError::RuntimeUnavailable.error_code(),
            "RUNTIME_UNAVAILABLE"
        );
    }

    #[test]
    fn test_from_config_error() {
        let err: WibleError = ConfigError::MultipleValidationErrors(vec![
            ConfigError::ValidationError {
                field: "server.port".into(),
                message: "must be between 1 and 65535".into(),
            },
            ConfigError::ValidationError {
                field: "scan.fast_interval_secs".into(),
                message: "must be at least 1 second".into(),
            },
        ])
        .into();

        assert!(matches!(err, WibleError::ConfigValidationError(_)));
        let message = err.to_string();
        assert!(message.contains("server.port"));
        assert!(message.contains("scan.fast_interval_secs"));
    }

    #[test]
    fn test_error_display_messages() {
        assert_eq!(
            WibleError::NotRunning.to_string(),
            "Scan orchestrator is not running"
        );
        assert!(WibleError::ConfigNotFound(PathBuf::from("/etc/wible/config.toml"))
            .to_string()
            .contains("/etc/wible/config.toml"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<WibleError>();
        assert_sync::<WibleError>();
    }
}
