//! Application configuration management.
//!
//! Configuration is layered:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`WIBLE_CONFIG`, else the platform default path)
//! 3. Environment overrides of the form `WIBLE__SCAN__FAST_INTERVAL_SECS=5`
//!
//! Every section uses `#[serde(default)]`, so a file only needs the keys it
//! changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "WIBLE_CONFIG";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "WIBLE";

/// Largest accepted speed-test upload payload (64 MiB).
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/]+(/\S*)?$").expect("valid URL regex"));
static INTERFACE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:-]{1,15}$").expect("valid interface regex"));

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The layered configuration could not be parsed or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// The configuration could not be serialized back to TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// One field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted path of the field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("Configuration has {} validation errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Sections
// ============================================================================

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WibleConfig {
    /// Scan cadence and probe budgets.
    pub scan: ScanConfig,

    /// Wi-Fi probe selection.
    pub wifi: WifiConfig,

    /// Speed-test endpoints.
    pub speed_test: SpeedTestConfig,

    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Scan cadence and probe time budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Delay between fast (Wi-Fi + BLE) scans.
    pub fast_interval_secs: u64,

    /// Delay between speed tests.
    pub slow_interval_secs: u64,

    /// Budget for one Wi-Fi listing.
    pub wifi_timeout_secs: u64,

    /// How long BLE discovery listens.
    pub ble_discovery_timeout_secs: u64,

    /// Whether the speed-test loop runs at all.
    pub speed_test_enabled: bool,

    /// Budget for one speed test.
    pub speed_test_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            fast_interval_secs: 10,
            slow_interval_secs: 15,
            wifi_timeout_secs: 10,
            ble_discovery_timeout_secs: 6,
            speed_test_enabled: true,
            speed_test_timeout_secs: 60,
        }
    }
}

impl ScanConfig {
    /// Fast loop interval.
    #[must_use]
    pub const fn fast_interval(&self) -> Duration {
        Duration::from_secs(self.fast_interval_secs)
    }

    /// Slow loop interval.
    #[must_use]
    pub const fn slow_interval(&self) -> Duration {
        Duration::from_secs(self.slow_interval_secs)
    }

    /// Wi-Fi listing budget.
    #[must_use]
    pub const fn wifi_timeout(&self) -> Duration {
        Duration::from_secs(self.wifi_timeout_secs)
    }

    /// BLE discovery window.
    #[must_use]
    pub const fn ble_discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.ble_discovery_timeout_secs)
    }

    /// Speed-test budget.
    #[must_use]
    pub const fn speed_test_timeout(&self) -> Duration {
        Duration::from_secs(self.speed_test_timeout_secs)
    }
}

/// Which tool lists Wi-Fi networks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WifiBackend {
    /// `netsh` on Windows, `nmcli` elsewhere.
    #[default]
    Auto,
    /// `netsh wlan`.
    Netsh,
    /// NetworkManager `nmcli`.
    Nmcli,
}

/// Wi-Fi probe selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    /// Listing backend.
    pub backend: WifiBackend,

    /// Restrict listing to one interface (nmcli only).
    pub interface: Option<String>,
}

/// Speed-test endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedTestConfig {
    /// Small resource timed for latency.
    pub ping_url: String,

    /// Resource downloaded to measure download throughput.
    pub download_url: String,

    /// Endpoint accepting a POST body to measure upload throughput.
    pub upload_url: String,

    /// Size of the upload body in bytes.
    pub upload_bytes: usize,
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            ping_url: "https://speed.cloudflare.com/__down?bytes=0".to_string(),
            download_url: "https://speed.cloudflare.com/__down?bytes=10000000".to_string(),
            upload_url: "https://speed.cloudflare.com/__up".to_string(),
            upload_bytes: 2_000_000,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// JSON file logging instead of pretty stdout logging.
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            production: false,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl WibleConfig {
    /// Load configuration from the default locations and the environment.
    ///
    /// If `WIBLE_CONFIG` is set the file it names must exist; otherwise the
    /// platform default file is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or validation fails.
    pub fn load() -> ConfigResult<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from(Some(Path::new(&path)), true),
            None => Self::load_from(default_config_path().as_deref(), false),
        }
    }

    /// Load configuration from `path` (if any) plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `required` and the file is
    /// missing, a parse error for malformed input, or validation errors.
    pub fn load_from(path: Option<&Path>, required: bool) -> ConfigResult<Self> {
        Self::load_layered(path, required, None)
    }

    /// Layered load. `env` replaces the process environment when given.
    fn load_layered(
        path: Option<&Path>,
        required: bool,
        env: Option<config::Map<String, String>>,
    ) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if required && !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(required),
            );
        }

        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse configuration from a TOML string (no environment overrides).
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed input or validation errors.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let loaded: Self = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Serialize the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field, collecting all violations.
    ///
    /// # Errors
    ///
    /// Returns the single violation, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        let durations = [
            ("scan.fast_interval_secs", self.scan.fast_interval_secs),
            ("scan.slow_interval_secs", self.scan.slow_interval_secs),
            ("scan.wifi_timeout_secs", self.scan.wifi_timeout_secs),
            (
                "scan.ble_discovery_timeout_secs",
                self.scan.ble_discovery_timeout_secs,
            ),
            (
                "scan.speed_test_timeout_secs",
                self.scan.speed_test_timeout_secs,
            ),
        ];
        for (field, secs) in durations {
            if secs == 0 {
                errors.push(invalid(field, "must be at least 1 second"));
            }
        }

        if let Some(interface) = &self.wifi.interface {
            if !INTERFACE_NAME.is_match(interface) {
                errors.push(invalid(
                    "wifi.interface",
                    format!("'{interface}' is not a valid interface name"),
                ));
            }
        }

        let urls = [
            ("speed_test.ping_url", &self.speed_test.ping_url),
            ("speed_test.download_url", &self.speed_test.download_url),
            ("speed_test.upload_url", &self.speed_test.upload_url),
        ];
        for (field, url) in urls {
            if !HTTP_URL.is_match(url) {
                errors.push(invalid(field, format!("'{url}' is not an http(s) URL")));
            }
        }

        if self.speed_test.upload_bytes == 0 {
            errors.push(invalid("speed_test.upload_bytes", "must be greater than 0"));
        } else if self.speed_test.upload_bytes > MAX_UPLOAD_BYTES {
            errors.push(invalid(
                "speed_test.upload_bytes",
                format!("must be at most {MAX_UPLOAD_BYTES} bytes"),
            ));
        }

        if self.server.port == 0 {
            errors.push(invalid("server.port", "must be between 1 and 65535"));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// The platform default configuration file.
///
/// On Linux: `/etc/wible/config.toml`. Elsewhere: the user config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Some(PathBuf::from("/etc/wible/config.toml"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "wible")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
