//! Shared configuration for the TexEdit core and its command-line driver.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path`), then `TEXEDIT_*` environment variables, then
//! command-line flags. The resolved [`Config`] feeds the connectivity monitor
//! (backend address, probe cadence, failure threshold) and the telemetry
//! installed by the binary.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BACKEND_PORT, DEFAULT_BACKEND_URL, DEFAULT_FAILURE_THRESHOLD, DEFAULT_LOG_FILTER,
    DEFAULT_PROBE_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_STARTUP_TIMEOUT_MS,
    default_backend_endpoint, default_log_filter, default_log_filter_string, default_log_format,
};
pub use endpoint::{BackendEndpoint, EndpointParseError, Scheme};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by the TexEdit crates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TEXEDIT")]
pub struct Config {
    /// Base URL of the local backend service.
    #[ortho_config(default = default_backend_endpoint())]
    pub backend_url: BackendEndpoint,
    /// Delay between two health probes, in milliseconds.
    #[ortho_config(default = DEFAULT_PROBE_INTERVAL_MS)]
    pub probe_interval_ms: u64,
    /// Upper bound on a single health probe, in milliseconds.
    #[ortho_config(default = DEFAULT_PROBE_TIMEOUT_MS)]
    pub probe_timeout_ms: u64,
    /// Client timeout for command and search requests, in milliseconds.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    /// Consecutive failures tolerated before the backend is declared unreachable.
    #[ortho_config(default = DEFAULT_FAILURE_THRESHOLD)]
    pub failure_threshold: u32,
    /// How long front ends wait for the backend to become ready, in milliseconds.
    #[ortho_config(default = DEFAULT_STARTUP_TIMEOUT_MS)]
    pub startup_timeout_ms: u64,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_endpoint(),
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Base URL of the backend service.
    #[must_use]
    pub const fn backend_url(&self) -> &BackendEndpoint {
        &self.backend_url
    }

    /// Cadence of the periodic health probe.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Upper bound on a single health probe.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Client timeout applied to command and search requests.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Consecutive failures tolerated before declaring the backend unreachable.
    #[must_use]
    pub const fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// How long front ends wait for readiness before giving up.
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Format used for log records.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
