use crate::endpoint::BackendEndpoint;
use crate::logging::LogFormat;

/// Address of the backend when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Health probe cadence in milliseconds.
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 1_000;

/// Bound on a single health probe in milliseconds.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 6_000;

/// Command and search request timeout in milliseconds. Generous enough for the
/// backend to load its models on first use.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8_000;

/// Consecutive failures before the backend is declared unreachable.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 15;

/// Time front ends wait for readiness, in milliseconds.
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 15_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Port the backend listens on when nothing else is configured.
pub const DEFAULT_BACKEND_PORT: u16 = 5000;

/// Endpoint of the backend when nothing else is configured.
#[must_use]
pub fn default_backend_endpoint() -> BackendEndpoint {
    BackendEndpoint::http("127.0.0.1", DEFAULT_BACKEND_PORT)
}
