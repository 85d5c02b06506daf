//! Error types for backend transport, requests and readiness waits.

use std::time::Duration;

use thiserror::Error;

use crate::state::ConnectionState;

/// Failures raised while talking to the backend over the network.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or no response arrived.
    #[error("request to {url} failed: {source}")]
    Send {
        /// Target URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("{url} answered with HTTP status {status}")]
    Status {
        /// Target URL.
        url: String,
        /// Returned status code.
        status: u16,
    },
    /// The response body could not be read.
    #[error("failed to read response from {url}: {source}")]
    Body {
        /// Target URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The operation did not complete in time.
    #[error("no answer within {timeout:?}")]
    Timeout {
        /// Bound that elapsed.
        timeout: Duration,
    },
    /// A scripted failure raised by the test transports.
    #[cfg(any(test, feature = "test-support"))]
    #[error("backend unreachable: {reason}")]
    Unreachable {
        /// Human-readable description.
        reason: String,
    },
}

#[cfg(any(test, feature = "test-support"))]
impl TransportError {
    /// Builds a [`TransportError::Unreachable`] error.
    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }
}

/// Failures returned by [`crate::ConnectivityMonitor::request`].
#[derive(Debug, Error)]
pub enum RequestError {
    /// The monitor is not connected, so no request was attempted.
    #[error("server not available for requests")]
    Unavailable {
        /// State observed when the request was refused.
        state: ConnectionState,
    },
    /// The request was sent but failed.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// Backend endpoint path.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
    /// The backend answered with something other than a JSON object.
    #[error("invalid JSON response from {endpoint}: {reason}")]
    InvalidJson {
        /// Backend endpoint path.
        endpoint: String,
        /// What was wrong with the body.
        reason: String,
    },
}

/// Failures while waiting for the backend to become ready.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// The backend did not become ready in time.
    #[error("backend did not become ready within {timeout:?}")]
    ReadyTimeout {
        /// Bound that elapsed.
        timeout: Duration,
    },
    /// The monitor declared the backend unreachable.
    #[error("backend unreachable after {attempts} consecutive failures")]
    Unreachable {
        /// Consecutive failures counted.
        attempts: u32,
    },
    /// The event channel closed before readiness was observed.
    #[error("connectivity monitor shut down")]
    Closed,
}
