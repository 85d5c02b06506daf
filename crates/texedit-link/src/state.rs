//! Connection states and the events published when they change.

use strum::Display;

/// Reachability of the backend as seen by the monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    /// Monitoring has not started yet.
    #[default]
    Disconnected,
    /// Probing is under way but the backend has not answered yet, or a probe
    /// failed below the failure threshold.
    Connecting,
    /// The last probe succeeded.
    Connected,
    /// The failure threshold was reached. Probing continues.
    Error,
}

impl ConnectionState {
    /// Returns `true` when requests may be sent to the backend.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Notifications published by the connectivity monitor, in firing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// The connection state changed.
    StatusChanged(ConnectionState),
    /// The backend became reachable. Follows `StatusChanged(Connected)`.
    Ready,
    /// The failure threshold was reached.
    Unreachable {
        /// Consecutive failures counted so far.
        attempts: u32,
        /// Description of the most recent failure.
        reason: String,
    },
}
