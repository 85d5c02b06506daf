//! Connectivity to the local AI backend.
//!
//! [`ConnectivityMonitor`] owns the connection-state machine. It probes the
//! backend's health endpoint on a fixed cadence, counts consecutive failures,
//! and publishes [`ConnectivityEvent`]s as the state changes. It also offers
//! the generic [`ConnectivityMonitor::request`] primitive used by the command
//! dispatcher, which refuses to touch the network unless the backend is
//! connected.
//!
//! Network access goes through the [`BackendTransport`] trait so tests can
//! substitute scripted or mocked transports for [`HttpTransport`].

mod error;
mod monitor;
mod settings;
mod state;
mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{MonitorError, RequestError, TransportError};
pub use monitor::ConnectivityMonitor;
pub use settings::MonitorSettings;
pub use state::{ConnectionState, ConnectivityEvent};
pub use transport::{BackendTransport, HttpTransport, USER_AGENT};

/// JSON object returned by a successful backend request.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
