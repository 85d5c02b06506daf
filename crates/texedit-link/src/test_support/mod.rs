//! Test doubles for code that depends on the connectivity monitor.
//!
//! [`ScriptedTransport`] answers from an in-memory script and records what it
//! was asked; [`FakeBackend`] is a minimal HTTP server on an ephemeral port for
//! exercising [`crate::HttpTransport`] end to end.

mod fake_backend;
mod scripted;

pub use fake_backend::{CannedResponse, FakeBackend, ReceivedRequest};
pub use scripted::{RecordedRequest, ScriptedReply, ScriptedTransport};
