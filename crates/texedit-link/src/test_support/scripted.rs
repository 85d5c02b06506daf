//! In-memory transport that replays scripted probe and request outcomes.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::transport::BackendTransport;

/// A request observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Endpoint path the request targeted.
    pub endpoint: String,
    /// JSON body sent.
    pub body: Value,
}

/// Canned answer for one `post_json` call.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    delay: Duration,
    outcome: Result<Vec<u8>, String>,
}

impl ScriptedReply {
    /// Answers with `value` serialised as JSON.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::raw(value.to_string())
    }

    /// Answers with an arbitrary body.
    #[must_use]
    pub fn raw(body: impl Into<Vec<u8>>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(body.into()),
        }
    }

    /// Fails with [`TransportError::Unreachable`].
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(reason.into()),
        }
    }

    /// Delays the answer by `delay`.
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }
}

/// In-memory [`BackendTransport`] driven by a script.
///
/// Probes succeed while the transport is healthy. Each endpoint answers from
/// its own queue of [`ScriptedReply`] values; an exhausted queue answers with
/// HTTP 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    healthy: AtomicBool,
    probe_delay: Mutex<Duration>,
    probes: AtomicUsize,
    replies: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTransport {
    /// Creates a transport whose probes succeed.
    #[must_use]
    pub fn healthy() -> Self {
        let transport = Self::default();
        transport.set_healthy(true);
        transport
    }

    /// Creates a transport whose probes fail.
    #[must_use]
    pub fn unhealthy() -> Self {
        Self::default()
    }

    /// Switches the outcome of subsequent probes.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Delays every subsequent probe by `delay`.
    pub fn set_probe_delay(&self, delay: Duration) {
        *lock(&self.probe_delay) = delay;
    }

    /// Queues `reply` for the next request to `endpoint`.
    pub fn push_reply(&self, endpoint: &str, reply: ScriptedReply) {
        lock(&self.replies)
            .entry(endpoint.to_owned())
            .or_default()
            .push_back(reply);
    }

    /// Number of probes issued so far.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl BackendTransport for ScriptedTransport {
    async fn probe_health(&self) -> Result<(), TransportError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.probe_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::unreachable("connection refused"))
        }
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Vec<u8>, TransportError> {
        lock(&self.requests).push(RecordedRequest {
            endpoint: endpoint.to_owned(),
            body: body.clone(),
        });
        let queued = lock(&self.replies)
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front);
        let Some(reply) = queued else {
            return Err(TransportError::Status {
                url: endpoint.to_owned(),
                status: 404,
            });
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.outcome.map_err(TransportError::unreachable)
    }
}
