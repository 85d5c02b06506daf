//! Connection-state machine, health probing and the request primitive.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use texedit_config::Config;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::JsonObject;
use crate::error::{MonitorError, RequestError, TransportError};
use crate::settings::MonitorSettings;
use crate::state::{ConnectionState, ConnectivityEvent};
use crate::transport::{BackendTransport, HttpTransport};

const MONITOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::monitor");
const EVENT_CAPACITY: usize = 64;

/// Tracks backend reachability and gates requests on it.
///
/// Cloning is cheap; clones share state, events and the probe task. The
/// probe task stops once every clone is dropped.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn BackendTransport>,
    settings: MonitorSettings,
    link: Mutex<LinkState>,
    events: broadcast::Sender<ConnectivityEvent>,
    probe_task: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Default)]
struct LinkState {
    state: ConnectionState,
    consecutive_failures: u32,
}

impl ConnectivityMonitor {
    /// Creates a monitor in the `Disconnected` state.
    #[must_use]
    pub fn new(transport: Arc<dyn BackendTransport>, settings: MonitorSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                transport,
                settings,
                link: Mutex::new(LinkState::default()),
                events,
                probe_task: Mutex::new(None),
            }),
        }
    }

    /// Creates a monitor talking HTTP to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be initialised.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(
            Arc::new(transport),
            MonitorSettings::from_config(config),
        ))
    }

    /// Starts probing: the state becomes `Connecting`, a probe runs at once
    /// and then once per interval until [`Self::stop_monitoring`].
    ///
    /// Calling this while monitoring restarts the probe loop.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start_monitoring(&self) {
        let mut task = self.inner.lock_probe_task();
        if let Some(previous) = task.take() {
            previous.abort();
        }
        self.inner.set_state(ConnectionState::Connecting);
        info!(
            target: MONITOR_TARGET,
            interval = ?self.inner.settings.probe_interval(),
            threshold = self.inner.settings.failure_threshold(),
            "starting backend monitoring"
        );
        let weak = Arc::downgrade(&self.inner);
        *task = Some(tokio::spawn(run_probe_loop(
            weak,
            self.inner.settings.probe_interval(),
        )));
    }

    /// Cancels the probe loop, including any probe in flight. The connection
    /// state is left untouched.
    pub fn stop_monitoring(&self) {
        if let Some(task) = self.inner.lock_probe_task().take() {
            task.abort();
            info!(target: MONITOR_TARGET, "stopped backend monitoring");
        }
    }

    /// Returns `true` while the probe loop is running.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.inner
            .lock_probe_task()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Returns `true` iff the backend is connected.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock_link().state
    }

    /// Failures counted since the last successful probe.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock_link().consecutive_failures
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> MonitorSettings {
        self.inner.settings
    }

    /// Subscribes to connectivity events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.inner.events.subscribe()
    }

    /// Posts `payload` to `endpoint` and returns the JSON object answered.
    ///
    /// Nothing is sent unless the monitor is connected. Transport failures
    /// count towards the failure threshold; once it is reached while
    /// connected the state moves straight to `Error`. Malformed bodies are
    /// reported without affecting the counter.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Unavailable`] when not connected,
    /// [`RequestError::Transport`] when the request fails, and
    /// [`RequestError::InvalidJson`] when the body is not a JSON object.
    pub async fn request(
        &self,
        endpoint: &str,
        payload: &Value,
    ) -> Result<JsonObject, RequestError> {
        let state = self.state();
        if !state.is_ready() {
            debug!(
                target: MONITOR_TARGET,
                endpoint,
                state = %state,
                "refusing request while backend is not connected"
            );
            return Err(RequestError::Unavailable { state });
        }

        let body = match self.inner.transport.post_json(endpoint, payload).await {
            Ok(body) => body,
            Err(source) => {
                self.inner.record_request_failure(&source);
                return Err(RequestError::Transport {
                    endpoint: endpoint.to_owned(),
                    source,
                });
            }
        };
        parse_object(endpoint, &body)
    }

    /// Waits until the backend is connected.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Unreachable`] if the monitor is, or enters,
    /// the `Error` state, [`MonitorError::ReadyTimeout`] once `timeout`
    /// elapses, and [`MonitorError::Closed`] if the event stream ends.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), MonitorError> {
        let mut events = self.subscribe();
        {
            let link = self.inner.lock_link();
            match link.state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Error => {
                    return Err(MonitorError::Unreachable {
                        attempts: link.consecutive_failures,
                    });
                }
                ConnectionState::Disconnected | ConnectionState::Connecting => {}
            }
        }

        let wait = async {
            loop {
                match events.recv().await {
                    Ok(ConnectivityEvent::Ready) => return Ok(()),
                    Ok(ConnectivityEvent::Unreachable { attempts, .. }) => {
                        return Err(MonitorError::Unreachable { attempts });
                    }
                    Ok(ConnectivityEvent::StatusChanged(_)) => {}
                    Err(RecvError::Lagged(_)) => {
                        if self.is_ready() {
                            return Ok(());
                        }
                    }
                    Err(RecvError::Closed) => return Err(MonitorError::Closed),
                }
            }
        };
        time::timeout(timeout, wait)
            .await
            .map_err(|_| MonitorError::ReadyTimeout { timeout })?
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let link = self.inner.lock_link();
        f.debug_struct("ConnectivityMonitor")
            .field("state", &link.state)
            .field("consecutive_failures", &link.consecutive_failures)
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

async fn run_probe_loop(inner: Weak<Inner>, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let Some(monitor) = inner.upgrade() else {
            break;
        };
        monitor.probe_once().await;
    }
}

fn parse_object(endpoint: &str, body: &[u8]) -> Result<JsonObject, RequestError> {
    let invalid = |reason: String| RequestError::InvalidJson {
        endpoint: endpoint.to_owned(),
        reason,
    };
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(invalid("expected a JSON object".to_owned())),
        Err(error) => Err(invalid(error.to_string())),
    }
}

impl Inner {
    fn lock_link(&self) -> MutexGuard<'_, LinkState> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_probe_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.probe_task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one bounded health probe and records the outcome.
    async fn probe_once(&self) {
        let timeout = self.settings.probe_timeout();
        let outcome = match time::timeout(timeout, self.transport.probe_health()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout { timeout }),
        };
        match outcome {
            Ok(()) => self.record_probe_success(),
            Err(error) => self.record_probe_failure(&error),
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let mut link = self.lock_link();
        self.transition(&mut link, next);
    }

    /// Applies a state change while the link lock is held so events leave in
    /// the order the changes happened.
    fn transition(&self, link: &mut LinkState, next: ConnectionState) {
        if link.state == next {
            return;
        }
        debug!(
            target: MONITOR_TARGET,
            from = %link.state,
            to = %next,
            "connection state changed"
        );
        link.state = next;
        self.publish(ConnectivityEvent::StatusChanged(next));
        if next == ConnectionState::Connected {
            link.consecutive_failures = 0;
            info!(target: MONITOR_TARGET, "backend ready");
            self.publish(ConnectivityEvent::Ready);
        }
    }

    fn record_probe_success(&self) {
        let mut link = self.lock_link();
        trace!(target: MONITOR_TARGET, "health probe succeeded");
        link.consecutive_failures = 0;
        self.transition(&mut link, ConnectionState::Connected);
    }

    fn record_probe_failure(&self, error: &TransportError) {
        let mut link = self.lock_link();
        link.consecutive_failures = link.consecutive_failures.saturating_add(1);
        let attempts = link.consecutive_failures;
        let threshold = self.settings.failure_threshold();
        debug!(
            target: MONITOR_TARGET,
            attempts,
            threshold,
            error = %error,
            "health probe failed"
        );
        if attempts >= threshold {
            self.transition(&mut link, ConnectionState::Error);
            warn!(
                target: MONITOR_TARGET,
                attempts,
                error = %error,
                "backend unreachable"
            );
            self.publish(ConnectivityEvent::Unreachable {
                attempts,
                reason: error.to_string(),
            });
        } else {
            self.transition(&mut link, ConnectionState::Connecting);
        }
    }

    fn record_request_failure(&self, error: &TransportError) {
        let mut link = self.lock_link();
        link.consecutive_failures = link.consecutive_failures.saturating_add(1);
        let attempts = link.consecutive_failures;
        warn!(
            target: MONITOR_TARGET,
            attempts,
            error = %error,
            "backend request failed"
        );
        if attempts >= self.settings.failure_threshold() && link.state == ConnectionState::Connected
        {
            self.transition(&mut link, ConnectionState::Error);
        }
    }

    fn publish(&self, event: ConnectivityEvent) {
        if self.events.send(event).is_err() {
            trace!(target: MONITOR_TARGET, "no connectivity subscribers");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.lock_probe_task().take() {
            task.abort();
        }
    }
}
