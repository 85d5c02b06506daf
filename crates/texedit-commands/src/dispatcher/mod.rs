//! Single-flight command execution and suggestion delivery.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};
use texedit_link::{ConnectivityMonitor, JsonObject, RequestError};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::errors::{CommandError, ParseError};
use crate::events::{CommandResult, DispatcherEvent, ExecutionState};
use crate::format::format_response;
use crate::parse::ParsedCommand;
use crate::registry::{CommandDefinition, CommandRegistry};
use crate::suggest::rank_suggestions;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const SEARCH_ENDPOINT: &str = "/api/search";
const EVENT_CAPACITY: usize = 64;

/// Interprets command text and runs it locally or on the backend.
///
/// At most one command runs at a time; a call made while another is in
/// flight is rejected with [`CommandError::ExecutionError`], never queued.
/// Cloning is cheap and clones share the execution guard and event stream.
#[derive(Clone)]
pub struct CommandDispatcher {
    shared: Arc<Shared>,
}

struct Shared {
    registry: CommandRegistry,
    monitor: ConnectivityMonitor,
    execution: Mutex<ExecutionState>,
    events: broadcast::Sender<DispatcherEvent>,
}

impl CommandDispatcher {
    /// Creates a dispatcher over the built-in commands.
    #[must_use]
    pub fn new(monitor: ConnectivityMonitor) -> Self {
        Self::with_registry(monitor, CommandRegistry::builtin())
    }

    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub fn with_registry(monitor: ConnectivityMonitor, registry: CommandRegistry) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!(
            target: DISPATCH_TARGET,
            commands = registry.len(),
            "command dispatcher initialised"
        );
        Self {
            shared: Arc::new(Shared {
                registry,
                monitor,
                execution: Mutex::new(ExecutionState::Idle),
                events,
            }),
        }
    }

    /// The command table.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.shared.registry
    }

    /// Connectivity monitor used for backend commands.
    #[must_use]
    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.shared.monitor
    }

    /// Every registered command name, in name order.
    #[must_use]
    pub fn all_commands(&self) -> Vec<String> {
        self.shared.registry.names().map(str::to_owned).collect()
    }

    /// Names of the commands that can run right now.
    #[must_use]
    pub fn valid_commands(&self) -> Vec<String> {
        let server_ready = self.shared.monitor.is_ready();
        self.shared
            .registry
            .definitions()
            .filter(|definition| definition.is_available(server_ready))
            .map(|definition| definition.name.to_owned())
            .collect()
    }

    /// Definition of `name`, if registered.
    #[must_use]
    pub fn command_info(&self, name: &str) -> Option<&CommandDefinition> {
        self.shared.registry.get(name)
    }

    /// Returns `true` if `text` names a command, with or without valid
    /// arguments.
    #[must_use]
    pub fn is_command_valid(&self, text: &str) -> bool {
        self.shared.registry.contains(text)
            || ParsedCommand::parse(text, &self.shared.registry).is_ok()
    }

    /// Current execution state.
    #[must_use]
    pub fn execution_state(&self) -> ExecutionState {
        *self.shared.lock_execution()
    }

    /// Returns `true` while a command holds the execution guard.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.execution_state() == ExecutionState::Executing
    }

    /// Subscribes to dispatcher events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DispatcherEvent> {
        self.shared.events.subscribe()
    }

    /// Runs `text` against `input_text` and returns the display output.
    ///
    /// Emits `ExecutionStateChanged(Executing)`, then on completion
    /// `ExecutionStateChanged(Idle)` followed by `CommandExecuted`. A call
    /// rejected because another command is running emits only
    /// `CommandExecuted`. Dropping the returned future releases the guard.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] describing why the command did not succeed;
    /// [`CommandError::result`] gives its classification.
    pub async fn execute_command(
        &self,
        text: &str,
        input_text: &str,
    ) -> Result<String, CommandError> {
        let Some(guard) = ExecutionGuard::acquire(&self.shared) else {
            let error = CommandError::ExecutionError;
            warn!(target: DISPATCH_TARGET, command = text, "rejected: another command is running");
            self.shared.publish_completion(text, Err(&error));
            return Err(error);
        };

        debug!(target: DISPATCH_TARGET, command = text, "executing command");
        let outcome = self.run(text, input_text).await;
        drop(guard);

        match &outcome {
            Ok(_) => info!(target: DISPATCH_TARGET, command = text, "command completed"),
            Err(error) => warn!(
                target: DISPATCH_TARGET,
                command = text,
                result = %error.result(),
                error = %error,
                "command failed"
            ),
        }
        self.shared.publish_completion(text, outcome.as_ref());
        outcome
    }

    async fn run(&self, text: &str, input_text: &str) -> Result<String, CommandError> {
        let registry = &self.shared.registry;
        let parsed = ParsedCommand::parse(text, registry)
            .map_err(|source| CommandError::invalid_command(text, source))?;
        let base = parsed.base_command();
        let definition = registry.get(base).ok_or_else(|| {
            CommandError::invalid_command(text, ParseError::unknown_command(base))
        })?;

        let state = self.shared.monitor.state();
        if !definition.is_available(state.is_ready()) {
            return Err(CommandError::server(
                base,
                RequestError::Unavailable { state },
            ));
        }
        if definition.requires_input && input_text.trim().is_empty() {
            return Err(CommandError::missing_input(base));
        }

        if definition.requires_server {
            let body = parsed.request_body(input_text, unix_timestamp());
            let response = self
                .shared
                .monitor
                .request(&parsed.endpoint(), &body)
                .await
                .map_err(|source| CommandError::server(base, source))?;
            Ok(format_response(base, &response))
        } else {
            Ok(self.run_local(base))
        }
    }

    fn run_local(&self, command: &str) -> String {
        match command {
            "help" => self.help_text(),
            "clear" => "Input cleared".to_owned(),
            other => format!("Local command '{other}' executed successfully"),
        }
    }

    fn help_text(&self) -> String {
        let server_ready = self.shared.monitor.is_ready();
        let mut lines = vec!["Available commands:".to_owned(), String::new()];
        lines.extend(self.shared.registry.definitions().map(|definition| {
            let marker = if definition.is_available(server_ready) {
                "[x]"
            } else {
                "[ ]"
            };
            format!("{marker} {} - {}", definition.name, definition.description)
        }));
        lines.join("\n")
    }

    /// Ranks command names against `query` and publishes the ranking.
    ///
    /// The local ranking is returned and published at once. When the backend
    /// is connected and the query is a single token, a fuzzy search is also
    /// started; a non-empty result that differs from the local ranking is
    /// published as a second `SuggestionsAvailable` for the same query.
    #[must_use]
    pub fn get_suggestions(&self, query: &str) -> Vec<String> {
        let local = rank_suggestions(self.shared.registry.names(), query);
        trace!(
            target: DISPATCH_TARGET,
            query,
            count = local.len(),
            "local suggestions ranked"
        );
        self.shared.publish(DispatcherEvent::SuggestionsAvailable {
            query: query.to_owned(),
            suggestions: local.clone(),
        });

        if self.shared.monitor.is_ready() && is_single_token(query) {
            match Handle::try_current() {
                Ok(handle) => {
                    let shared = Arc::clone(&self.shared);
                    let owned_query = query.to_owned();
                    let baseline = local.clone();
                    drop(handle.spawn(async move {
                        shared.enhance_suggestions(owned_query, baseline).await;
                    }));
                }
                Err(error) => {
                    debug!(
                        target: DISPATCH_TARGET,
                        %error,
                        "no runtime available for suggestion search"
                    );
                }
            }
        }
        local
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("registry", &self.shared.registry)
            .field("execution", &self.execution_state())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn lock_execution(&self) -> MutexGuard<'_, ExecutionState> {
        self.execution.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: DispatcherEvent) {
        if self.events.send(event).is_err() {
            trace!(target: DISPATCH_TARGET, "no dispatcher subscribers");
        }
    }

    fn publish_completion(&self, command: &str, outcome: Result<&String, &CommandError>) {
        let (result, output) = match outcome {
            Ok(output) => (CommandResult::Success, output.clone()),
            Err(error) => (error.result(), error.to_string()),
        };
        self.publish(DispatcherEvent::CommandExecuted {
            command: command.to_owned(),
            result,
            output,
        });
    }

    async fn enhance_suggestions(&self, query: String, local: Vec<String>) {
        let choices: Vec<&str> = self.registry.names().collect();
        let body = json!({ "query": query.trim(), "choices": choices });
        match self.monitor.request(SEARCH_ENDPOINT, &body).await {
            Ok(response) => {
                let remote = search_results(&response);
                if !remote.is_empty() && remote != local {
                    debug!(
                        target: DISPATCH_TARGET,
                        query = query.as_str(),
                        count = remote.len(),
                        "backend refined suggestions"
                    );
                    self.publish(DispatcherEvent::SuggestionsAvailable {
                        query,
                        suggestions: remote,
                    });
                }
            }
            Err(error) => {
                debug!(
                    target: DISPATCH_TARGET,
                    query = query.as_str(),
                    %error,
                    "suggestion search failed"
                );
            }
        }
    }
}

/// Holds [`ExecutionState::Executing`] for one command and restores `Idle`
/// when dropped, including when the owning future is cancelled.
struct ExecutionGuard<'a> {
    shared: &'a Shared,
}

impl<'a> ExecutionGuard<'a> {
    fn acquire(shared: &'a Shared) -> Option<Self> {
        let mut state = shared.lock_execution();
        if *state == ExecutionState::Executing {
            return None;
        }
        *state = ExecutionState::Executing;
        shared.publish(DispatcherEvent::ExecutionStateChanged(
            ExecutionState::Executing,
        ));
        Some(Self { shared })
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.lock_execution();
        *state = ExecutionState::Idle;
        self.shared
            .publish(DispatcherEvent::ExecutionStateChanged(ExecutionState::Idle));
    }
}

fn search_results(response: &JsonObject) -> Vec<String> {
    response
        .get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn is_single_token(query: &str) -> bool {
    query.split_whitespace().count() == 1
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests;
