//! Outcome classification and the events published by the dispatcher.

use strum::Display;

/// Whether a command is currently running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionState {
    /// No command is running.
    #[default]
    Idle,
    /// A command holds the execution guard.
    Executing,
}

/// Classification of a command outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CommandResult {
    /// The command completed.
    Success,
    /// The text did not name a known command or its arguments were malformed.
    InvalidCommand,
    /// The backend was unavailable or the request failed.
    ServerError,
    /// Required input text was missing.
    ValidationError,
    /// Another command was already running.
    ExecutionError,
}

/// Notifications published by the dispatcher, in firing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherEvent {
    /// A command finished, successfully or not.
    CommandExecuted {
        /// Command text exactly as submitted.
        command: String,
        /// Outcome classification.
        result: CommandResult,
        /// Display text on success, error message otherwise.
        output: String,
    },
    /// The execution guard was taken or released.
    ExecutionStateChanged(ExecutionState),
    /// A ranking is available for `query`.
    SuggestionsAvailable {
        /// Query as typed by the user.
        query: String,
        /// Command names, best match first.
        suggestions: Vec<String>,
    },
}
