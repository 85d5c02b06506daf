//! Error types for command parsing and execution.

use texedit_link::RequestError;
use thiserror::Error;

use crate::events::CommandResult;

/// Reasons command text fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text was empty or whitespace.
    #[error("command text is empty")]
    Empty,
    /// The base command is not registered.
    #[error("unknown command '{command}'")]
    UnknownCommand {
        /// Base command as typed, case-folded.
        command: String,
    },
    /// `summarise` received more than one argument.
    #[error(
        "summarise takes at most one argument, got {count}; \
         usage: 'summarise' or 'summarise <percentage>'"
    )]
    TooManyArguments {
        /// Number of arguments supplied.
        count: usize,
    },
    /// The `summarise` argument was not an integer between 1 and 99.
    #[error("invalid summarise percentage '{value}': must be between 1 and 99")]
    InvalidPercentage {
        /// Argument as typed.
        value: String,
    },
}

impl ParseError {
    /// Creates an unknown command error.
    #[must_use]
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates an invalid percentage error.
    #[must_use]
    pub fn invalid_percentage(value: impl Into<String>) -> Self {
        Self::InvalidPercentage {
            value: value.into(),
        }
    }
}

/// Failures returned by [`crate::CommandDispatcher::execute_command`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// The text did not parse into a known command.
    #[error("invalid command '{text}': {source}")]
    InvalidCommand {
        /// Command text as submitted.
        text: String,
        /// Why parsing failed.
        #[source]
        source: ParseError,
    },
    /// The backend was unavailable or the request failed.
    #[error("command '{command}' failed: {source}")]
    ServerError {
        /// Base command.
        command: String,
        /// Underlying request failure.
        #[source]
        source: RequestError,
    },
    /// The command needs input text and none was given.
    #[error("command '{command}' requires input text")]
    ValidationError {
        /// Base command.
        command: String,
    },
    /// Another command holds the execution guard.
    #[error("cannot execute command: another command is already running")]
    ExecutionError,
}

impl CommandError {
    /// Creates an invalid command error.
    #[must_use]
    pub fn invalid_command(text: impl Into<String>, source: ParseError) -> Self {
        Self::InvalidCommand {
            text: text.into(),
            source,
        }
    }

    /// Creates a server error.
    #[must_use]
    pub fn server(command: impl Into<String>, source: RequestError) -> Self {
        Self::ServerError {
            command: command.into(),
            source,
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn missing_input(command: impl Into<String>) -> Self {
        Self::ValidationError {
            command: command.into(),
        }
    }

    /// Outcome classification reported alongside this error.
    #[must_use]
    pub const fn result(&self) -> CommandResult {
        match self {
            Self::InvalidCommand { .. } => CommandResult::InvalidCommand,
            Self::ServerError { .. } => CommandResult::ServerError,
            Self::ValidationError { .. } => CommandResult::ValidationError,
            Self::ExecutionError => CommandResult::ExecutionError,
        }
    }
}
