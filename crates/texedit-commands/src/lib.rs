//! Command interpretation for the TexEdit assistant.
//!
//! The [`CommandDispatcher`] turns free-text commands such as `summarise 40`
//! or `tone` into validated backend requests. It owns the immutable
//! [`CommandRegistry`], enforces single-flight execution, formats backend
//! replies for display and ranks autocomplete suggestions. Outcomes are
//! returned to the caller and also published as [`DispatcherEvent`]s.

mod dispatcher;
mod errors;
mod events;
mod format;
mod parse;
mod registry;
mod suggest;

pub use dispatcher::CommandDispatcher;
pub use errors::{CommandError, ParseError};
pub use events::{CommandResult, DispatcherEvent, ExecutionState};
pub use format::format_response;
pub use parse::{CommandArguments, ParsedCommand, SummaryRange};
pub use registry::{CommandDefinition, CommandRegistry};
pub use suggest::{normalise_query, rank_suggestions};
