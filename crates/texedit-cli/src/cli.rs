//! Argument definitions for the `texedit` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Drives the TexEdit command dispatcher from a terminal.
#[derive(Parser, Debug)]
#[command(name = "texedit", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Lists every command with its description and availability.
    Commands {
        /// Waits for the backend before reporting availability.
        #[arg(long)]
        wait: bool,
    },
    /// Probes the backend and reports the connection state.
    Status,
    /// Executes a command against input text.
    Run {
        /// Reads input text from this file instead of stdin.
        #[arg(long, value_name = "PATH")]
        input_file: Option<PathBuf>,
        /// Command words, for example `summarise 40`.
        #[arg(value_name = "COMMAND", required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// Ranks command names against a partial query.
    Suggest {
        /// Partial command text, with or without a leading `/`.
        #[arg(value_name = "QUERY")]
        query: String,
    },
}
