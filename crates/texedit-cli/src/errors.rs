//! Error type reported by the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use texedit_commands::CommandError;
use texedit_link::{MonitorError, TransportError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to start the async runtime: {0}")]
    Runtime(io::Error),
    #[error("failed to initialise the backend client: {0}")]
    Transport(#[from] TransportError),
    #[error("failed to read input file {}: {source}", .path.display())]
    ReadInputFile { path: PathBuf, source: io::Error },
    #[error("failed to read input from stdin: {0}")]
    ReadStdin(io::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(#[from] io::Error),
    #[error("backend not ready: {0}")]
    Monitor(#[from] MonitorError),
    #[error("{0}")]
    Command(#[from] CommandError),
}
