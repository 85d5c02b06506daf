//! Subcommand handlers running against one monitor and dispatcher.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;

use texedit_commands::{CommandDispatcher, DispatcherEvent, ParsedCommand};
use texedit_config::Config;
use texedit_link::ConnectivityMonitor;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time;
use tracing::{debug, warn};

use crate::cli::CliCommand;
use crate::errors::AppError;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// A subcommand with its input already resolved.
#[derive(Debug)]
pub(crate) enum Invocation {
    Commands {
        wait: bool,
    },
    Status,
    Run {
        text: String,
        input: String,
        needs_backend: bool,
    },
    Suggest {
        query: String,
    },
}

pub(crate) struct Session<'a> {
    config: &'a Config,
    monitor: ConnectivityMonitor,
    dispatcher: CommandDispatcher,
}

impl<'a> Session<'a> {
    pub(crate) fn new(config: &'a Config) -> Result<Self, AppError> {
        let monitor = ConnectivityMonitor::from_config(config)?;
        let dispatcher = CommandDispatcher::new(monitor.clone());
        Ok(Self {
            config,
            monitor,
            dispatcher,
        })
    }

    /// Resolves `command` into an [`Invocation`], reading any input text
    /// it needs up front so no blocking IO happens on the runtime.
    pub(crate) fn prepare<R: Read>(
        &self,
        command: CliCommand,
        stdin: &mut R,
    ) -> Result<Invocation, AppError> {
        Ok(match command {
            CliCommand::Commands { wait } => Invocation::Commands { wait },
            CliCommand::Status => Invocation::Status,
            CliCommand::Run {
                input_file,
                command,
            } => {
                let text = command.join(" ");
                let registry = self.dispatcher.registry();
                let definition = ParsedCommand::parse(&text, registry)
                    .ok()
                    .and_then(|parsed| registry.get(parsed.base_command()).copied());
                let input = match definition {
                    Some(found) if found.requires_input => {
                        read_input(input_file.as_deref(), stdin)?
                    }
                    _ => String::new(),
                };
                Invocation::Run {
                    text,
                    input,
                    needs_backend: definition.is_some_and(|found| found.requires_server),
                }
            }
            CliCommand::Suggest { query } => Invocation::Suggest { query },
        })
    }

    pub(crate) async fn execute<W: Write>(
        &self,
        invocation: Invocation,
        stdout: &mut W,
    ) -> Result<ExitCode, AppError> {
        let outcome = match invocation {
            Invocation::Commands { wait } => self.list_commands(wait, stdout).await,
            Invocation::Status => self.report_status(stdout).await,
            Invocation::Run {
                text,
                input,
                needs_backend,
            } => self.run_command(&text, &input, needs_backend, stdout).await,
            Invocation::Suggest { query } => self.suggest(&query, stdout).await,
        };
        self.monitor.stop_monitoring();
        outcome
    }

    async fn list_commands<W: Write>(
        &self,
        wait: bool,
        stdout: &mut W,
    ) -> Result<ExitCode, AppError> {
        if wait {
            self.await_backend().await;
        }
        let ready = self.monitor.is_ready();
        for definition in self.dispatcher.registry().definitions() {
            let marker = if definition.is_available(ready) { "[x]" } else { "[ ]" };
            writeln!(
                stdout,
                "{marker} {:<10} {}",
                definition.name, definition.description
            )?;
        }
        Ok(ExitCode::SUCCESS)
    }

    async fn report_status<W: Write>(&self, stdout: &mut W) -> Result<ExitCode, AppError> {
        self.monitor.start_monitoring();
        let outcome = self
            .monitor
            .wait_until_ready(self.config.startup_timeout())
            .await;
        writeln!(
            stdout,
            "{}: {}",
            self.config.backend_url(),
            self.monitor.state()
        )?;
        outcome.map_err(AppError::from)?;
        Ok(ExitCode::SUCCESS)
    }

    async fn run_command<W: Write>(
        &self,
        text: &str,
        input: &str,
        needs_backend: bool,
        stdout: &mut W,
    ) -> Result<ExitCode, AppError> {
        if needs_backend {
            self.await_backend().await;
        }
        let output = self.dispatcher.execute_command(text, input).await?;
        writeln!(stdout, "{output}")?;
        Ok(ExitCode::SUCCESS)
    }

    async fn suggest<W: Write>(&self, query: &str, stdout: &mut W) -> Result<ExitCode, AppError> {
        let mut events = self.dispatcher.subscribe();
        self.monitor.start_monitoring();
        let ready = self
            .monitor
            .wait_until_ready(self.config.request_timeout())
            .await
            .is_ok();

        let local = self.dispatcher.get_suggestions(query);
        writeln!(stdout, "local: {}", local.join(" "))?;

        if ready {
            let refined = time::timeout(
                self.config.request_timeout(),
                refined_suggestions(&mut events, query, &local),
            )
            .await;
            match refined {
                Ok(Some(suggestions)) => writeln!(stdout, "backend: {}", suggestions.join(" "))?,
                Ok(None) | Err(_) => {
                    debug!(target: SESSION_TARGET, query, "no refined suggestions");
                }
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    async fn await_backend(&self) {
        self.monitor.start_monitoring();
        if let Err(error) = self
            .monitor
            .wait_until_ready(self.config.startup_timeout())
            .await
        {
            warn!(
                target: SESSION_TARGET,
                backend = %self.config.backend_url(),
                threshold = self.monitor.settings().failure_threshold(),
                %error,
                "backend not ready"
            );
        }
    }
}

fn read_input<R: Read>(input_file: Option<&Path>, stdin: &mut R) -> Result<String, AppError> {
    match input_file {
        Some(path) => fs::read_to_string(path).map_err(|source| AppError::ReadInputFile {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut text = String::new();
            stdin
                .read_to_string(&mut text)
                .map_err(AppError::ReadStdin)?;
            Ok(text)
        }
    }
}

async fn refined_suggestions(
    events: &mut broadcast::Receiver<DispatcherEvent>,
    query: &str,
    local: &[String],
) -> Option<Vec<String>> {
    loop {
        match events.recv().await {
            Ok(DispatcherEvent::SuggestionsAvailable {
                query: event_query,
                suggestions,
            }) if event_query == query && suggestions != local => return Some(suggestions),
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return None,
        }
    }
}
