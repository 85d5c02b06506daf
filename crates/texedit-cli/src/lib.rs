//! Terminal driver for the TexEdit connectivity monitor and command
//! dispatcher.
//!
//! Leading configuration flags are routed to `ortho_config`, the rest of the
//! command line is parsed with `clap`, and the selected subcommand runs on a
//! Tokio runtime owned by this call. Configuration loading and the IO streams
//! can be substituted so tests drive the runtime without a real terminal.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::process::ExitCode;

use clap::Parser;
use texedit_config::Config;

mod cli;
mod config;
mod errors;
mod session;
mod telemetry;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;
use session::Session;

/// Bundles the streams handed to the runtime.
pub(crate) struct IoStreams<'a, R: Read, W: Write, E: Write> {
    pub(crate) stdin: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

struct CliRunner<'a, R: Read, W: Write, E: Write, L: ConfigLoader> {
    io: IoStreams<'a, R, W, E>,
    loader: &'a L,
}

impl<'a, R, W, E, L> CliRunner<'a, R, W, E, L>
where
    R: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: IoStreams<'a, R, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let result = Cli::try_parse_from(split.command_arguments.iter().cloned())
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                self.loader
                    .load(&split.config_arguments)
                    .map(|config| (cli, config))
            })
            .and_then(|(cli, config)| {
                telemetry::initialise(&config)?;
                self.execute(cli.command, &config)
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(AppError::CliUsage(error)) if !error.use_stderr() => {
                let _ = write!(self.io.stdout, "{}", error.render());
                ExitCode::SUCCESS
            }
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, command: CliCommand, config: &Config) -> Result<ExitCode, AppError> {
        let session = Session::new(config)?;
        let invocation = session.prepare(command, self.io.stdin)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(AppError::Runtime)?;
        runtime.block_on(session.execute(invocation, self.io.stdout))
    }
}

/// Runs the CLI with the given arguments and streams.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdin, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, R, W, E, L>(
    args: I,
    stdin: &mut R,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let io = IoStreams {
        stdin,
        stdout,
        stderr,
    };
    CliRunner::new(io, loader).run(args)
}
