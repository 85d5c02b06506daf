//! Terminal entrypoint for the TexEdit core.
//!
//! Delegates to [`texedit_cli::run`], which loads configuration, installs
//! telemetry and drives the connectivity monitor and command dispatcher.

use std::io::{self, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    // Left unlocked: the log subscriber writes to stderr as well.
    let mut stderr = io::stderr();
    texedit_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
