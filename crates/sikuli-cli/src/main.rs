//! CLI entrypoint for sending one command to the automation server.
//!
//! The binary delegates to [`sikuli_cli::run`], which parses the arguments,
//! sends the command line and mirrors the server's reply on stdout.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    sikuli_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
