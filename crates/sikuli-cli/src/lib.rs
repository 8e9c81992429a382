//! Client for the line-based automation command server.
//!
//! `sikuli-send` joins its positional tokens with single spaces, sends them as
//! one line and prints the server's single response line. The exit status
//! mirrors the response: success for `OK:`, failure for `ERROR:` and for any
//! transport problem. `--check` only verifies that the server accepts
//! connections.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sikuli_config::DEFAULT_PORT;

mod errors;
mod transport;

use errors::AppError;
use transport::{PROBE_TIMEOUT, connect, exchange};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const OK_PREFIX: &str = "OK:";

/// Command-line interface of `sikuli-send`.
#[derive(Parser, Debug)]
#[command(
    name = "sikuli-send",
    about = "Sends one automation command to a running sikulid server"
)]
pub struct Cli {
    /// Server host name or address.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Connect, send and receive timeout in seconds.
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
    /// Only check whether the server accepts connections.
    #[arg(long, conflicts_with = "tokens")]
    pub check: bool,
    /// Command tokens, for example `btn1 double 87`.
    #[arg(
        value_name = "TOKEN",
        required_unless_present = "check",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub tokens: Vec<String>,
}

impl Cli {
    fn command_line(&self) -> String {
        self.tokens.join(" ")
    }

    const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Runs the client using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            // Help and version output.
            drop(write!(stdout, "{error}"));
            return ExitCode::SUCCESS;
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    let outcome = if cli.check {
        probe(&cli, stdout)
    } else {
        send(&cli, stdout)
    };
    match outcome {
        Ok(exit_code) => exit_code,
        Err(error) => report(stderr, &error),
    }
}

fn probe<W: Write>(cli: &Cli, stdout: &mut W) -> Result<ExitCode, AppError> {
    let stream = connect(&cli.host, cli.port, PROBE_TIMEOUT)?;
    drop(stream);
    writeln!(stdout, "server reachable at {}:{}", cli.host, cli.port)
        .map_err(AppError::ForwardResponse)?;
    Ok(ExitCode::SUCCESS)
}

fn send<W: Write>(cli: &Cli, stdout: &mut W) -> Result<ExitCode, AppError> {
    let stream = connect(&cli.host, cli.port, cli.timeout())?;
    let response = exchange(stream, &cli.command_line(), cli.timeout())?;
    writeln!(stdout, "{response}").map_err(AppError::ForwardResponse)?;
    Ok(exit_code_for(&response))
}

fn exit_code_for(response: &str) -> ExitCode {
    if response.starts_with(OK_PREFIX) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    drop(writeln!(stderr, "sikuli-send: {error}"));
    ExitCode::FAILURE
}
