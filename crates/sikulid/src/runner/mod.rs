//! Bridge to the external automation engine.
//!
//! [`SubprocessRunner`] launches the engine with stdout and stderr attached to
//! the same pipe, so the captured text interleaves both streams exactly as
//! the child wrote them. The calling worker blocks until the child exits and
//! the pipe is closed; without a configured timeout there is no upper bound on
//! that wait. A configured timeout covers both the child and output
//! collection, so a background process that keeps the pipe open cannot hold
//! the worker past it.

use std::ffi::OsString;
use std::io::{self, PipeReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

mod errors;
#[cfg(all(test, unix))]
mod tests;

pub use self::errors::ProcessError;

pub(crate) const RUNNER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runner");

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured output and exit status of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    output: String,
    exit_code: i32,
}

impl ExecutionResult {
    /// Creates a result from captured text and an exit code.
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    /// Merged stdout/stderr text.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Exit code, or `-1` when the child was terminated by a signal.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Consumes the result, returning the captured text.
    #[must_use]
    pub fn into_output(self) -> String {
        self.output
    }
}

/// Runs an external executable and captures its output.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner: Send + Sync {
    /// Runs `executable` with `fixed_args` followed by `extra_args`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the executable cannot be launched, its
    /// output cannot be captured, or waiting for it fails or times out.
    fn run(
        &self,
        executable: &Path,
        fixed_args: &[OsString],
        extra_args: &[String],
    ) -> Result<ExecutionResult, ProcessError>;
}

/// Builds the full argument vector `[executable] ++ fixed_args ++ extra_args`.
#[must_use]
pub fn build_argv(
    executable: &Path,
    fixed_args: &[OsString],
    extra_args: &[String],
) -> Vec<OsString> {
    let mut argv = Vec::with_capacity(1 + fixed_args.len() + extra_args.len());
    argv.push(executable.as_os_str().to_owned());
    argv.extend(fixed_args.iter().cloned());
    argv.extend(extra_args.iter().map(OsString::from));
    argv
}

/// Production runner that spawns the engine as a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessRunner {
    timeout: Option<Duration>,
}

impl SubprocessRunner {
    /// Creates a runner; `None` waits for the child indefinitely.
    #[must_use]
    pub const fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl ProcessRunner for SubprocessRunner {
    fn run(
        &self,
        executable: &Path,
        fixed_args: &[OsString],
        extra_args: &[String],
    ) -> Result<ExecutionResult, ProcessError> {
        let program = executable.display().to_string();
        debug!(
            target: RUNNER_TARGET,
            argv = ?build_argv(executable, fixed_args, extra_args),
            "launching engine"
        );

        let (mut child, reader) = spawn_merged(&program, executable, fixed_args, extra_args)?;
        let collector = match spawn_collector(reader) {
            Ok(collector) => collector,
            Err(source) => {
                reap(&mut child);
                return Err(ProcessError::capture(&program, source));
            }
        };

        let started = Instant::now();
        let waited = match self.timeout {
            None => child
                .wait()
                .map_err(|source| ProcessError::wait(&program, source)),
            Some(timeout) => wait_with_timeout(&program, &mut child, started, timeout),
        };
        // The collector thread is never joined; on error it is left to finish
        // once every holder of the pipe has exited.
        let status = waited?;
        let budget = self.timeout.map(|timeout| (started, timeout));
        let output = collect_output(&program, &collector, budget)?;

        let exit_code = status.code().unwrap_or(-1);
        for line in output.lines() {
            debug!(target: RUNNER_TARGET, line, "engine output");
        }
        debug!(target: RUNNER_TARGET, exit_code, "engine exited");
        Ok(ExecutionResult::new(output, exit_code))
    }
}

/// Spawns the child with stdout and stderr sharing one pipe.
fn spawn_merged(
    program: &str,
    executable: &Path,
    fixed_args: &[OsString],
    extra_args: &[String],
) -> Result<(Child, PipeReader), ProcessError> {
    let (reader, writer) = io::pipe().map_err(|source| ProcessError::capture(program, source))?;
    let stderr_writer = writer
        .try_clone()
        .map_err(|source| ProcessError::capture(program, source))?;

    let mut command = Command::new(executable);
    command
        .args(fixed_args)
        .args(extra_args)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(stderr_writer);
    let spawned = command.spawn();
    // The command holds the parent's copies of the write end; the reader only
    // sees end-of-file once they are closed.
    drop(command);
    let child = spawned.map_err(|source| ProcessError::launch(program, source))?;
    Ok((child, reader))
}

type Collected = io::Result<Vec<u8>>;

fn spawn_collector(mut reader: PipeReader) -> io::Result<Receiver<Collected>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(String::from("sikulid-capture"))
        .spawn(move || {
            let mut buffer = Vec::new();
            let collected = reader.read_to_end(&mut buffer).map(|_| buffer);
            drop(sender.send(collected));
        })?;
    Ok(receiver)
}

/// Waits for the collector, bounded by what remains of the timeout.
fn collect_output(
    program: &str,
    collector: &Receiver<Collected>,
    budget: Option<(Instant, Duration)>,
) -> Result<String, ProcessError> {
    let collected = match budget {
        None => collector.recv().map_err(|_| RecvTimeoutError::Disconnected),
        Some((started, timeout)) => {
            collector.recv_timeout(timeout.saturating_sub(started.elapsed()))
        }
    };
    let bytes = match collected {
        Ok(collected) => collected.map_err(|source| ProcessError::capture(program, source))?,
        Err(RecvTimeoutError::Timeout) => {
            let timeout_ms = budget.map_or(0, |(_, timeout)| duration_millis(timeout));
            warn!(
                target: RUNNER_TARGET,
                program,
                timeout_ms,
                "engine output still open after timeout, abandoning capture"
            );
            return Err(ProcessError::Timeout {
                program: program.to_owned(),
                timeout_ms,
            });
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(ProcessError::CollectorPanic {
                program: program.to_owned(),
            });
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn wait_with_timeout(
    program: &str,
    child: &mut Child,
    started: Instant,
    timeout: Duration,
) -> Result<ExitStatus, ProcessError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if started.elapsed() >= timeout => {
                warn!(
                    target: RUNNER_TARGET,
                    program,
                    timeout_ms = duration_millis(timeout),
                    "engine timed out, killing process"
                );
                reap(child);
                return Err(ProcessError::Timeout {
                    program: program.to_owned(),
                    timeout_ms: duration_millis(timeout),
                });
            }
            Ok(None) => thread::sleep(WAIT_POLL_INTERVAL),
            Err(source) => {
                reap(child);
                return Err(ProcessError::wait(program, source));
            }
        }
    }
}

fn reap(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
