//! Command routing to the automation engine.
//!
//! The router does not interpret the command vocabulary: every token is
//! forwarded unchanged to the engine after the fixed `-r <script folder> --`
//! arguments. Topic and action are only extracted for logging, which keeps the
//! server independent of the commands the engine understands.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use sikuli_config::ServerConfig;
use tracing::{debug, info};

use crate::runner::ProcessRunner;

use super::command::Command;
use super::errors::DispatchError;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const RESULT_PREFIX: &str = "Script executed, output: ";

/// How the engine is invoked for every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    executable: PathBuf,
    script_folder: Utf8PathBuf,
    strict_exit: bool,
}

impl EngineInvocation {
    /// Creates an invocation that folds non-zero exits into the output.
    pub fn new(executable: impl Into<PathBuf>, script_folder: impl Into<Utf8PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            script_folder: script_folder.into(),
            strict_exit: false,
        }
    }

    /// Builds the invocation described by the server configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.engine(), config.script_folder()).with_strict_exit(config.strict_exit())
    }

    /// Reports non-zero exits as errors when enabled.
    #[must_use]
    pub const fn with_strict_exit(mut self, strict_exit: bool) -> Self {
        self.strict_exit = strict_exit;
        self
    }

    /// Engine executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Script folder passed with `-r`.
    pub fn script_folder(&self) -> &Utf8Path {
        &self.script_folder
    }

    /// Arguments placed between the executable and the client tokens.
    pub fn fixed_args(&self) -> Vec<OsString> {
        vec![
            OsString::from("-r"),
            OsString::from(self.script_folder.as_str()),
            OsString::from("--"),
        ]
    }
}

/// Routes parsed commands to the process runner.
#[derive(Debug)]
pub struct CommandRouter<R> {
    runner: R,
    invocation: EngineInvocation,
}

impl<R> CommandRouter<R> {
    /// Creates a router around `runner`.
    pub const fn new(runner: R, invocation: EngineInvocation) -> Self {
        Self { runner, invocation }
    }

    /// Invocation used for every command.
    pub const fn invocation(&self) -> &EngineInvocation {
        &self.invocation
    }
}

impl<R: ProcessRunner> CommandRouter<R> {
    /// Runs the engine with the command's tokens and returns the result text.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Process`] when the engine cannot be run, and
    /// [`DispatchError::EngineExit`] for a non-zero exit in strict mode.
    pub fn route(&self, command: &Command) -> Result<String, DispatchError> {
        info!(
            target: DISPATCH_TARGET,
            topic = command.topic(),
            action = command.action(),
            "executing command"
        );
        let result = self.runner.run(
            self.invocation.executable(),
            &self.invocation.fixed_args(),
            command.tokens(),
        )?;
        debug!(
            target: DISPATCH_TARGET,
            exit_code = result.exit_code(),
            "engine run completed"
        );

        if self.invocation.strict_exit && result.exit_code() != 0 {
            return Err(DispatchError::EngineExit {
                status: result.exit_code(),
                output: result.into_output(),
            });
        }
        Ok(format!("{RESULT_PREFIX}{}", result.into_output()))
    }
}
