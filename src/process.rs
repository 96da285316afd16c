//! Subprocess execution behind a swappable runner trait.
//!
//! The cloud clients drive the `aws` CLI through [`CommandRunner`], which
//! lets unit tests substitute scripted outcomes for real processes. Only
//! failure to start a program is an error here; a non-zero exit travels
//! back inside [`CommandOutput`] so callers can attach the stderr to their
//! own error types.

use std::ffi::OsString;
use std::fmt;
use std::process::{Command, Output};

use thiserror::Error;

/// Captured outcome of one finished command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code, absent when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Standard output, decoded lossily as UTF-8.
    pub stdout: String,
    /// Standard error, decoded lossily as UTF-8.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Errors raised before a command produces any output.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProcessError {
    /// The program could not be started at all.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Operating system error text.
        message: String,
    },
}

impl ProcessError {
    /// Builds a spawn failure from any displayable cause.
    pub(crate) fn spawn(program: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::Spawn {
            program: program.into(),
            message: cause.to_string(),
        }
    }
}

/// Executes a program to completion and captures its outcome.
///
/// Implemented by [`ProcessCommandRunner`] for real invocations and by the
/// scripted runner in `test_support` for deterministic tests.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, waiting for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Spawn`] when the program cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProcessError>;
}

/// Runner that executes commands on the local machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProcessError> {
        Command::new(program)
            .args(args)
            .output()
            .map(CommandOutput::from)
            .map_err(|err| ProcessError::spawn(program, err))
    }
}
