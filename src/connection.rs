//! Collaborator seams for command channels and content transfer.
//!
//! The provisioning core never drives these traits itself; the surrounding
//! [`crate::pool::BaseDevicePool`] connects to a host immediately after a
//! reservation exchange and pairs the connection with a transfer agent.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;

use crate::error::{ConnectionError, ContentTransferError};
use crate::model::Host;
use crate::process::CommandOutput;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Shell command submitted over an established connection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInput {
    /// Executable or shell line to run on the device.
    pub line: String,
    /// Arguments appended to the line.
    pub args: Vec<String>,
    /// Upper bound on execution time.
    pub timeout: Duration,
}

impl CommandInput {
    /// Creates a command with no arguments and the default timeout.
    #[must_use]
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            args: Vec::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Replaces the execution timeout.
    #[must_use]
    pub const fn timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }
}

/// Established command channel to a single device.
pub trait Connection: Send + Sync {
    /// Executes a command on the device and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the channel fails.
    fn execute(&self, input: &CommandInput) -> Result<CommandOutput, ConnectionError>;
}

/// Produces [`Connection`]s for exchanged hosts.
pub trait ConnectionFactory: Send + Sync {
    /// Opens a command channel to the host.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the host is unreachable.
    fn connect(&self, host: &Host) -> Result<Arc<dyn Connection>, ConnectionError>;

    /// Releases factory-owned resources. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when teardown fails.
    fn close(&self) -> Result<(), ConnectionError> {
        Ok(())
    }
}

/// Moves files to and from a single device.
pub trait ContentTransferAgent: Send + Sync {
    /// Copies a local file or directory onto the device.
    ///
    /// # Errors
    ///
    /// Returns [`ContentTransferError`] when the transfer fails.
    fn send(&self, source: &Utf8Path, destination: &str) -> Result<(), ContentTransferError>;

    /// Copies a remote file or directory from the device.
    ///
    /// # Errors
    ///
    /// Returns [`ContentTransferError`] when the transfer fails.
    fn receive(&self, source: &str, destination: &Utf8Path) -> Result<(), ContentTransferError>;
}

/// Produces [`ContentTransferAgent`]s bound to a provision and connection.
pub trait ContentTransferAgentFactory: Send + Sync {
    /// Attaches a transfer agent to an established connection.
    ///
    /// # Errors
    ///
    /// Returns [`ContentTransferError`] when the agent cannot be created.
    fn connect(
        &self,
        provision_id: &str,
        connection: Arc<dyn Connection>,
        host: &Host,
    ) -> Result<Arc<dyn ContentTransferAgent>, ContentTransferError>;

    /// Releases factory-owned resources. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ContentTransferError`] when teardown fails.
    fn close(&self) -> Result<(), ContentTransferError> {
        Ok(())
    }
}
