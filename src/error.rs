//! Error types surfaced by the device pool control plane.

use thiserror::Error;

/// Errors raised while creating, inspecting, or releasing provisions.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisioningError {
    /// Raised when a request or configuration field fails validation.
    #[error("invalid input: {field}")]
    InvalidInput {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Raised when no provision exists for the given id.
    #[error("could not find a provision with id {id}")]
    NotFound {
        /// Provision id that failed to resolve.
        id: String,
    },
    /// Raised when the request queue refuses a new provision.
    #[error("could not create a provision with id {id}")]
    QueueRefused {
        /// Provision id that was refused.
        id: String,
    },
    /// Raised when an asynchronous back-end operation exceeds its deadline.
    #[error("timeout waiting for {action}")]
    Timeout {
        /// Action being waited on.
        action: String,
    },
    /// Raised on any public call after the pool has been closed.
    #[error("device pool is closed")]
    Closed,
    /// Wrapper for cloud-provider failures.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the provider client.
        message: String,
    },
}

/// Errors raised while exchanging a reservation for host coordinates.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ReservationError {
    /// Raised when the device id cannot be resolved to a host.
    #[error("could not find a host with id {device_id}")]
    NotFound {
        /// Device id that failed to resolve.
        device_id: String,
    },
    /// Raised when the resolved instance exposes no usable address.
    #[error("device {device_id} has no reachable address")]
    MissingAddress {
        /// Device id lacking an address.
        device_id: String,
    },
    /// Raised on any public call after the pool has been closed.
    #[error("device pool is closed")]
    Closed,
    /// Wrapper for cloud-provider failures.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the provider client.
        message: String,
    },
}

/// Errors raised by connection factories and established connections.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConnectionError {
    /// Raised when a connection to a host cannot be established or used.
    #[error("connection to {host_name} failed: {message}")]
    Connect {
        /// Host the connection targeted.
        host_name: String,
        /// Underlying failure detail.
        message: String,
    },
}

/// Errors raised by content transfer agents and their factories.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ContentTransferError {
    /// Raised when content cannot be moved to or from a device.
    #[error("content transfer for provision {provision_id} failed: {message}")]
    Transfer {
        /// Provision the transfer belonged to.
        provision_id: String,
        /// Underlying failure detail.
        message: String,
    },
}

impl From<ReservationError> for ProvisioningError {
    fn from(value: ReservationError) -> Self {
        match value {
            ReservationError::Closed => Self::Closed,
            other => Self::Provider {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConnectionError> for ProvisioningError {
    fn from(value: ConnectionError) -> Self {
        Self::Provider {
            message: value.to_string(),
        }
    }
}

impl From<ContentTransferError> for ProvisioningError {
    fn from(value: ContentTransferError) -> Self {
        Self::Provider {
            message: value.to_string(),
        }
    }
}
