//! Data model shared by every device pool back-end.
//!
//! The records here are plain values: a [`Host`] never changes once built,
//! and the provisioning types ([`ProvisionInput`], [`ProvisionOutput`],
//! [`Reservation`]) travel by value between the public API, the ledger, and
//! the background assignment machinery.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ProvisioningError;

/// Default TCP port used to reach a host when none is configured.
pub const DEFAULT_HOST_PORT: u16 = 22;

/// Operating system and CPU architecture tag for a host.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct PlatformOs {
    /// Operating system family (for example `linux`).
    pub os: String,
    /// CPU architecture (for example `x86_64`).
    pub arch: String,
}

impl PlatformOs {
    /// Creates a platform tag from its two components.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }
}

impl fmt::Display for PlatformOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.os, self.arch)
    }
}

/// Lifecycle state of a provision or one of its reservations.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Accepted by the pool; no hosts bound yet.
    Requested,
    /// Host binding is underway or awaiting capacity.
    Provisioning,
    /// Every requested host is bound and reachable.
    Succeeded,
    /// The provision cannot complete.
    Failed,
    /// The provision was withdrawn before completion.
    Canceled,
}

impl Status {
    /// Returns `true` when no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// Immutable coordinate record for a reachable device.
///
/// Hosts are created externally or by a back-end adapter, stored by value in
/// the host inventory, and never mutated.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Host {
    /// Unique device identifier; the primary identity of the host.
    pub device_id: String,
    /// Hostname or address used to reach the device.
    pub host_name: String,
    /// TCP port exposed by the device.
    pub port: u16,
    /// Operating system and architecture tag.
    pub platform: PlatformOs,
    /// Optional jump host specification for proxied connections.
    pub proxy_jump: Option<String>,
}

impl Host {
    /// Starts a builder for a [`Host`].
    #[must_use]
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }
}

/// Builder for [`Host`] that defers trimming and validation to construction.
#[derive(Clone, Debug, Default)]
pub struct HostBuilder {
    device_id: String,
    host_name: String,
    port: Option<u16>,
    platform: Option<PlatformOs>,
    proxy_jump: Option<String>,
}

impl HostBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the device identifier.
    #[must_use]
    pub fn device_id(mut self, value: impl Into<String>) -> Self {
        self.device_id = value.into();
        self
    }

    /// Sets the hostname or address.
    #[must_use]
    pub fn host_name(mut self, value: impl Into<String>) -> Self {
        self.host_name = value.into();
        self
    }

    /// Sets the TCP port. Defaults to [`DEFAULT_HOST_PORT`].
    #[must_use]
    pub const fn port(mut self, value: u16) -> Self {
        self.port = Some(value);
        self
    }

    /// Sets the platform tag.
    #[must_use]
    pub fn platform(mut self, value: PlatformOs) -> Self {
        self.platform = Some(value);
        self
    }

    /// Sets the optional jump host.
    #[must_use]
    pub fn proxy_jump(mut self, value: Option<String>) -> Self {
        self.proxy_jump = value;
        self
    }

    /// Builds and validates the [`Host`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidInput`] when the device id or
    /// hostname is empty, or when no platform was supplied.
    pub fn build(self) -> Result<Host, ProvisioningError> {
        let device_id = self.device_id.trim().to_owned();
        if device_id.is_empty() {
            return Err(ProvisioningError::InvalidInput {
                field: String::from("device_id"),
            });
        }
        let host_name = self.host_name.trim().to_owned();
        if host_name.is_empty() {
            return Err(ProvisioningError::InvalidInput {
                field: String::from("host_name"),
            });
        }
        let platform = self.platform.ok_or_else(|| ProvisioningError::InvalidInput {
            field: String::from("platform"),
        })?;
        Ok(Host {
            device_id,
            host_name,
            port: self.port.unwrap_or(DEFAULT_HOST_PORT),
            platform,
            proxy_jump: self.proxy_jump.map(|value| value.trim().to_owned()),
        })
    }
}

/// A provision's claim on one specific device.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Reservation {
    /// Device the claim refers to.
    pub device_id: String,
    /// Current state of the claim.
    pub status: Status,
}

impl Reservation {
    /// Creates a reservation in the given state.
    #[must_use]
    pub fn new(device_id: impl Into<String>, status: Status) -> Self {
        Self {
            device_id: device_id.into(),
            status,
        }
    }

    /// Creates a reservation that already succeeded.
    #[must_use]
    pub fn succeeded(device_id: impl Into<String>) -> Self {
        Self::new(device_id, Status::Succeeded)
    }

    /// Returns a copy with the status replaced.
    #[must_use]
    pub fn with_status(&self, status: Status) -> Self {
        Self::new(self.device_id.clone(), status)
    }
}

/// Request for a number of devices, identified by a caller-chosen id.
///
/// The id doubles as the idempotency key: repeating a provision call with
/// the same id returns the existing ledger entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProvisionInput {
    /// Caller-chosen idempotency key.
    pub id: String,
    /// Number of devices requested; always at least one.
    pub amount: usize,
}

impl ProvisionInput {
    /// Starts a builder for a [`ProvisionInput`].
    #[must_use]
    pub fn builder() -> ProvisionInputBuilder {
        ProvisionInputBuilder::new()
    }

    /// Creates an input with a freshly minted unique id.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidInput`] when `amount` is zero.
    pub fn sequence(amount: usize) -> Result<Self, ProvisioningError> {
        Self::builder()
            .id(Uuid::new_v4().to_string())
            .amount(amount)
            .build()
    }
}

/// Builder for [`ProvisionInput`].
#[derive(Clone, Debug, Default)]
pub struct ProvisionInputBuilder {
    id: String,
    amount: usize,
}

impl ProvisionInputBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn id(mut self, value: impl Into<String>) -> Self {
        self.id = value.into();
        self
    }

    /// Sets the number of devices to request.
    #[must_use]
    pub const fn amount(mut self, value: usize) -> Self {
        self.amount = value;
        self
    }

    /// Builds and validates the [`ProvisionInput`].
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidInput`] when the id is empty or
    /// the amount is zero.
    pub fn build(self) -> Result<ProvisionInput, ProvisioningError> {
        let id = self.id.trim().to_owned();
        if id.is_empty() {
            return Err(ProvisioningError::InvalidInput {
                field: String::from("id"),
            });
        }
        if self.amount == 0 {
            return Err(ProvisioningError::InvalidInput {
                field: String::from("amount"),
            });
        }
        Ok(ProvisionInput {
            id,
            amount: self.amount,
        })
    }
}

/// Snapshot of a provision's progress.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProvisionOutput {
    /// Provision identity; equal to the input id.
    pub id: String,
    /// Overall state of the provision.
    pub status: Status,
    /// Claims bound so far, in binding order.
    pub reservations: Vec<Reservation>,
    /// Optional human-readable detail, set on failure.
    pub message: Option<String>,
}

impl ProvisionOutput {
    /// Creates the initial snapshot for a freshly accepted provision.
    #[must_use]
    pub fn requested(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: Status::Requested,
            reservations: Vec::new(),
            message: None,
        }
    }

    /// Returns a copy with the status replaced.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Returns a copy with the message replaced.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Appends newly bound reservations and marks the provision succeeded.
    #[must_use]
    pub fn complete(mut self, reservations: Vec<Reservation>) -> Self {
        self.reservations.extend(reservations);
        self.status = Status::Succeeded;
        self
    }

    /// Iterates over the reservations that reached [`Status::Succeeded`].
    pub fn succeeded_reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations
            .iter()
            .filter(|reservation| reservation.status == Status::Succeeded)
    }
}
