//! Core library for the device pool control plane.
//!
//! The crate hands out temporary, exclusive leases on a fleet of remote
//! compute hosts. Callers submit asynchronous provision requests, poll until
//! hosts are bound, exchange reservations for reachable coordinates, and
//! release hosts back to the pool. Three back-ends share one contract: a
//! local in-memory pool, an EC2 describe-backed reservation side, and an
//! autoscaling-group-backed provisioner.

pub mod config;
pub mod connection;
pub mod ec2;
pub mod error;
pub mod local;
pub mod model;
pub mod pool;
pub mod process;
pub mod service;
pub mod test_support;

pub use config::{ConfigError, DevicePoolConfig};
pub use connection::{
    CommandInput, Connection, ConnectionFactory, ContentTransferAgent, ContentTransferAgentFactory,
};
pub use ec2::{
    AutoScalingApi, AutoscalingProvisionService, AwsCliClient, Ec2Api, Ec2ReservationService,
};
pub use error::{ConnectionError, ContentTransferError, ProvisioningError, ReservationError};
pub use local::{HostInventory, LocalProvisionService, ProvisionLedger};
pub use model::{Host, PlatformOs, ProvisionInput, ProvisionOutput, Reservation, Status};
pub use pool::{BaseDevicePool, Device};
pub use process::{CommandOutput, CommandRunner, ProcessCommandRunner};
pub use service::{ProvisionService, ReservationService, ServiceFuture};
