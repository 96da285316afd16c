//! Narrow client contracts for the EC2 and Auto Scaling control planes.
//!
//! The adapters never talk to AWS directly; they consume these traits as
//! opaque RPC objects injected at construction time. The shipped
//! implementation shells out to the `aws` CLI (see [`super::cli`]); tests
//! inject scripted fakes.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::process::ProcessError;

/// EC2 instance state code for a pending instance.
pub const STATE_PENDING: i32 = 0;
/// EC2 instance state code for a running instance.
pub const STATE_RUNNING: i32 = 16;
/// EC2 instance state code for a terminated instance.
pub const STATE_TERMINATED: i32 = 48;
/// EC2 instance state code for a stopped instance.
pub const STATE_STOPPED: i32 = 80;

/// Lifecycle state string reported for in-service group members.
pub const LIFECYCLE_IN_SERVICE: &str = "InService";
/// Lifecycle state string reported for pending group members.
pub const LIFECYCLE_PENDING: &str = "Pending";

/// Future returned by client operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Errors raised by the cloud clients.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// Raised when the underlying command cannot be executed.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Raised when the CLI returns a non-zero exit status.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (typically `aws`).
        program: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when client output cannot be parsed.
    #[error("failed to parse {resource} output: {message}")]
    Parse {
        /// Resource type being parsed (for example `instances`).
        resource: String,
        /// Parser error message.
        message: String,
    },
}

/// Snapshot of one EC2 instance returned by a describe call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceDescription {
    /// Provider instance identifier.
    pub instance_id: String,
    /// Numeric instance state code (see the `STATE_*` constants).
    pub state_code: i32,
    /// Instance state name as reported by the provider.
    pub state_name: String,
    /// Public IPv4 address, when assigned.
    pub public_ip_address: Option<String>,
    /// Private IPv4 address, when assigned.
    pub private_ip_address: Option<String>,
}

/// One member instance of an autoscaling group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupInstance {
    /// Provider instance identifier.
    pub instance_id: String,
    /// Lifecycle state within the group (for example `InService`).
    pub lifecycle_state: String,
    /// Health status within the group (for example `Healthy`).
    pub health_status: String,
}

impl GroupInstance {
    /// Returns `true` when the instance is serving within the group.
    #[must_use]
    pub fn is_in_service(&self) -> bool {
        self.lifecycle_state == LIFECYCLE_IN_SERVICE
    }

    /// Returns `true` when the group reports the instance healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.health_status.eq_ignore_ascii_case("healthy")
    }
}

/// State of an autoscaling group relevant to provisioning.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AutoScalingGroupState {
    /// Name of the group.
    pub group_name: String,
    /// Desired capacity currently set on the group.
    pub desired_capacity: i64,
    /// Member instances, in provider order.
    pub instances: Vec<GroupInstance>,
}

/// Client contract for the EC2 describe surface.
pub trait Ec2Api: Send + Sync {
    /// Describes the given instances, returning one record per instance the
    /// provider still knows about.
    fn describe_instances<'a>(
        &'a self,
        instance_ids: &'a [String],
    ) -> ApiFuture<'a, Vec<InstanceDescription>>;
}

/// Client contract for the Auto Scaling control surface.
pub trait AutoScalingApi: Send + Sync {
    /// Describes a group by name; `None` when the group does not exist.
    fn describe_group<'a>(
        &'a self,
        group_name: &'a str,
    ) -> ApiFuture<'a, Option<AutoScalingGroupState>>;

    /// Sets the group's desired capacity.
    fn set_desired_capacity<'a>(
        &'a self,
        group_name: &'a str,
        desired_capacity: i64,
    ) -> ApiFuture<'a, ()>;

    /// Detaches the given instances from the group without decrementing its
    /// desired capacity.
    fn detach_instances<'a>(
        &'a self,
        group_name: &'a str,
        instance_ids: &'a [String],
    ) -> ApiFuture<'a, ()>;
}
