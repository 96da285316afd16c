//! EC2-backed device pool adapters.
//!
//! Two adapters share the narrow client contracts of [`api`]: a reservation
//! side that resolves instance ids through describe-instances, and a
//! provisioning side that borrows capacity from an autoscaling group. The
//! clients themselves are injected; [`cli::AwsCliClient`] ships as the
//! process-backed implementation.

mod api;
mod autoscaling;
mod cli;
mod reservation;

#[cfg(test)]
mod tests;

pub use api::{
    ApiError, ApiFuture, AutoScalingApi, AutoScalingGroupState, Ec2Api, GroupInstance,
    InstanceDescription, LIFECYCLE_IN_SERVICE, LIFECYCLE_PENDING, STATE_PENDING, STATE_RUNNING,
    STATE_STOPPED, STATE_TERMINATED,
};
pub use autoscaling::{AutoscalingProvisionService, AutoscalingProvisionServiceBuilder};
pub use cli::{AwsCliClient, DEFAULT_AWS_BIN};
pub use reservation::{
    Ec2ReservationService, Ec2ReservationServiceBuilder, HostAddressFn, HostPlatformFn,
};
