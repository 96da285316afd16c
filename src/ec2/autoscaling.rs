//! Autoscaling-group-backed provisioning.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{ConfigError, DevicePoolConfig};
use crate::error::ProvisioningError;
use crate::model::{ProvisionInput, ProvisionOutput, Reservation, Status};
use crate::service::{ProvisionService, ServiceFuture};

use super::api::{
    ApiError, AutoScalingApi, AutoScalingGroupState, Ec2Api, GroupInstance, STATE_RUNNING,
    STATE_STOPPED, STATE_TERMINATED,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

fn provider_error(err: &ApiError) -> ProvisioningError {
    ProvisioningError::Provider {
        message: err.to_string(),
    }
}

/// Provisioning side backed by an EC2 autoscaling group.
///
/// Capacity is borrowed from the group: selected instances are detached in
/// one call and the desired capacity adjusted afterwards to compensate. The
/// arithmetic assumes this service is the only actor scaling the group;
/// concurrent external scaling can over- or under-shoot the target.
#[derive(Debug)]
pub struct AutoscalingProvisionService<A: AutoScalingApi, E: Ec2Api> {
    autoscaling: A,
    ec2: E,
    group_name: String,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl<A: AutoScalingApi, E: Ec2Api> AutoscalingProvisionService<A, E> {
    /// Starts a builder around injected autoscaling and EC2 clients.
    #[must_use]
    pub fn builder(autoscaling: A, ec2: E) -> AutoscalingProvisionServiceBuilder<A, E> {
        AutoscalingProvisionServiceBuilder::new(autoscaling, ec2)
    }

    async fn describe_group(&self) -> Result<AutoScalingGroupState, ProvisioningError> {
        self.autoscaling
            .describe_group(&self.group_name)
            .await
            .map_err(|err| provider_error(&err))?
            .ok_or_else(|| ProvisioningError::Provider {
                message: format!("autoscaling group {} not found", self.group_name),
            })
    }

    /// Polls the group until at least `amount` member instances exist.
    async fn wait_for_instances(
        &self,
        amount: usize,
    ) -> Result<Vec<GroupInstance>, ProvisioningError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let group = self.describe_group().await?;
            if group.instances.len() >= amount {
                return Ok(group.instances);
            }
            if Instant::now() > deadline {
                return Err(ProvisioningError::Timeout {
                    action: format!("{} instances in group {}", amount, self.group_name),
                });
            }
            debug!(
                group = %self.group_name,
                have = group.instances.len(),
                want = amount,
                "waiting for autoscaling group to grow"
            );
            sleep(self.poll_interval).await;
        }
    }

    async fn do_provision(
        &self,
        input: ProvisionInput,
    ) -> Result<ProvisionOutput, ProvisioningError> {
        let group = self.describe_group().await?;
        let previous_capacity = group.desired_capacity;
        let healthy: Vec<&GroupInstance> = group
            .instances
            .iter()
            .filter(|instance| instance.is_in_service() && instance.is_healthy())
            .collect();

        let (reservations, restore_capacity) = if healthy.len() >= input.amount {
            let reservations: Vec<Reservation> = healthy
                .iter()
                .take(input.amount)
                .map(|instance| Reservation::succeeded(&instance.instance_id))
                .collect();
            let amount = i64::try_from(input.amount).unwrap_or(i64::MAX);
            (reservations, previous_capacity - amount)
        } else {
            let missing = i64::try_from(input.amount - healthy.len()).unwrap_or(i64::MAX);
            self.autoscaling
                .set_desired_capacity(&self.group_name, previous_capacity + missing)
                .await
                .map_err(|err| provider_error(&err))?;
            info!(
                group = %self.group_name,
                desired = previous_capacity + missing,
                "raised desired capacity for provision"
            );
            let instances = self.wait_for_instances(input.amount).await?;
            let reservations: Vec<Reservation> = instances
                .iter()
                .take(input.amount)
                .map(|instance| {
                    let status = if instance.is_in_service() {
                        Status::Succeeded
                    } else {
                        Status::Provisioning
                    };
                    Reservation::new(&instance.instance_id, status)
                })
                .collect();
            (reservations, previous_capacity)
        };

        let instance_ids: Vec<String> = reservations
            .iter()
            .map(|reservation| reservation.device_id.clone())
            .collect();
        self.autoscaling
            .detach_instances(&self.group_name, &instance_ids)
            .await
            .map_err(|err| provider_error(&err))?;
        self.autoscaling
            .set_desired_capacity(&self.group_name, restore_capacity)
            .await
            .map_err(|err| provider_error(&err))?;

        let status = if reservations
            .iter()
            .all(|reservation| reservation.status == Status::Succeeded)
        {
            Status::Succeeded
        } else {
            Status::Provisioning
        };
        Ok(ProvisionOutput {
            id: input.id,
            status,
            reservations,
            message: None,
        })
    }

    /// Refreshes non-terminal reservation statuses from EC2 state codes.
    async fn do_describe(
        &self,
        output: &ProvisionOutput,
    ) -> Result<ProvisionOutput, ProvisioningError> {
        let pending_ids: Vec<String> = output
            .reservations
            .iter()
            .filter(|reservation| !reservation.status.is_terminal())
            .map(|reservation| reservation.device_id.clone())
            .collect();
        if pending_ids.is_empty() {
            return Ok(output.clone());
        }

        let instances = self
            .ec2
            .describe_instances(&pending_ids)
            .await
            .map_err(|err| provider_error(&err))?;
        let state_codes: HashMap<&str, i32> = instances
            .iter()
            .map(|instance| (instance.instance_id.as_str(), instance.state_code))
            .collect();

        let reservations: Vec<Reservation> = output
            .reservations
            .iter()
            .map(|reservation| {
                if reservation.status.is_terminal() {
                    return reservation.clone();
                }
                match state_codes.get(reservation.device_id.as_str()) {
                    Some(&STATE_RUNNING) => reservation.with_status(Status::Succeeded),
                    Some(&STATE_TERMINATED | &STATE_STOPPED) => {
                        reservation.with_status(Status::Failed)
                    }
                    Some(_) => reservation.with_status(Status::Provisioning),
                    None => reservation.clone(),
                }
            })
            .collect();

        let mut refreshed = ProvisionOutput {
            id: output.id.clone(),
            status: Status::Provisioning,
            reservations,
            message: output.message.clone(),
        };
        if refreshed
            .reservations
            .iter()
            .any(|reservation| reservation.status == Status::Failed)
        {
            refreshed.status = Status::Failed;
            refreshed.message = Some(String::from("one or more instances stopped or terminated"));
        } else if refreshed
            .reservations
            .iter()
            .all(|reservation| reservation.status == Status::Succeeded)
        {
            refreshed.status = Status::Succeeded;
        }
        Ok(refreshed)
    }
}

impl<A: AutoScalingApi, E: Ec2Api> ProvisionService for AutoscalingProvisionService<A, E> {
    fn provision(
        &self,
        input: ProvisionInput,
    ) -> ServiceFuture<'_, ProvisionOutput, ProvisioningError> {
        Box::pin(async move { self.do_provision(input).await })
    }

    fn describe<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, ProvisionOutput, ProvisioningError> {
        Box::pin(async move { self.do_describe(output).await })
    }

    /// Detached instances belong to the caller once provisioned; this
    /// adapter keeps no ledger, so there is nothing to return to the group.
    fn release<'a>(
        &'a self,
        _output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, usize, ProvisioningError> {
        Box::pin(async move { Ok(0) })
    }

    /// No TTL ledger exists on this adapter; extend is a no-op.
    fn extend<'a>(
        &'a self,
        _output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, (), ProvisioningError> {
        Box::pin(async move { Ok(()) })
    }

    fn close(&self) -> ServiceFuture<'_, (), ProvisioningError> {
        Box::pin(async move { Ok(()) })
    }
}

/// Builder for [`AutoscalingProvisionService`].
pub struct AutoscalingProvisionServiceBuilder<A: AutoScalingApi, E: Ec2Api> {
    autoscaling: A,
    ec2: E,
    group_name: String,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl<A: AutoScalingApi, E: Ec2Api> AutoscalingProvisionServiceBuilder<A, E> {
    /// Creates a builder with the default five second poll interval and
    /// five minute wait timeout.
    #[must_use]
    pub fn new(autoscaling: A, ec2: E) -> Self {
        Self {
            autoscaling,
            ec2,
            group_name: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Sets the autoscaling group to borrow capacity from.
    #[must_use]
    pub fn group_name(mut self, value: impl Into<String>) -> Self {
        self.group_name = value.into();
        self
    }

    /// Sets the interval between grow polls.
    #[must_use]
    pub const fn poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }

    /// Sets the deadline for the grow polling phase.
    #[must_use]
    pub const fn wait_timeout(mut self, value: Duration) -> Self {
        self.wait_timeout = value;
        self
    }

    /// Reads the group name from layered configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the configuration carries
    /// no group name.
    pub fn from_config(mut self, config: &DevicePoolConfig) -> Result<Self, ConfigError> {
        self.group_name = config.autoscaling_group()?;
        Ok(self)
    }

    /// Builds the service.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidInput`] when the group name is
    /// blank.
    pub fn build(self) -> Result<AutoscalingProvisionService<A, E>, ProvisioningError> {
        let group_name = self.group_name.trim().to_owned();
        if group_name.is_empty() {
            return Err(ProvisioningError::InvalidInput {
                field: String::from("autoscaling_group_name"),
            });
        }
        Ok(AutoscalingProvisionService {
            autoscaling: self.autoscaling,
            ec2: self.ec2,
            group_name,
            poll_interval: self.poll_interval,
            wait_timeout: self.wait_timeout,
        })
    }
}
