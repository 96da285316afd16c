//! `aws` CLI-backed implementations of the cloud client contracts.
//!
//! Requests are issued as CLI invocations with `--output json` and the
//! responses parsed into the narrow records of [`super::api`]. Everything
//! goes through a [`CommandRunner`] so tests can script the CLI without
//! spawning processes.

use std::ffi::OsString;

use serde::Deserialize;

use crate::process::{CommandOutput, CommandRunner, ProcessCommandRunner};

use super::api::{
    ApiError, ApiFuture, AutoScalingApi, AutoScalingGroupState, Ec2Api, GroupInstance,
    InstanceDescription,
};

/// Default `aws` CLI binary name.
pub const DEFAULT_AWS_BIN: &str = "aws";

/// Cloud client that shells out to the `aws` CLI.
#[derive(Clone, Debug)]
pub struct AwsCliClient<R: CommandRunner> {
    aws_bin: String,
    runner: R,
}

impl AwsCliClient<ProcessCommandRunner> {
    /// Creates a client wired to the real process runner.
    #[must_use]
    pub fn with_process_runner(aws_bin: impl Into<String>) -> Self {
        Self::new(aws_bin, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> AwsCliClient<R> {
    /// Creates a client using the provided binary name and runner.
    #[must_use]
    pub fn new(aws_bin: impl Into<String>, runner: R) -> Self {
        Self {
            aws_bin: aws_bin.into(),
            runner,
        }
    }

    fn check_output(&self, output: CommandOutput, resource: &str) -> Result<String, ApiError> {
        if output.is_success() {
            return Ok(output.stdout);
        }
        let status_text = output
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        Err(ApiError::CommandFailure {
            program: self.aws_bin.clone(),
            status: output.code,
            status_text,
            stderr: format!("{resource}: {}", output.stderr),
        })
    }

    fn run_json<T>(&self, args: &[OsString], resource: &str) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let output = self.runner.run(&self.aws_bin, args)?;
        let stdout = self.check_output(output, resource)?;
        serde_json::from_str::<T>(&stdout).map_err(|err| ApiError::Parse {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
    }

    fn run_checked(&self, args: &[OsString], resource: &str) -> Result<(), ApiError> {
        let output = self.runner.run(&self.aws_bin, args)?;
        self.check_output(output, resource).map(|_| ())
    }
}

impl<R: CommandRunner> Ec2Api for AwsCliClient<R> {
    fn describe_instances<'a>(
        &'a self,
        instance_ids: &'a [String],
    ) -> ApiFuture<'a, Vec<InstanceDescription>> {
        Box::pin(async move {
            let mut args = vec![
                OsString::from("ec2"),
                OsString::from("describe-instances"),
                OsString::from("--instance-ids"),
            ];
            args.extend(instance_ids.iter().map(OsString::from));
            args.push(OsString::from("--output"));
            args.push(OsString::from("json"));

            let payload: DescribeInstancesPayload = self.run_json(&args, "instances")?;
            Ok(payload
                .reservations
                .into_iter()
                .flat_map(|reservation| reservation.instances)
                .map(|instance| InstanceDescription {
                    instance_id: instance.instance_id,
                    state_code: instance.state.code,
                    state_name: instance.state.name,
                    public_ip_address: instance.public_ip_address,
                    private_ip_address: instance.private_ip_address,
                })
                .collect())
        })
    }
}

impl<R: CommandRunner> AutoScalingApi for AwsCliClient<R> {
    fn describe_group<'a>(
        &'a self,
        group_name: &'a str,
    ) -> ApiFuture<'a, Option<AutoScalingGroupState>> {
        Box::pin(async move {
            let args = vec![
                OsString::from("autoscaling"),
                OsString::from("describe-auto-scaling-groups"),
                OsString::from("--auto-scaling-group-names"),
                OsString::from(group_name),
                OsString::from("--output"),
                OsString::from("json"),
            ];

            let payload: DescribeGroupsPayload = self.run_json(&args, "autoscaling group")?;
            Ok(payload
                .auto_scaling_groups
                .into_iter()
                .next()
                .map(|group| AutoScalingGroupState {
                    group_name: group.auto_scaling_group_name,
                    desired_capacity: group.desired_capacity,
                    instances: group
                        .instances
                        .into_iter()
                        .map(|instance| GroupInstance {
                            instance_id: instance.instance_id,
                            lifecycle_state: instance.lifecycle_state,
                            health_status: instance.health_status,
                        })
                        .collect(),
                }))
        })
    }

    fn set_desired_capacity<'a>(
        &'a self,
        group_name: &'a str,
        desired_capacity: i64,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let args = vec![
                OsString::from("autoscaling"),
                OsString::from("set-desired-capacity"),
                OsString::from("--auto-scaling-group-name"),
                OsString::from(group_name),
                OsString::from("--desired-capacity"),
                OsString::from(desired_capacity.to_string()),
            ];
            self.run_checked(&args, "set desired capacity")
        })
    }

    fn detach_instances<'a>(
        &'a self,
        group_name: &'a str,
        instance_ids: &'a [String],
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut args = vec![
                OsString::from("autoscaling"),
                OsString::from("detach-instances"),
                OsString::from("--auto-scaling-group-name"),
                OsString::from(group_name),
                OsString::from("--instance-ids"),
            ];
            args.extend(instance_ids.iter().map(OsString::from));
            args.push(OsString::from("--no-should-decrement-desired-capacity"));
            args.push(OsString::from("--output"));
            args.push(OsString::from("json"));
            self.run_checked(&args, "detach instances")
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesPayload {
    #[serde(default)]
    reservations: Vec<ReservationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReservationPayload {
    #[serde(default)]
    instances: Vec<InstancePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstancePayload {
    instance_id: String,
    state: StatePayload,
    public_ip_address: Option<String>,
    private_ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatePayload {
    code: i32,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeGroupsPayload {
    #[serde(default)]
    auto_scaling_groups: Vec<GroupPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupPayload {
    auto_scaling_group_name: String,
    desired_capacity: i64,
    #[serde(default)]
    instances: Vec<GroupInstancePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupInstancePayload {
    instance_id: String,
    lifecycle_state: String,
    health_status: String,
}
