//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ec2::{
    ApiError, ApiFuture, AutoScalingApi, AutoScalingGroupState, Ec2Api, GroupInstance,
    InstanceDescription,
};
use crate::model::{Host, PlatformOs};
use crate::process::{CommandOutput, CommandRunner, ProcessError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn no_scripted_response(program: &str) -> ApiError {
    ApiError::Process(ProcessError::spawn(program, "no scripted response available"))
}

/// Returns a platform tag used by fixtures.
#[must_use]
pub fn platform() -> PlatformOs {
    PlatformOs::new("linux", "x86_64")
}

/// Builds a host fixture for the given device id.
///
/// # Panics
///
/// Panics when the id is blank; fixtures are test-controlled.
#[must_use]
pub fn host(device_id: &str) -> Host {
    Host::builder()
        .device_id(device_id)
        .host_name(format!("{device_id}.pool.internal"))
        .platform(platform())
        .build()
        .unwrap_or_else(|err| panic!("host fixture should build: {err}"))
}

/// Builds host fixtures for the given device ids.
#[must_use]
pub fn hosts(device_ids: &[&str]) -> Vec<Host> {
    device_ids.iter().map(|id| host(id)).collect()
}

/// Builds a group instance record for scripted autoscaling responses.
#[must_use]
pub fn group_instance(instance_id: &str, lifecycle_state: &str, health_status: &str) -> GroupInstance {
    GroupInstance {
        instance_id: instance_id.to_owned(),
        lifecycle_state: lifecycle_state.to_owned(),
        health_status: health_status.to_owned(),
    }
}

/// Builds an autoscaling group state for scripted responses.
#[must_use]
pub fn group_state(
    group_name: &str,
    desired_capacity: i64,
    instances: Vec<GroupInstance>,
) -> AutoScalingGroupState {
    AutoScalingGroupState {
        group_name: group_name.to_owned(),
        desired_capacity,
        instances,
    }
}

/// Builds an instance description for scripted EC2 responses.
#[must_use]
pub fn instance_description(
    instance_id: &str,
    state_code: i32,
    state_name: &str,
    public_ip_address: Option<&str>,
) -> InstanceDescription {
    InstanceDescription {
        instance_id: instance_id.to_owned(),
        state_code,
        state_name: state_name.to_owned(),
        public_ip_address: public_ip_address.map(str::to_owned),
        private_ip_address: None,
    }
}

/// Scripted EC2 client that returns pre-seeded responses in FIFO order.
#[derive(Clone, Debug, Default)]
pub struct ScriptedEc2 {
    responses: Arc<Mutex<VecDeque<Result<Vec<InstanceDescription>, ApiError>>>>,
    invocations: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedEc2 {
    /// Creates a client with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful describe response.
    pub fn push_instances(&self, instances: Vec<InstanceDescription>) {
        lock(&self.responses).push_back(Ok(instances));
    }

    /// Queues a failing describe response.
    pub fn push_failure(&self, message: &str) {
        lock(&self.responses).push_back(Err(ApiError::CommandFailure {
            program: String::from("aws"),
            status: Some(1),
            status_text: String::from("1"),
            stderr: message.to_owned(),
        }));
    }

    /// Returns the instance-id lists passed to describe calls so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<Vec<String>> {
        lock(&self.invocations).clone()
    }
}

impl Ec2Api for ScriptedEc2 {
    fn describe_instances<'a>(
        &'a self,
        instance_ids: &'a [String],
    ) -> ApiFuture<'a, Vec<InstanceDescription>> {
        Box::pin(async move {
            lock(&self.invocations).push(instance_ids.to_vec());
            lock(&self.responses)
                .pop_front()
                .unwrap_or_else(|| Err(no_scripted_response("scripted-ec2")))
        })
    }
}

/// One recorded call against [`ScriptedAutoScaling`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AutoScalingCall {
    /// A describe-group invocation.
    DescribeGroup {
        /// Group that was described.
        group_name: String,
    },
    /// A set-desired-capacity invocation.
    SetDesiredCapacity {
        /// Group that was resized.
        group_name: String,
        /// Requested capacity.
        desired_capacity: i64,
    },
    /// A detach-instances invocation.
    DetachInstances {
        /// Group instances were detached from.
        group_name: String,
        /// Detached instance ids, in call order.
        instance_ids: Vec<String>,
    },
}

/// Scripted autoscaling client returning pre-seeded group states in FIFO
/// order and recording every call.
#[derive(Clone, Debug, Default)]
pub struct ScriptedAutoScaling {
    describes: Arc<Mutex<VecDeque<Option<AutoScalingGroupState>>>>,
    calls: Arc<Mutex<Vec<AutoScalingCall>>>,
}

impl ScriptedAutoScaling {
    /// Creates a client with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a describe-group response.
    pub fn push_group(&self, state: AutoScalingGroupState) {
        lock(&self.describes).push_back(Some(state));
    }

    /// Queues a describe-group miss.
    pub fn push_missing_group(&self) {
        lock(&self.describes).push_back(None);
    }

    /// Returns every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<AutoScalingCall> {
        lock(&self.calls).clone()
    }
}

impl AutoScalingApi for ScriptedAutoScaling {
    fn describe_group<'a>(
        &'a self,
        group_name: &'a str,
    ) -> ApiFuture<'a, Option<AutoScalingGroupState>> {
        Box::pin(async move {
            lock(&self.calls).push(AutoScalingCall::DescribeGroup {
                group_name: group_name.to_owned(),
            });
            lock(&self.describes)
                .pop_front()
                .ok_or_else(|| no_scripted_response("scripted-autoscaling"))
        })
    }

    fn set_desired_capacity<'a>(
        &'a self,
        group_name: &'a str,
        desired_capacity: i64,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            lock(&self.calls).push(AutoScalingCall::SetDesiredCapacity {
                group_name: group_name.to_owned(),
                desired_capacity,
            });
            Ok(())
        })
    }

    fn detach_instances<'a>(
        &'a self,
        group_name: &'a str,
        instance_ids: &'a [String],
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            lock(&self.calls).push(AutoScalingCall::DetachInstances {
                group_name: group_name.to_owned(),
                instance_ids: instance_ids.to_vec(),
            });
            Ok(())
        })
    }
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic CLI outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

impl ScriptedRunner {
    /// Creates a runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Pushes a successful exit status with empty output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(&self, code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProcessError> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        lock(&self.responses)
            .pop_front()
            .ok_or_else(|| ProcessError::spawn(program, "no scripted response available"))
    }
}

/// Produces a minimal JSON payload matching `aws ec2 describe-instances`.
#[must_use]
pub fn json_describe_instances(instances: &[(&str, i32, &str, Option<&str>)]) -> String {
    let items = instances
        .iter()
        .map(|(id, code, name, ip)| {
            let ip_field = ip.map_or_else(String::new, |addr| {
                format!(",\"PublicIpAddress\":\"{addr}\"")
            });
            format!(
                "{{\"InstanceId\":\"{id}\",\"State\":{{\"Code\":{code},\"Name\":\"{name}\"}}{ip_field}}}"
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("{{\"Reservations\":[{{\"Instances\":[{items}]}}]}}")
}

/// Produces a minimal JSON payload matching
/// `aws autoscaling describe-auto-scaling-groups`.
#[must_use]
pub fn json_describe_group(
    group_name: &str,
    desired_capacity: i64,
    instances: &[(&str, &str, &str)],
) -> String {
    let items = instances
        .iter()
        .map(|(id, lifecycle, health)| {
            format!(
                "{{\"InstanceId\":\"{id}\",\"LifecycleState\":\"{lifecycle}\",\"HealthStatus\":\"{health}\"}}"
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{{\"AutoScalingGroups\":[{{\"AutoScalingGroupName\":\"{group_name}\",\"DesiredCapacity\":{desired_capacity},\"Instances\":[{items}]}}]}}"
    )
}
