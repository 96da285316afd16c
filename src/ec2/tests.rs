//! Unit tests for the EC2 adapters and the CLI-backed clients.

use rstest::rstest;

use crate::error::{ProvisioningError, ReservationError};
use crate::model::Reservation;
use crate::service::ReservationService;
use crate::test_support::{
    ScriptedEc2, ScriptedRunner, instance_description, json_describe_group,
    json_describe_instances, platform,
};

use super::api::{
    ApiError, AutoScalingApi, Ec2Api, InstanceDescription, LIFECYCLE_IN_SERVICE, STATE_RUNNING,
};
use super::autoscaling::AutoscalingProvisionService;
use super::cli::AwsCliClient;
use super::reservation::Ec2ReservationService;

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[tokio::test]
async fn cli_describe_instances_parses_output() {
    let runner = ScriptedRunner::new();
    runner.push_output(
        Some(0),
        json_describe_instances(&[("i-abc", STATE_RUNNING, "running", Some("203.0.113.7"))]),
        "",
    );

    let client = AwsCliClient::new("aws", runner.clone());
    let instances = client
        .describe_instances(&ids(&["i-abc"]))
        .await
        .expect("describe should succeed");

    assert_eq!(
        instances,
        vec![instance_description(
            "i-abc",
            STATE_RUNNING,
            "running",
            Some("203.0.113.7")
        )]
    );

    let invocation = &runner.invocations()[0];
    assert_eq!(invocation.program, "aws");
    let args: Vec<String> = invocation
        .args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(args[..3], ["ec2", "describe-instances", "--instance-ids"]);
    assert!(args.contains(&String::from("i-abc")));
}

#[tokio::test]
async fn cli_describe_instances_surfaces_command_failures() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(254), "", "AuthFailure");

    let client = AwsCliClient::new("aws", runner);
    let err = client
        .describe_instances(&ids(&["i-abc"]))
        .await
        .expect_err("describe should fail");
    assert!(matches!(err, ApiError::CommandFailure { .. }));
}

#[tokio::test]
async fn cli_describe_instances_surfaces_parse_failures() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), "not-json", "");

    let client = AwsCliClient::new("aws", runner);
    let err = client
        .describe_instances(&ids(&["i-abc"]))
        .await
        .expect_err("describe should fail");
    assert!(matches!(err, ApiError::Parse { .. }));
}

#[tokio::test]
async fn cli_describe_group_returns_first_group() {
    let runner = ScriptedRunner::new();
    runner.push_output(
        Some(0),
        json_describe_group("TestGroup", 2, &[("i-abc", LIFECYCLE_IN_SERVICE, "Healthy")]),
        "",
    );

    let client = AwsCliClient::new("aws", runner);
    let group = client
        .describe_group("TestGroup")
        .await
        .expect("describe should succeed")
        .expect("group should be present");

    assert_eq!(group.group_name, "TestGroup");
    assert_eq!(group.desired_capacity, 2);
    assert_eq!(group.instances.len(), 1);
    assert!(group.instances[0].is_in_service());
    assert!(group.instances[0].is_healthy());
}

#[tokio::test]
async fn cli_describe_group_reports_missing_groups() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), "{\"AutoScalingGroups\":[]}", "");

    let client = AwsCliClient::new("aws", runner);
    let group = client
        .describe_group("Missing")
        .await
        .expect("describe should succeed");
    assert!(group.is_none());
}

#[tokio::test]
async fn cli_detach_does_not_decrement_desired_capacity() {
    let runner = ScriptedRunner::new();
    runner.push_success();

    let client = AwsCliClient::new("aws", runner.clone());
    client
        .detach_instances("TestGroup", &ids(&["i-abc", "i-def"]))
        .await
        .expect("detach should succeed");

    let args: Vec<String> = runner.invocations()[0]
        .args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert!(args.contains(&String::from("--no-should-decrement-desired-capacity")));
    assert!(args.contains(&String::from("i-abc")));
    assert!(args.contains(&String::from("i-def")));
}

#[tokio::test]
async fn exchange_resolves_a_running_instance() {
    let ec2 = ScriptedEc2::new();
    ec2.push_instances(vec![instance_description(
        "i-abc",
        STATE_RUNNING,
        "running",
        Some("203.0.113.7"),
    )]);

    let service = Ec2ReservationService::builder(ec2.clone())
        .platform(platform())
        .build()
        .expect("service should build");

    let host = service
        .exchange(&Reservation::succeeded("i-abc"))
        .await
        .expect("exchange should succeed");
    assert_eq!(host.device_id, "i-abc");
    assert_eq!(host.host_name, "203.0.113.7");
    assert_eq!(host.port, 22);
    assert_eq!(host.platform, platform());

    assert_eq!(ec2.invocations(), vec![ids(&["i-abc"])]);
}

#[tokio::test]
async fn exchange_errors_when_the_instance_is_absent() {
    let ec2 = ScriptedEc2::new();
    ec2.push_instances(Vec::new());

    let service = Ec2ReservationService::builder(ec2)
        .platform(platform())
        .build()
        .expect("service should build");

    let err = service
        .exchange(&Reservation::succeeded("i-gone"))
        .await
        .expect_err("exchange should fail");
    assert_eq!(
        err,
        ReservationError::NotFound {
            device_id: String::from("i-gone")
        }
    );
}

#[tokio::test]
async fn exchange_errors_when_the_instance_has_no_address() {
    let ec2 = ScriptedEc2::new();
    ec2.push_instances(vec![instance_description(
        "i-abc",
        STATE_RUNNING,
        "running",
        None,
    )]);

    let service = Ec2ReservationService::builder(ec2)
        .platform(platform())
        .build()
        .expect("service should build");

    let err = service
        .exchange(&Reservation::succeeded("i-abc"))
        .await
        .expect_err("exchange should fail");
    assert_eq!(
        err,
        ReservationError::MissingAddress {
            device_id: String::from("i-abc")
        }
    );
}

#[tokio::test]
async fn exchange_supports_custom_extractors() {
    let ec2 = ScriptedEc2::new();
    ec2.push_instances(vec![InstanceDescription {
        instance_id: String::from("i-abc"),
        state_code: STATE_RUNNING,
        state_name: String::from("running"),
        public_ip_address: None,
        private_ip_address: Some(String::from("10.0.0.9")),
    }]);

    let service = Ec2ReservationService::builder(ec2)
        .platform(platform())
        .port(2222)
        .host_address(Box::new(|instance| instance.private_ip_address.clone()))
        .build()
        .expect("service should build");

    let host = service
        .exchange(&Reservation::succeeded("i-abc"))
        .await
        .expect("exchange should succeed");
    assert_eq!(host.host_name, "10.0.0.9");
    assert_eq!(host.port, 2222);
}

#[tokio::test]
async fn exchange_surfaces_provider_failures() {
    let ec2 = ScriptedEc2::new();
    ec2.push_failure("describe denied");

    let service = Ec2ReservationService::builder(ec2)
        .platform(platform())
        .build()
        .expect("service should build");

    let err = service
        .exchange(&Reservation::succeeded("i-abc"))
        .await
        .expect_err("exchange should fail");
    assert!(matches!(err, ReservationError::Provider { .. }));
}

#[rstest]
#[case("")]
#[case("   ")]
fn autoscaling_builder_rejects_blank_group_names(#[case] group_name: &str) {
    let err = AutoscalingProvisionService::builder(
        crate::test_support::ScriptedAutoScaling::new(),
        ScriptedEc2::new(),
    )
    .group_name(group_name)
    .build()
    .expect_err("build should fail");
    assert_eq!(
        err,
        ProvisioningError::InvalidInput {
            field: String::from("autoscaling_group_name")
        }
    );
}
