//! Autoscaling adapter behaviour against scripted cloud clients.

use std::time::Duration;

use device_pool::ec2::{
    AutoscalingProvisionService, LIFECYCLE_IN_SERVICE, LIFECYCLE_PENDING, STATE_PENDING,
    STATE_RUNNING, STATE_STOPPED,
};
use device_pool::test_support::{
    AutoScalingCall, ScriptedAutoScaling, ScriptedEc2, group_instance, group_state,
    instance_description,
};
use device_pool::{
    ProvisionInput, ProvisionOutput, ProvisionService, ProvisioningError, Reservation, Status,
};

const GROUP: &str = "TestGroup";

fn input(id: &str, amount: usize) -> ProvisionInput {
    ProvisionInput::builder()
        .id(id)
        .amount(amount)
        .build()
        .expect("input should build")
}

fn service(
    autoscaling: &ScriptedAutoScaling,
    ec2: &ScriptedEc2,
) -> AutoscalingProvisionService<ScriptedAutoScaling, ScriptedEc2> {
    AutoscalingProvisionService::builder(autoscaling.clone(), ec2.clone())
        .group_name(GROUP)
        .poll_interval(Duration::from_millis(1))
        .build()
        .expect("service should build")
}

#[tokio::test]
async fn provision_detaches_in_service_instances_when_capacity_suffices() {
    let autoscaling = ScriptedAutoScaling::new();
    autoscaling.push_group(group_state(
        GROUP,
        1,
        vec![group_instance("i-abcedfgabc", LIFECYCLE_IN_SERVICE, "HEALTHY")],
    ));

    let output = service(&autoscaling, &ScriptedEc2::new())
        .provision(input("abc-efg", 1))
        .await
        .expect("provision should succeed");

    assert_eq!(output.id, "abc-efg");
    assert_eq!(output.status, Status::Succeeded);
    assert_eq!(output.reservations, vec![Reservation::succeeded("i-abcedfgabc")]);

    assert_eq!(
        autoscaling.calls(),
        vec![
            AutoScalingCall::DescribeGroup {
                group_name: GROUP.to_owned()
            },
            AutoScalingCall::DetachInstances {
                group_name: GROUP.to_owned(),
                instance_ids: vec![String::from("i-abcedfgabc")],
            },
            AutoScalingCall::SetDesiredCapacity {
                group_name: GROUP.to_owned(),
                desired_capacity: 0,
            },
        ]
    );
}

#[tokio::test]
async fn provision_grows_the_group_when_capacity_is_short() {
    let autoscaling = ScriptedAutoScaling::new();
    autoscaling.push_group(group_state(
        GROUP,
        1,
        vec![group_instance("i-abcedfgabc", LIFECYCLE_IN_SERVICE, "HEALTHY")],
    ));
    autoscaling.push_group(group_state(
        GROUP,
        3,
        vec![
            group_instance("i-abcedfgabc", LIFECYCLE_IN_SERVICE, "HEALTHY"),
            group_instance("i-defdefdef", LIFECYCLE_PENDING, "HEALTHY"),
        ],
    ));
    autoscaling.push_group(group_state(
        GROUP,
        3,
        vec![
            group_instance("i-abcedfgabc", LIFECYCLE_IN_SERVICE, "HEALTHY"),
            group_instance("i-defdefdef", LIFECYCLE_PENDING, "HEALTHY"),
            group_instance("i-hijhijhij", LIFECYCLE_PENDING, "HEALTHY"),
        ],
    ));

    let output = service(&autoscaling, &ScriptedEc2::new())
        .provision(input("this-test-is-something-else", 3))
        .await
        .expect("provision should succeed");

    assert_eq!(output.status, Status::Provisioning);
    assert_eq!(
        output.reservations,
        vec![
            Reservation::succeeded("i-abcedfgabc"),
            Reservation::new("i-defdefdef", Status::Provisioning),
            Reservation::new("i-hijhijhij", Status::Provisioning),
        ]
    );

    let calls = autoscaling.calls();
    assert_eq!(
        calls[1],
        AutoScalingCall::SetDesiredCapacity {
            group_name: GROUP.to_owned(),
            desired_capacity: 3,
        },
        "capacity is raised by the shortfall"
    );
    assert_eq!(
        calls[calls.len() - 2],
        AutoScalingCall::DetachInstances {
            group_name: GROUP.to_owned(),
            instance_ids: vec![
                String::from("i-abcedfgabc"),
                String::from("i-defdefdef"),
                String::from("i-hijhijhij"),
            ],
        },
        "every selected instance is detached in one call"
    );
    assert_eq!(
        calls[calls.len() - 1],
        AutoScalingCall::SetDesiredCapacity {
            group_name: GROUP.to_owned(),
            desired_capacity: 1,
        },
        "the original capacity is restored after the grow"
    );
}

#[tokio::test]
async fn describe_refreshes_pending_reservations_from_state_codes() {
    let ec2 = ScriptedEc2::new();
    ec2.push_instances(vec![
        instance_description("i-abcabcabc", STATE_RUNNING, "running", None),
        instance_description("i-defdefdef", STATE_PENDING, "pending", None),
        instance_description("i-hijhijhij", STATE_STOPPED, "stopped", None),
    ]);

    let pending = ProvisionOutput {
        id: String::from("abc-efg"),
        status: Status::Provisioning,
        reservations: vec![
            Reservation::new("i-abcabcabc", Status::Provisioning),
            Reservation::new("i-defdefdef", Status::Provisioning),
            Reservation::new("i-hijhijhij", Status::Provisioning),
        ],
        message: None,
    };

    let refreshed = service(&ScriptedAutoScaling::new(), &ec2)
        .describe(&pending)
        .await
        .expect("describe should succeed");

    assert_eq!(
        refreshed.reservations,
        vec![
            Reservation::succeeded("i-abcabcabc"),
            Reservation::new("i-defdefdef", Status::Provisioning),
            Reservation::new("i-hijhijhij", Status::Failed),
        ]
    );
    assert_eq!(refreshed.status, Status::Failed);
    assert!(refreshed.message.is_some());

    assert_eq!(
        ec2.invocations(),
        vec![vec![
            String::from("i-abcabcabc"),
            String::from("i-defdefdef"),
            String::from("i-hijhijhij"),
        ]]
    );
}

#[tokio::test]
async fn describe_skips_the_provider_when_nothing_is_pending() {
    let ec2 = ScriptedEc2::new();
    let done = ProvisionOutput {
        id: String::from("abc-efg"),
        status: Status::Succeeded,
        reservations: vec![Reservation::succeeded("i-abcabcabc")],
        message: None,
    };

    let refreshed = service(&ScriptedAutoScaling::new(), &ec2)
        .describe(&done)
        .await
        .expect("describe should succeed");

    assert_eq!(refreshed, done);
    assert!(ec2.invocations().is_empty(), "no RPC for terminal outputs");
}

#[tokio::test]
async fn provision_fails_when_the_group_is_missing() {
    let autoscaling = ScriptedAutoScaling::new();
    autoscaling.push_missing_group();

    let err = service(&autoscaling, &ScriptedEc2::new())
        .provision(input("p", 1))
        .await
        .expect_err("provision should fail");
    assert!(matches!(err, ProvisioningError::Provider { .. }));
}

#[tokio::test]
async fn provision_times_out_when_the_group_never_grows() {
    let autoscaling = ScriptedAutoScaling::new();
    for _ in 0..3 {
        autoscaling.push_group(group_state(GROUP, 1, Vec::new()));
    }

    let err = AutoscalingProvisionService::builder(autoscaling, ScriptedEc2::new())
        .group_name(GROUP)
        .poll_interval(Duration::from_millis(1))
        .wait_timeout(Duration::ZERO)
        .build()
        .expect("service should build")
        .provision(input("p", 2))
        .await
        .expect_err("provision should time out");
    assert!(matches!(err, ProvisioningError::Timeout { .. }));
}
