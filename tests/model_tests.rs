//! Unit tests for model validation and builders.

use rstest::rstest;

use device_pool::test_support::platform;
use device_pool::{Host, PlatformOs, ProvisionInput, ProvisioningError, Reservation, Status};

#[rstest]
fn host_builder_applies_defaults_and_trims() {
    let host = Host::builder()
        .device_id("  dev-1  ")
        .host_name(" 198.51.100.7 ")
        .platform(platform())
        .build()
        .expect("host should build");

    assert_eq!(host.device_id, "dev-1");
    assert_eq!(host.host_name, "198.51.100.7");
    assert_eq!(host.port, 22);
    assert_eq!(host.proxy_jump, None);
}

#[rstest]
#[case::blank_device_id("device_id", " ", "name")]
#[case::blank_host_name("host_name", "dev-1", "  ")]
fn host_builder_rejects_blank_fields(
    #[case] expected_field: &str,
    #[case] device_id: &str,
    #[case] host_name: &str,
) {
    let err = Host::builder()
        .device_id(device_id)
        .host_name(host_name)
        .platform(platform())
        .build()
        .expect_err("build should fail");
    assert_eq!(
        err,
        ProvisioningError::InvalidInput {
            field: expected_field.to_owned()
        }
    );
}

#[rstest]
fn host_builder_requires_a_platform() {
    let err = Host::builder()
        .device_id("dev-1")
        .host_name("name")
        .build()
        .expect_err("build should fail");
    assert_eq!(
        err,
        ProvisioningError::InvalidInput {
            field: String::from("platform")
        }
    );
}

#[rstest]
fn provision_input_rejects_invalid_values() {
    let err = ProvisionInput::builder()
        .id("  ")
        .amount(1)
        .build()
        .expect_err("blank id should fail");
    assert_eq!(
        err,
        ProvisioningError::InvalidInput {
            field: String::from("id")
        }
    );

    let err = ProvisionInput::builder()
        .id("p1")
        .amount(0)
        .build()
        .expect_err("zero amount should fail");
    assert_eq!(
        err,
        ProvisioningError::InvalidInput {
            field: String::from("amount")
        }
    );
}

#[rstest]
fn provision_input_sequence_mints_unique_ids() {
    let first = ProvisionInput::sequence(2).expect("sequence should build");
    let second = ProvisionInput::sequence(2).expect("sequence should build");
    assert_eq!(first.amount, 2);
    assert!(!first.id.is_empty());
    assert_ne!(first.id, second.id);
}

#[rstest]
#[case(Status::Requested, false)]
#[case(Status::Provisioning, false)]
#[case(Status::Succeeded, true)]
#[case(Status::Failed, true)]
#[case(Status::Canceled, true)]
fn status_terminality(#[case] status: Status, #[case] terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
}

#[rstest]
fn provision_output_complete_appends_in_order() {
    let output = device_pool::ProvisionOutput::requested("p1")
        .with_status(Status::Provisioning)
        .complete(vec![
            Reservation::succeeded("H1"),
            Reservation::new("H2", Status::Provisioning),
        ]);

    assert_eq!(output.status, Status::Succeeded);
    let succeeded: Vec<&str> = output
        .succeeded_reservations()
        .map(|reservation| reservation.device_id.as_str())
        .collect();
    assert_eq!(succeeded, vec!["H1"]);
}

#[rstest]
fn platform_display_joins_os_and_arch() {
    assert_eq!(PlatformOs::new("linux", "aarch64").to_string(), "linux:aarch64");
}
