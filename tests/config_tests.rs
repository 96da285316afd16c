//! Unit tests for configuration validation and derived values.

use std::time::Duration;

use rstest::{fixture, rstest};

use device_pool::config::ConfigError;
use device_pool::{DevicePoolConfig, PlatformOs};

#[fixture]
fn valid_config() -> DevicePoolConfig {
    DevicePoolConfig {
        expire_provisions: true,
        provision_timeout_secs: 3600,
        autoscaling_group_name: Some(String::from("TestGroup")),
        platform_os: String::from("linux"),
        platform_arch: String::from("x86_64"),
        port: 22,
        proxy_jump: None,
        aws_bin: String::from("aws"),
    }
}

#[rstest]
fn config_defaults_produce_usable_values(valid_config: DevicePoolConfig) {
    valid_config.validate().expect("config should validate");
    assert_eq!(valid_config.provision_timeout(), Duration::from_secs(3600));
    assert_eq!(valid_config.platform(), PlatformOs::new("linux", "x86_64"));
}

#[rstest]
fn config_validation_rejects_zero_timeout(valid_config: DevicePoolConfig) {
    let cfg = DevicePoolConfig {
        provision_timeout_secs: 0,
        ..valid_config
    };
    let err = cfg.validate().expect_err("validation should fail");
    let ConfigError::MissingField(message) = err else {
        panic!("expected MissingField error");
    };
    assert!(
        message.contains("DEVICE_POOL_PROVISION_TIMEOUT_SECS"),
        "error should mention env var: {message}"
    );
}

#[rstest]
#[case::platform_os("DEVICE_POOL_PLATFORM_OS")]
#[case::platform_arch("DEVICE_POOL_PLATFORM_ARCH")]
#[case::aws_bin("DEVICE_POOL_AWS_BIN")]
fn config_validation_names_the_blank_field(
    valid_config: DevicePoolConfig,
    #[case] env_var: &str,
) {
    let mut cfg = valid_config;
    match env_var {
        "DEVICE_POOL_PLATFORM_OS" => cfg.platform_os = String::from("  "),
        "DEVICE_POOL_PLATFORM_ARCH" => cfg.platform_arch = String::from("  "),
        _ => cfg.aws_bin = String::from("  "),
    }

    let err = cfg.validate().expect_err("validation should fail");
    assert!(
        err.to_string().contains(env_var),
        "error should mention {env_var}: {err}"
    );
}

#[rstest]
fn config_validation_rejects_zero_port(valid_config: DevicePoolConfig) {
    let cfg = DevicePoolConfig {
        port: 0,
        ..valid_config
    };
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("DEVICE_POOL_PORT"));
}

#[rstest]
fn autoscaling_group_is_trimmed(valid_config: DevicePoolConfig) {
    let cfg = DevicePoolConfig {
        autoscaling_group_name: Some(String::from("  TestGroup  ")),
        ..valid_config
    };
    assert_eq!(
        cfg.autoscaling_group().expect("group should resolve"),
        "TestGroup"
    );
}

#[rstest]
#[case::absent(None)]
#[case::blank(Some(String::from("   ")))]
fn autoscaling_group_is_required(
    valid_config: DevicePoolConfig,
    #[case] group: Option<String>,
) {
    let cfg = DevicePoolConfig {
        autoscaling_group_name: group,
        ..valid_config
    };
    let err = cfg.autoscaling_group().expect_err("group should be missing");
    assert!(
        err.to_string()
            .contains("DEVICE_POOL_AUTOSCALING_GROUP_NAME"),
        "unexpected error: {err}"
    );
}
