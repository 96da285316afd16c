//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::model::PlatformOs;

/// Pool-wide configuration derived from environment variables, configuration
/// files, and CLI flags.
///
/// The local back-end's host seed is supplied programmatically through its
/// builder; only scalar knobs are layered here.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "DEVICE_POOL")]
pub struct DevicePoolConfig {
    /// Whether expired provisions are reaped in the background.
    #[ortho_config(default = true)]
    pub expire_provisions: bool,
    /// Provision lifetime in seconds, applied on create and by extend.
    #[ortho_config(default = 3600)]
    pub provision_timeout_secs: u64,
    /// Autoscaling group backing the autoscaling adapter.
    pub autoscaling_group_name: Option<String>,
    /// Operating system family reported for exchanged hosts.
    #[ortho_config(default = "linux".to_owned())]
    pub platform_os: String,
    /// CPU architecture reported for exchanged hosts.
    #[ortho_config(default = "x86_64".to_owned())]
    pub platform_arch: String,
    /// TCP port exchanged hosts listen on.
    #[ortho_config(default = 22)]
    pub port: u16,
    /// Optional jump host applied to exchanged hosts.
    pub proxy_jump: Option<String>,
    /// Path to the `aws` CLI binary used by the cloud clients.
    #[ortho_config(default = "aws".to_owned())]
    pub aws_bin: String,
}

impl DevicePoolConfig {
    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags
    /// in that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the provision lifetime as a [`Duration`].
    #[must_use]
    pub const fn provision_timeout(&self) -> Duration {
        Duration::from_secs(self.provision_timeout_secs)
    }

    /// Returns the platform tag applied to exchanged hosts.
    #[must_use]
    pub fn platform(&self) -> PlatformOs {
        PlatformOs::new(self.platform_os.clone(), self.platform_arch.clone())
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// or zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provision_timeout_secs == 0 {
            return Err(ConfigError::MissingField(
                "DEVICE_POOL_PROVISION_TIMEOUT_SECS".to_owned(),
            ));
        }
        if self.platform_os.trim().is_empty() {
            return Err(ConfigError::MissingField(
                "DEVICE_POOL_PLATFORM_OS".to_owned(),
            ));
        }
        if self.platform_arch.trim().is_empty() {
            return Err(ConfigError::MissingField(
                "DEVICE_POOL_PLATFORM_ARCH".to_owned(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::MissingField("DEVICE_POOL_PORT".to_owned()));
        }
        if self.aws_bin.trim().is_empty() {
            return Err(ConfigError::MissingField("DEVICE_POOL_AWS_BIN".to_owned()));
        }
        Ok(())
    }

    /// Returns the autoscaling group name required by the autoscaling
    /// adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the group name is absent
    /// or blank.
    pub fn autoscaling_group(&self) -> Result<String, ConfigError> {
        self.autoscaling_group_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                ConfigError::MissingField("DEVICE_POOL_AUTOSCALING_GROUP_NAME".to_owned())
            })
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
