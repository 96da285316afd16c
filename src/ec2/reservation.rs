//! EC2 describe-backed reservation exchange.

use crate::config::DevicePoolConfig;
use crate::error::{ProvisioningError, ReservationError};
use crate::model::{DEFAULT_HOST_PORT, Host, PlatformOs, Reservation};
use crate::service::{ReservationService, ServiceFuture};

use super::api::{ApiError, Ec2Api, InstanceDescription};

/// Extractor producing the address an exchanged host is reached on.
pub type HostAddressFn = Box<dyn Fn(&InstanceDescription) -> Option<String> + Send + Sync>;

/// Extractor producing the platform tag for an exchanged host.
pub type HostPlatformFn = Box<dyn Fn(&InstanceDescription) -> PlatformOs + Send + Sync>;

/// Reservation side backed by EC2 describe-instances.
///
/// Reservations carry instance ids; `exchange` resolves one into a [`Host`]
/// through configurable extractors. The defaults use the public IPv4
/// address, port 22, and the caller-supplied platform.
pub struct Ec2ReservationService<E: Ec2Api> {
    ec2: E,
    port: u16,
    proxy_jump: Option<String>,
    host_address: HostAddressFn,
    host_platform: HostPlatformFn,
}

impl<E: Ec2Api> Ec2ReservationService<E> {
    /// Starts a builder for an [`Ec2ReservationService`].
    #[must_use]
    pub fn builder(ec2: E) -> Ec2ReservationServiceBuilder<E> {
        Ec2ReservationServiceBuilder::new(ec2)
    }

    fn convert_host(&self, instance: &InstanceDescription) -> Result<Host, ReservationError> {
        let address =
            (self.host_address)(instance).ok_or_else(|| ReservationError::MissingAddress {
                device_id: instance.instance_id.clone(),
            })?;
        Host::builder()
            .device_id(&instance.instance_id)
            .host_name(address)
            .port(self.port)
            .platform((self.host_platform)(instance))
            .proxy_jump(self.proxy_jump.clone())
            .build()
            .map_err(|err| ReservationError::Provider {
                message: err.to_string(),
            })
    }
}

impl<E: Ec2Api> ReservationService for Ec2ReservationService<E> {
    fn exchange<'a>(
        &'a self,
        reservation: &'a Reservation,
    ) -> ServiceFuture<'a, Host, ReservationError> {
        Box::pin(async move {
            let ids = [reservation.device_id.clone()];
            let instances =
                self.ec2
                    .describe_instances(&ids)
                    .await
                    .map_err(|err: ApiError| ReservationError::Provider {
                        message: err.to_string(),
                    })?;
            let Some(instance) = instances.first() else {
                return Err(ReservationError::NotFound {
                    device_id: reservation.device_id.clone(),
                });
            };
            self.convert_host(instance)
        })
    }

    fn close(&self) -> ServiceFuture<'_, (), ReservationError> {
        Box::pin(async move { Ok(()) })
    }
}

/// Builder for [`Ec2ReservationService`].
pub struct Ec2ReservationServiceBuilder<E: Ec2Api> {
    ec2: E,
    platform: Option<PlatformOs>,
    port: u16,
    proxy_jump: Option<String>,
    host_address: Option<HostAddressFn>,
    host_platform: Option<HostPlatformFn>,
}

impl<E: Ec2Api> Ec2ReservationServiceBuilder<E> {
    /// Creates a builder around an injected EC2 client.
    #[must_use]
    pub fn new(ec2: E) -> Self {
        Self {
            ec2,
            platform: None,
            port: DEFAULT_HOST_PORT,
            proxy_jump: None,
            host_address: None,
            host_platform: None,
        }
    }

    /// Sets the platform tag reported for exchanged hosts.
    #[must_use]
    pub fn platform(mut self, value: PlatformOs) -> Self {
        self.platform = Some(value);
        self
    }

    /// Sets the TCP port for exchanged hosts. Defaults to 22.
    #[must_use]
    pub const fn port(mut self, value: u16) -> Self {
        self.port = value;
        self
    }

    /// Sets the optional jump host.
    #[must_use]
    pub fn proxy_jump(mut self, value: Option<String>) -> Self {
        self.proxy_jump = value;
        self
    }

    /// Replaces the address extractor. The default reads the public IPv4
    /// address.
    #[must_use]
    pub fn host_address(mut self, value: HostAddressFn) -> Self {
        self.host_address = Some(value);
        self
    }

    /// Replaces the platform extractor. The default reports the configured
    /// platform for every instance.
    #[must_use]
    pub fn host_platform(mut self, value: HostPlatformFn) -> Self {
        self.host_platform = Some(value);
        self
    }

    /// Applies the port, proxy, and platform knobs from layered
    /// configuration.
    #[must_use]
    pub fn from_config(mut self, config: &DevicePoolConfig) -> Self {
        self.platform = Some(config.platform());
        self.port = config.port;
        self.proxy_jump = config.proxy_jump.clone();
        self
    }

    /// Builds the service.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidInput`] when no platform was
    /// supplied.
    pub fn build(self) -> Result<Ec2ReservationService<E>, ProvisioningError> {
        let platform = self.platform.ok_or_else(|| ProvisioningError::InvalidInput {
            field: String::from("platform"),
        })?;
        let host_platform = self.host_platform.unwrap_or_else(|| {
            Box::new(move |_instance: &InstanceDescription| platform.clone())
        });
        let host_address = self.host_address.unwrap_or_else(|| {
            Box::new(|instance: &InstanceDescription| instance.public_ip_address.clone())
        });
        Ok(Ec2ReservationService {
            ec2: self.ec2,
            port: self.port,
            proxy_jump: self.proxy_jump,
            host_address,
            host_platform,
        })
    }
}
