//! Device pool facade pairing provisioning with connections and transfer.

use std::sync::Arc;

use camino::Utf8Path;

use crate::connection::{
    CommandInput, Connection, ConnectionFactory, ContentTransferAgent, ContentTransferAgentFactory,
};
use crate::error::{ConnectionError, ContentTransferError, ProvisioningError};
use crate::model::{Host, ProvisionInput, ProvisionOutput};
use crate::process::CommandOutput;
use crate::service::{ProvisionService, ReservationService};

/// A reserved device with an open command channel and transfer agent.
pub struct Device {
    host: Host,
    connection: Arc<dyn Connection>,
    transfer: Arc<dyn ContentTransferAgent>,
}

impl Device {
    /// Returns the device's unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.host.device_id
    }

    /// Returns the host coordinates backing this device.
    #[must_use]
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Executes a command on the device.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the channel fails.
    pub fn execute(&self, input: &CommandInput) -> Result<CommandOutput, ConnectionError> {
        self.connection.execute(input)
    }

    /// Copies a local file or directory onto the device.
    ///
    /// # Errors
    ///
    /// Returns [`ContentTransferError`] when the transfer fails.
    pub fn copy_to(
        &self,
        source: &Utf8Path,
        destination: &str,
    ) -> Result<(), ContentTransferError> {
        self.transfer.send(source, destination)
    }

    /// Copies a remote file or directory from the device.
    ///
    /// # Errors
    ///
    /// Returns [`ContentTransferError`] when the transfer fails.
    pub fn copy_from(
        &self,
        source: &str,
        destination: &Utf8Path,
    ) -> Result<(), ContentTransferError> {
        self.transfer.receive(source, destination)
    }
}

/// Control plane facade composed from pluggable services.
///
/// Some back-ends (the local pool) cover both the provision and reservation
/// roles; wrap the service in an [`Arc`] and pass clones for both slots.
pub struct BaseDevicePool<P, R, C, T>
where
    P: ProvisionService,
    R: ReservationService,
    C: ConnectionFactory,
    T: ContentTransferAgentFactory,
{
    provisions: P,
    reservations: R,
    connections: C,
    transfers: T,
}

impl<P, R, C, T> BaseDevicePool<P, R, C, T>
where
    P: ProvisionService,
    R: ReservationService,
    C: ConnectionFactory,
    T: ContentTransferAgentFactory,
{
    /// Composes a pool from its four collaborators.
    #[must_use]
    pub const fn new(provisions: P, reservations: R, connections: C, transfers: T) -> Self {
        Self {
            provisions,
            reservations,
            connections,
            transfers,
        }
    }

    /// Accepts or rejects a provision request.
    ///
    /// # Errors
    ///
    /// Propagates [`ProvisioningError`] from the provisioning back-end.
    pub async fn provision(
        &self,
        input: ProvisionInput,
    ) -> Result<ProvisionOutput, ProvisioningError> {
        self.provisions.provision(input).await
    }

    /// Returns the current snapshot for a provision.
    ///
    /// # Errors
    ///
    /// Propagates [`ProvisioningError`] from the provisioning back-end.
    pub async fn describe(
        &self,
        output: &ProvisionOutput,
    ) -> Result<ProvisionOutput, ProvisioningError> {
        self.provisions.describe(output).await
    }

    /// Exchanges every succeeded reservation for a connected [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError`] wrapping any reservation, connection,
    /// or content transfer failure.
    pub async fn obtain(&self, output: &ProvisionOutput) -> Result<Vec<Device>, ProvisioningError> {
        let mut devices = Vec::new();
        for reservation in output.succeeded_reservations() {
            let host = self.reservations.exchange(reservation).await?;
            let connection = self.connections.connect(&host)?;
            let transfer = self
                .transfers
                .connect(&output.id, Arc::clone(&connection), &host)?;
            devices.push(Device {
                host,
                connection,
                transfer,
            });
        }
        Ok(devices)
    }

    /// Releases every host reserved by the provision.
    ///
    /// # Errors
    ///
    /// Propagates [`ProvisioningError`] from the provisioning back-end.
    pub async fn release(&self, output: &ProvisionOutput) -> Result<usize, ProvisioningError> {
        self.provisions.release(output).await
    }

    /// Extends the provision's lifetime by one provision timeout.
    ///
    /// # Errors
    ///
    /// Propagates [`ProvisioningError`] from the provisioning back-end.
    pub async fn extend(&self, output: &ProvisionOutput) -> Result<(), ProvisioningError> {
        self.provisions.extend(output).await
    }

    /// Closes every collaborator, attempting all four before reporting the
    /// first failure.
    ///
    /// # Errors
    ///
    /// Returns the first close failure observed.
    pub async fn close(&self) -> Result<(), ProvisioningError> {
        let provisions = self.provisions.close().await;
        let reservations = self.reservations.close().await;
        let connections = self.connections.close();
        let transfers = self.transfers.close();
        provisions?;
        reservations?;
        connections?;
        transfers?;
        Ok(())
    }
}
