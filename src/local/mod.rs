//! Local in-memory device pool back-end.
//!
//! The local back-end drives the full provisioning state machine over a
//! fixed fleet: an idempotent [`ProvisionLedger`], a blocking
//! [`HostInventory`], a FIFO request queue, a background assignment loop,
//! and a reaper that expires provisions past their TTL. The assignment loop
//! and the reaper are mutually excluded through one process-wide lock so a
//! request is always bound atomically with respect to expiry.

mod assignment;
mod inventory;
mod ledger;
mod queue;
mod reaper;


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::DevicePoolConfig;
use crate::error::{ProvisioningError, ReservationError};
use crate::model::{Host, ProvisionInput, ProvisionOutput, Reservation};
use crate::service::{ProvisionService, ReservationService, ServiceFuture};

use assignment::AssignmentTask;
use queue::{ProvisionRequest, RequestQueue, request_queue};
use reaper::ReaperTask;

pub use inventory::{HostInventory, InventoryClosed};
pub use ledger::{LedgerEntry, ProvisionLedger};

const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(3600);
const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Removes a ledger entry and returns its reserved hosts to the inventory.
///
/// Shared by the public release path and the reaper; counts only hosts that
/// were actually re-queued, so releasing twice cannot double-book.
pub(crate) fn release_provision(
    ledger: &ProvisionLedger,
    inventory: &HostInventory,
    id: &str,
) -> usize {
    let Some(entry) = ledger.remove(id) else {
        return 0;
    };
    let mut released = 0;
    for reservation in entry.output.succeeded_reservations() {
        let offered = inventory
            .lookup(&reservation.device_id)
            .is_some_and(|host| inventory.offer(host));
        if offered {
            info!(device_id = %reservation.device_id, "released host");
            released += 1;
        }
    }
    info!(provision_id = %id, "released provision");
    released
}

/// Device pool back-end over a fixed, locally known fleet.
///
/// Implements both [`ProvisionService`] and [`ReservationService`]; no cloud
/// calls are involved. Construct through [`LocalProvisionService::builder`].
#[derive(Debug)]
pub struct LocalProvisionService {
    ledger: Arc<ProvisionLedger>,
    inventory: Arc<HostInventory>,
    queue: RequestQueue,
    provision_timeout: Duration,
    assignment_lock: Arc<Mutex<()>>,
    shutdown: watch::Sender<bool>,
    closed: AtomicBool,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl LocalProvisionService {
    /// Starts a builder for a [`LocalProvisionService`].
    #[must_use]
    pub fn builder() -> LocalProvisionServiceBuilder {
        LocalProvisionServiceBuilder::new()
    }

    /// Returns the host inventory backing this pool.
    #[must_use]
    pub fn inventory(&self) -> &HostInventory {
        &self.inventory
    }

    /// Stops the background tasks, interrupts blocked takes, and fails every
    /// later public call with [`ProvisioningError::Closed`]. Idempotent.
    ///
    /// # Errors
    ///
    /// Local shutdown cannot fail; the `Result` mirrors the service
    /// contracts so callers handle every back-end uniformly.
    pub async fn close(&self) -> Result<(), ProvisioningError> {
        self.do_close().await;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ProvisioningError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProvisioningError::Closed);
        }
        Ok(())
    }

    fn do_provision(&self, input: ProvisionInput) -> Result<ProvisionOutput, ProvisioningError> {
        self.ensure_open()?;
        if input.amount == 0 {
            return Err(ProvisioningError::InvalidInput {
                field: String::from("amount"),
            });
        }
        let (snapshot, inserted) = self.ledger.get_or_insert(&input.id, self.provision_timeout);
        if !inserted {
            return Ok(snapshot);
        }
        let request = ProvisionRequest {
            input: input.clone(),
            snapshot: snapshot.clone(),
        };
        if !self.queue.enqueue(request) {
            return Err(ProvisioningError::QueueRefused { id: input.id });
        }
        Ok(snapshot)
    }

    fn do_describe(&self, id: &str) -> Result<ProvisionOutput, ProvisioningError> {
        self.ensure_open()?;
        self.ledger
            .get(id)
            .ok_or_else(|| ProvisioningError::NotFound { id: id.to_owned() })
    }

    fn do_release(&self, id: &str) -> Result<usize, ProvisioningError> {
        self.ensure_open()?;
        Ok(release_provision(&self.ledger, &self.inventory, id))
    }

    async fn do_extend(&self, id: &str) -> Result<(), ProvisioningError> {
        self.ensure_open()?;
        let _guard = self.assignment_lock.lock().await;
        self.ledger.extend(id, self.provision_timeout);
        Ok(())
    }

    async fn do_close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.shutdown.send(true);
        self.inventory.close();
        let handles = std::mem::take(
            &mut *self
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl ProvisionService for LocalProvisionService {
    fn provision(
        &self,
        input: ProvisionInput,
    ) -> ServiceFuture<'_, ProvisionOutput, ProvisioningError> {
        Box::pin(async move { self.do_provision(input) })
    }

    fn describe<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, ProvisionOutput, ProvisioningError> {
        Box::pin(async move { self.do_describe(&output.id) })
    }

    fn release<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, usize, ProvisioningError> {
        Box::pin(async move { self.do_release(&output.id) })
    }

    fn extend<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, (), ProvisioningError> {
        Box::pin(async move { self.do_extend(&output.id).await })
    }

    fn close(&self) -> ServiceFuture<'_, (), ProvisioningError> {
        Box::pin(async move {
            self.do_close().await;
            Ok(())
        })
    }
}

impl ReservationService for LocalProvisionService {
    /// Resolves a device id against the known fleet.
    ///
    /// The lookup does not cross-check that the device is presently
    /// reserved; resolving a released reservation succeeds and returns the
    /// host's coordinates unchanged.
    fn exchange<'a>(
        &'a self,
        reservation: &'a Reservation,
    ) -> ServiceFuture<'a, Host, ReservationError> {
        Box::pin(async move {
            if self.closed.load(Ordering::Acquire) {
                return Err(ReservationError::Closed);
            }
            self.inventory
                .lookup(&reservation.device_id)
                .cloned()
                .ok_or_else(|| ReservationError::NotFound {
                    device_id: reservation.device_id.clone(),
                })
        })
    }

    fn close(&self) -> ServiceFuture<'_, (), ReservationError> {
        Box::pin(async move {
            self.do_close().await;
            Ok(())
        })
    }
}

impl Drop for LocalProvisionService {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        let _ = self.shutdown.send(true);
        self.inventory.close();
    }
}

/// Builder for [`LocalProvisionService`].
#[derive(Clone, Debug)]
pub struct LocalProvisionServiceBuilder {
    hosts: Vec<Host>,
    expire_provisions: bool,
    provision_timeout: Duration,
    reap_interval: Duration,
}

impl Default for LocalProvisionServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalProvisionServiceBuilder {
    /// Creates a builder with the default one hour timeout and one second
    /// reap cadence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hosts: Vec::new(),
            expire_provisions: true,
            provision_timeout: DEFAULT_PROVISION_TIMEOUT,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }

    /// Replaces the host seed.
    #[must_use]
    pub fn hosts(mut self, hosts: impl IntoIterator<Item = Host>) -> Self {
        self.hosts = hosts.into_iter().collect();
        self
    }

    /// Appends one host to the seed.
    #[must_use]
    pub fn host(mut self, host: Host) -> Self {
        self.hosts.push(host);
        self
    }

    /// Enables or disables the background reaper.
    #[must_use]
    pub const fn expire_provisions(mut self, value: bool) -> Self {
        self.expire_provisions = value;
        self
    }

    /// Sets the TTL applied on provision create and by extend.
    #[must_use]
    pub const fn provision_timeout(mut self, value: Duration) -> Self {
        self.provision_timeout = value;
        self
    }

    /// Sets the reaper cadence.
    #[must_use]
    pub const fn reap_interval(mut self, value: Duration) -> Self {
        self.reap_interval = value;
        self
    }

    /// Applies the expiry and timeout knobs from layered configuration.
    #[must_use]
    pub fn from_config(mut self, config: &DevicePoolConfig) -> Self {
        self.expire_provisions = config.expire_provisions;
        self.provision_timeout = config.provision_timeout();
        self
    }

    /// Builds the service and starts its background tasks. Must be called
    /// from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidInput`] when the host seed is
    /// empty or contains duplicate device ids.
    pub fn build(self) -> Result<LocalProvisionService, ProvisioningError> {
        if self.hosts.is_empty() {
            return Err(ProvisioningError::InvalidInput {
                field: String::from("hosts"),
            });
        }
        let mut seen = std::collections::HashSet::new();
        if !self
            .hosts
            .iter()
            .all(|host| seen.insert(host.device_id.as_str()))
        {
            return Err(ProvisioningError::InvalidInput {
                field: String::from("hosts"),
            });
        }

        let ledger = Arc::new(ProvisionLedger::new());
        let inventory = Arc::new(HostInventory::new(self.hosts));
        let assignment_lock = Arc::new(Mutex::new(()));
        let (queue, requests) = request_queue();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = Vec::with_capacity(2);
        tasks.push(tokio::spawn(
            AssignmentTask {
                ledger: Arc::clone(&ledger),
                inventory: Arc::clone(&inventory),
                assignment_lock: Arc::clone(&assignment_lock),
                requests,
                shutdown: shutdown_rx.clone(),
            }
            .run(),
        ));
        if self.expire_provisions {
            tasks.push(tokio::spawn(
                ReaperTask {
                    ledger: Arc::clone(&ledger),
                    inventory: Arc::clone(&inventory),
                    assignment_lock: Arc::clone(&assignment_lock),
                    cadence: self.reap_interval,
                    shutdown: shutdown_rx,
                }
                .run(),
            ));
        }

        Ok(LocalProvisionService {
            ledger,
            inventory,
            queue,
            provision_timeout: self.provision_timeout,
            assignment_lock,
            shutdown: shutdown_tx,
            closed: AtomicBool::new(false),
            tasks: StdMutex::new(tasks),
        })
    }
}
