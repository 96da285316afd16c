//! Background assignment of queued provision requests to available hosts.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

use crate::model::{Reservation, Status};

use super::inventory::HostInventory;
use super::ledger::ProvisionLedger;
use super::queue::{ProvisionRequest, RequestReceiver};

/// Long-running task that drains the request FIFO in order.
///
/// The task holds the assignment lock for the whole of one request so the
/// reaper never observes a provision whose hosts are taken but not yet
/// reservation-visible.
pub(crate) struct AssignmentTask {
    pub ledger: Arc<ProvisionLedger>,
    pub inventory: Arc<HostInventory>,
    pub assignment_lock: Arc<Mutex<()>>,
    pub requests: RequestReceiver,
    pub shutdown: watch::Receiver<bool>,
}

impl AssignmentTask {
    pub async fn run(mut self) {
        loop {
            let request = tokio::select! {
                request = self.requests.take() => match request {
                    Some(request) => request,
                    None => break,
                },
                _ = self.shutdown.changed() => break,
            };
            if !self.assign(request).await {
                break;
            }
        }
        debug!("assignment loop stopped");
    }

    /// Binds hosts to one request. Returns `false` when the inventory closed
    /// mid-collection and the loop should stop.
    async fn assign(&self, request: ProvisionRequest) -> bool {
        let _guard = self.assignment_lock.lock().await;
        let id = request.input.id.clone();

        if self
            .ledger
            .transition(&id, |output| output.with_status(Status::Provisioning))
            .is_none()
        {
            debug!(
                provision_id = %id,
                accepted_status = ?request.snapshot.status,
                "provision removed before assignment; dropping request"
            );
            return true;
        }

        let mut taken = Vec::with_capacity(request.input.amount);
        for _ in 0..request.input.amount {
            match self.inventory.take().await {
                Ok(host) => {
                    info!(
                        device_id = %host.device_id,
                        provision_id = %id,
                        "binding host to provision"
                    );
                    taken.push(host);
                }
                Err(_) => {
                    for host in &taken {
                        self.inventory.offer(host);
                    }
                    return false;
                }
            }
        }

        let reservations: Vec<Reservation> = taken
            .iter()
            .map(|host| Reservation::succeeded(&host.device_id))
            .collect();
        if self
            .ledger
            .transition(&id, move |output| output.complete(reservations))
            .is_none()
        {
            // Released while hosts were being collected; hand them back.
            for host in &taken {
                self.inventory.offer(host);
            }
            debug!(provision_id = %id, "provision released during assignment; hosts returned");
        }
        true
    }
}
