//! Periodic expiry of provisions past their TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::inventory::HostInventory;
use super::ledger::ProvisionLedger;
use super::release_provision;

/// Background task that reclaims hosts from expired provisions.
pub(crate) struct ReaperTask {
    pub ledger: Arc<ProvisionLedger>,
    pub inventory: Arc<HostInventory>,
    pub assignment_lock: Arc<Mutex<()>>,
    pub cadence: Duration,
    pub shutdown: watch::Receiver<bool>,
}

impl ReaperTask {
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _guard = self.assignment_lock.lock().await;
                    let released =
                        reap_expired(&self.ledger, &self.inventory, Instant::now());
                    if released > 0 {
                        info!(released, "reaped devices from expired provisions");
                    }
                }
                _ = self.shutdown.changed() => break,
            }
        }
        debug!("reaper stopped");
    }
}

/// Releases every provision whose expiry lies before `now` and returns the
/// number of hosts reclaimed.
///
/// Callers must hold the assignment lock.
pub(crate) fn reap_expired(
    ledger: &ProvisionLedger,
    inventory: &HostInventory,
    now: Instant,
) -> usize {
    let mut released = 0;
    for output in ledger.expired(now) {
        released += release_provision(ledger, inventory, &output.id);
    }
    released
}
