//! Bounded FIFO of available hosts plus the immutable known set.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::Notify;

use crate::model::Host;

/// Raised when a blocked [`HostInventory::take`] is interrupted by shutdown.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("host inventory is closed")]
pub struct InventoryClosed;

/// The set of known hosts and the subset currently available.
///
/// Every host is either queued in `available` or bound to exactly one live
/// reservation; [`HostInventory::offer`] enforces membership in the known
/// set and rejects duplicates so a double release cannot double-book.
#[derive(Debug)]
pub struct HostInventory {
    known: Vec<Host>,
    available: Mutex<VecDeque<Host>>,
    notify: Notify,
    closed: AtomicBool,
}

impl HostInventory {
    /// Creates an inventory seeded with every known host available.
    #[must_use]
    pub fn new(known: Vec<Host>) -> Self {
        let available = known.iter().cloned().collect();
        Self {
            known,
            available: Mutex::new(available),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn available(&self) -> MutexGuard<'_, VecDeque<Host>> {
        self.available
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes and returns the oldest available host, waiting until one is
    /// offered.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryClosed`] once [`HostInventory::close`] has been
    /// called, including for calls already blocked at that point.
    pub async fn take(&self) -> Result<Host, InventoryClosed> {
        loop {
            // Register for wakeups before re-checking state, so an offer or
            // close landing in between cannot be missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.closed.load(Ordering::Acquire) {
                return Err(InventoryClosed);
            }
            if let Some(host) = self.available().pop_front() {
                return Ok(host);
            }
            notified.await;
        }
    }

    /// Returns `host` to the available queue.
    ///
    /// Returns `false` without side effect when the host is not part of the
    /// known set or is already queued.
    pub fn offer(&self, host: &Host) -> bool {
        if !self
            .known
            .iter()
            .any(|known| known.device_id == host.device_id)
        {
            return false;
        }
        {
            let mut available = self.available();
            if available
                .iter()
                .any(|queued| queued.device_id == host.device_id)
            {
                return false;
            }
            available.push_back(host.clone());
        }
        self.notify.notify_one();
        true
    }

    /// Resolves a device id against the known set.
    #[must_use]
    pub fn lookup(&self, device_id: &str) -> Option<&Host> {
        self.known.iter().find(|host| host.device_id == device_id)
    }

    /// Returns the immutable set of known hosts.
    #[must_use]
    pub fn known(&self) -> &[Host] {
        &self.known
    }

    /// Returns how many hosts are currently available.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available().len()
    }

    /// Interrupts every blocked [`HostInventory::take`] and refuses new ones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}
