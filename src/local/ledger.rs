//! Idempotent provision ledger with TTL-based expiry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::model::ProvisionOutput;

/// A live provision together with its wall-clock expiry.
#[derive(Clone, Debug)]
pub struct LedgerEntry {
    /// Latest snapshot of the provision.
    pub output: ProvisionOutput,
    /// Point in time after which the reaper may reclaim the provision.
    pub expires_at: Instant,
}

/// Concurrent map of provision id to [`LedgerEntry`].
///
/// A single mutex serializes every operation, which makes transitions on one
/// id totally ordered and `remove`/`transition` on the same id linearizable.
#[derive(Debug, Default)]
pub struct ProvisionLedger {
    entries: Mutex<HashMap<String, LedgerEntry>>,
}

impl ProvisionLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, LedgerEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entry for `id`, inserting a fresh `REQUESTED` snapshot
    /// expiring after `ttl` when none exists. The boolean reports whether an
    /// insert happened.
    pub fn get_or_insert(&self, id: &str, ttl: Duration) -> (ProvisionOutput, bool) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get(id) {
            return (entry.output.clone(), false);
        }
        let entry = LedgerEntry {
            output: ProvisionOutput::requested(id),
            expires_at: Instant::now() + ttl,
        };
        let output = entry.output.clone();
        entries.insert(id.to_owned(), entry);
        (output, true)
    }

    /// Applies `apply` to the current snapshot for `id`, preserving the
    /// expiry. Returns the updated snapshot, or `None` when the id is absent.
    pub fn transition(
        &self,
        id: &str,
        apply: impl FnOnce(ProvisionOutput) -> ProvisionOutput,
    ) -> Option<ProvisionOutput> {
        let mut entries = self.entries();
        let entry = entries.get_mut(id)?;
        entry.output = apply(entry.output.clone());
        Some(entry.output.clone())
    }

    /// Pushes the expiry of `id` further out by `delta`. Returns `false`
    /// when the id is absent.
    pub fn extend(&self, id: &str, delta: Duration) -> bool {
        let mut entries = self.entries();
        match entries.get_mut(id) {
            Some(entry) => {
                entry.expires_at += delta;
                true
            }
            None => false,
        }
    }

    /// Returns a snapshot of the provision identified by `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ProvisionOutput> {
        self.entries().get(id).map(|entry| entry.output.clone())
    }

    /// Removes and returns the entry for `id`.
    #[must_use]
    pub fn remove(&self, id: &str) -> Option<LedgerEntry> {
        self.entries().remove(id)
    }

    /// Returns `true` when the ledger holds an entry for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries().contains_key(id)
    }

    /// Returns snapshots of every entry whose expiry lies before `now`,
    /// without removing them.
    #[must_use]
    pub fn expired(&self, now: Instant) -> Vec<ProvisionOutput> {
        self.entries()
            .values()
            .filter(|entry| entry.expires_at < now)
            .map(|entry| entry.output.clone())
            .collect()
    }
}
