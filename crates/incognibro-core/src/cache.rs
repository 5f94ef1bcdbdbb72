//! Keyed cache of server-owned records with optimistic updates.
//!
//! Each key holds the last known value and a generation counter. Starting a
//! mutation bumps the generation, so at most one reconciliation per key is
//! live at a time: whatever was in flight before (a fetch or an older
//! mutation) can no longer write once its response arrives. A fetch is also
//! refused while the latest mutation is still waiting for its response, so a
//! re-read never replaces an optimistic value.
//!
//! ```text
//! begin(key)  ── snapshot + optimistic value, generation n
//!     │
//!     ├─ response ok   → commit(ticket n)   applied only if generation == n
//!     └─ response err  → rollback(ticket n) applied only if generation == n
//! ```
//!
//! Values are published through a `tokio::sync::watch` channel per key so
//! the presentation layer can follow changes.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Identifies one reconciliation against a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTicket {
    key: String,
    generation: u64,
}

impl CacheTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// An optimistic mutation in progress.
#[derive(Debug, Clone)]
pub struct PendingMutation<V> {
    pub ticket: CacheTicket,
    /// The value before the optimistic update, if one was cached.
    pub previous: Option<V>,
}

#[derive(Debug)]
struct Slot<V> {
    generation: u64,
    /// Set between `begin_mutation` and the commit or rollback of that
    /// same generation.
    mutating: bool,
    tx: watch::Sender<Option<V>>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            generation: 0,
            mutating: false,
            tx,
        }
    }
}

/// Cache of values keyed by record name.
#[derive(Debug)]
pub struct QueryCache<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> QueryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.slots
            .lock()
            .get(key)
            .and_then(|slot| slot.tx.borrow().clone())
    }

    /// Follows the published value for `key`.
    pub fn subscribe(&self, key: &str) -> watch::Receiver<Option<V>> {
        self.slots
            .lock()
            .entry(key.to_string())
            .or_insert_with(Slot::new)
            .tx
            .subscribe()
    }

    /// Current generation for `key`.
    pub fn generation(&self, key: &str) -> u64 {
        self.slots.lock().get(key).map_or(0, |slot| slot.generation)
    }

    /// Whether the latest mutation of `key` is still awaiting its response.
    pub fn is_mutating(&self, key: &str) -> bool {
        self.slots.lock().get(key).is_some_and(|slot| slot.mutating)
    }

    /// Starts a read of `key`. The ticket is invalidated by any later
    /// mutation and cannot complete while a mutation is pending.
    pub fn begin_fetch(&self, key: &str) -> CacheTicket {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);

        CacheTicket {
            key: key.to_string(),
            generation: slot.generation,
        }
    }

    /// Stores a fetched value unless the ticket was superseded or a
    /// mutation is still pending.
    pub fn complete_fetch(&self, ticket: &CacheTicket, value: V) -> bool {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(&ticket.key) else {
            return false;
        };

        if slot.generation != ticket.generation || slot.mutating {
            return false;
        }

        slot.tx.send_replace(Some(value));
        true
    }

    /// Supersedes anything in flight for `key`, snapshots the current value,
    /// and publishes `optimistic(current)` when a value is cached.
    pub fn begin_mutation<F>(&self, key: &str, optimistic: F) -> PendingMutation<V>
    where
        F: FnOnce(&V) -> V,
    {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);

        slot.generation += 1;
        slot.mutating = true;
        let previous = slot.tx.borrow().clone();

        if let Some(current) = &previous {
            slot.tx.send_replace(Some(optimistic(current)));
        }

        PendingMutation {
            ticket: CacheTicket {
                key: key.to_string(),
                generation: slot.generation,
            },
            previous,
        }
    }

    /// Replaces the value with `reconcile(current)` if `ticket` is still the
    /// latest for its key. Returns false when superseded.
    pub fn commit<F>(&self, ticket: &CacheTicket, reconcile: F) -> bool
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(&ticket.key) else {
            return false;
        };

        if slot.generation != ticket.generation {
            return false;
        }

        let next = reconcile(slot.tx.borrow().as_ref());
        slot.tx.send_replace(next);
        slot.mutating = false;
        true
    }

    /// Restores the pre-mutation snapshot if the mutation is still the
    /// latest for its key. Returns false when superseded.
    pub fn rollback(&self, pending: &PendingMutation<V>) -> bool {
        let previous = pending.previous.clone();
        self.commit(&pending.ticket, |_| previous)
    }

    /// Unconditionally stores `value`, superseding anything in flight.
    pub fn set(&self, key: &str, value: V) {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);
        slot.generation += 1;
        slot.mutating = false;
        slot.tx.send_replace(Some(value));
    }
}
