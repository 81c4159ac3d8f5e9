//! Slot-change observers.
//!
//! Observers are notified once per confirmed transaction with the set of
//! touched slots, in subscription order. Notification happens after the
//! store's lock is released, so a callback may read the store freely.
//! Staging a new transaction from inside a callback is undefined behavior
//! by contract and is not enforced.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::stack::ResourceKey;
use crate::store::SlotStore;

/// Handle identifying one subscription, returned by
/// [`SlotStore::subscribe`] and consumed by [`SlotStore::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// A component interested in slot changes: UI refresh, autosave triggers,
/// redstone-style adapters.
pub trait StoreObserver<K: ResourceKey>: Send + Sync {
    /// Called once per confirmed transaction with the slots it wrote.
    fn slots_changed(&self, store: &SlotStore<K>, touched: &BTreeSet<u32>);
}

/// Insertion-ordered observer list. Lives inside the store's lock; the
/// notification path snapshots it so callbacks run unlocked.
pub(crate) struct ObserverRegistry<K: ResourceKey> {
    entries: Vec<(ObserverId, Arc<dyn StoreObserver<K>>)>,
    next_id: u64,
}

impl<K: ResourceKey> ObserverRegistry<K> {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new(), next_id: 0 }
    }

    pub(crate) fn subscribe(&mut self, observer: Arc<dyn StoreObserver<K>>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.entries.push((id, observer));
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn StoreObserver<K>>> {
        self.entries.iter().map(|(_, observer)| Arc::clone(observer)).collect()
    }
}
