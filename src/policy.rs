//! Injected slot policy.
//!
//! The store stays agnostic of concrete resource taxonomies: the embedding
//! application supplies the per-slot capacity and the "may these two stacks
//! share a slot" predicate through [`SlotPolicy`]. [`FixedCapacity`] is the
//! default: a uniform capacity with type-key-equality merging.

use crate::stack::{ResourceKey, Stack, DEFAULT_SLOT_CAPACITY};

/// Capacity and compatibility policy for a [`SlotStore`](crate::SlotStore).
///
/// Implementations must be cheap: both methods are called inside the
/// store's staging path, potentially once per slot.
pub trait SlotPolicy<K: ResourceKey>: Send + Sync {
    /// Maximum quantity `slot` may hold, regardless of resource type.
    ///
    /// The effective limit for a given stack is the smaller of this and the
    /// stack's own [`max_stack`](Stack::max_stack).
    fn slot_capacity(&self, slot: u32) -> u32 {
        let _ = slot;
        DEFAULT_SLOT_CAPACITY
    }

    /// Whether `occupant` and `incoming` may merge into one slot.
    ///
    /// The default accepts same-type pairs and anything involving the empty
    /// stack.
    fn can_merge(&self, occupant: &Stack<K>, incoming: &Stack<K>) -> bool {
        occupant.can_merge_with(incoming)
    }
}

/// Default policy: one uniform capacity for every slot, type-key-equality
/// merging.
#[derive(Debug, Clone, Copy)]
pub struct FixedCapacity {
    capacity: u32,
}

impl FixedCapacity {
    /// Policy with the given uniform per-slot capacity (raised to at
    /// least 1).
    pub fn new(capacity: u32) -> Self {
        Self { capacity: capacity.max(1) }
    }
}

impl Default for FixedCapacity {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_CAPACITY)
    }
}

impl<K: ResourceKey> SlotPolicy<K> for FixedCapacity {
    fn slot_capacity(&self, _slot: u32) -> u32 {
        self.capacity
    }
}
