//! The slot store.
//!
//! A [`SlotStore`] owns an ordered, fixed-length sequence of stacks and is
//! the sole writer of that array. Every mutating operation stages its
//! effect into a [`Transaction`] and returns a
//! [`TransactionResult`]; the committed array is untouched until the
//! transaction is confirmed.
//!
//! The store handle is cheap to clone and internally synchronized: one
//! mutex serializes staging and commit, closing the gap between computing
//! an overlay against current state and applying it.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::observer::{ObserverId, ObserverRegistry, StoreObserver};
use crate::policy::{FixedCapacity, SlotPolicy};
use crate::stack::{ResourceKey, Stack};
use crate::transaction::{Transaction, TransactionResult};

/// Mutable store state, guarded by the store mutex.
pub(crate) struct StoreState<K: ResourceKey> {
    pub(crate) stacks: Vec<Stack<K>>,
    /// Guard token of the one transaction currently eligible to confirm.
    pub(crate) current_token: Option<u64>,
    pub(crate) observers: ObserverRegistry<K>,
}

pub(crate) struct StoreInner<K: ResourceKey> {
    size: u32,
    pub(crate) state: Mutex<StoreState<K>>,
    next_token: AtomicU64,
    policy: Box<dyn SlotPolicy<K>>,
}

/// A fixed-size array of slots holding stackable, typed resources, mutated
/// only through staged transactions.
///
/// # Example
///
/// ```ignore
/// use slotbox::prelude::*;
///
/// let store: SlotStore<&str> = SlotStore::new(27);
///
/// // Stage, inspect, then confirm.
/// let mut result = store.insert(0, Stack::of("coal", 32));
/// assert_eq!(result.result_quantity(), 0); // no leftover
/// result.confirm()?;
///
/// // Or stage and discard.
/// let mut result = store.extract(0, 16);
/// result.cancel();
/// assert_eq!(store.stack_at(0)?.quantity(), 32);
/// ```
pub struct SlotStore<K: ResourceKey> {
    inner: Arc<StoreInner<K>>,
}

impl<K: ResourceKey> Clone for SlotStore<K> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<K: ResourceKey> SlotStore<K> {
    /// Create a store of `size` empty slots with the default policy
    /// (uniform capacity of 64, type-key-equality merging).
    pub fn new(size: u32) -> Self {
        Self::builder(size).build()
    }

    /// Create a store over existing contents. The store size is the number
    /// of stacks given.
    pub fn from_stacks(stacks: Vec<Stack<K>>) -> Self {
        Self::builder(0).stacks(stacks).build()
    }

    /// Create a builder for store configuration.
    pub fn builder(size: u32) -> SlotStoreBuilder<K> {
        SlotStoreBuilder::new(size)
    }

    /// Number of slots.
    pub fn size(&self) -> u32 {
        self.inner.size
    }

    /// The committed stack in `slot`.
    pub fn stack_at(&self, slot: u32) -> Result<Stack<K>> {
        if slot >= self.inner.size {
            return Err(Error::OutOfRange { slot, size: self.inner.size });
        }
        Ok(self.inner.state.lock().stacks[slot as usize].clone())
    }

    /// Per-slot maximum quantity, from the injected policy.
    pub fn capacity_at(&self, slot: u32) -> Result<u32> {
        if slot >= self.inner.size {
            return Err(Error::OutOfRange { slot, size: self.inner.size });
        }
        Ok(self.inner.policy.slot_capacity(slot))
    }

    /// Ordered snapshot of every committed slot.
    pub fn stacks(&self) -> Vec<Stack<K>> {
        self.inner.state.lock().stacks.clone()
    }

    /// Stage a direct replacement of one slot.
    ///
    /// Replacing an empty slot with an empty stack is `Undefined` (nothing
    /// to do). Otherwise the proposed quantity is clamped to the slot
    /// capacity and the clamped stack is staged; the result quantity
    /// reports the slot headroom left after the write (capacity minus the
    /// stored quantity), so a caller can detect truncation by a zero
    /// headroom on an oversized request.
    pub fn set(&self, slot: u32, stack: Stack<K>) -> TransactionResult<K> {
        if slot >= self.inner.size {
            return TransactionResult::Invalid;
        }
        let (token, clamped, headroom) = {
            let mut state = self.inner.state.lock();
            if stack.is_empty() && state.stacks[slot as usize].is_empty() {
                return TransactionResult::Undefined;
            }
            let capacity = self.inner.policy.slot_capacity(slot);
            let clamped = stack.quantity().min(capacity);
            (self.install_token(&mut state), clamped, capacity - clamped)
        };
        tracing::debug!(slot, quantity = clamped, token, "staged slot replacement");
        let mut pending = FxHashMap::default();
        pending.insert(slot, stack.with_quantity(clamped));
        TransactionResult::Success(Transaction::stage(
            self.clone(),
            token,
            pending,
            BTreeSet::from([slot]),
            stack,
            headroom,
        ))
    }

    /// Stage merging `stack` into one slot.
    ///
    /// `Invalid` for an empty incoming stack or an incompatible occupant,
    /// `Failure` when the slot has no room left. On success the result
    /// quantity is the leftover that did not fit (zero if it all fit).
    pub fn insert(&self, slot: u32, stack: Stack<K>) -> TransactionResult<K> {
        if slot >= self.inner.size || stack.is_empty() {
            return TransactionResult::Invalid;
        }
        let (token, merged, leftover) = {
            let mut state = self.inner.state.lock();
            let occupant = &state.stacks[slot as usize];
            if !self.inner.policy.can_merge(occupant, &stack) {
                return TransactionResult::Invalid;
            }
            let mut limit = self.inner.policy.slot_capacity(slot).min(stack.max_stack());
            if !occupant.is_empty() {
                limit = limit.min(occupant.max_stack());
            }
            let room = limit.saturating_sub(occupant.quantity());
            if room == 0 {
                return TransactionResult::Failure;
            }
            let placed = stack.quantity().min(room);
            let merged = if occupant.is_empty() {
                stack.with_quantity(placed)
            } else {
                occupant.with_quantity(occupant.quantity() + placed)
            };
            let leftover = stack.quantity() - placed;
            (self.install_token(&mut state), merged, leftover)
        };
        tracing::debug!(slot, leftover, token, "staged insert");
        let mut pending = FxHashMap::default();
        pending.insert(slot, merged);
        TransactionResult::Success(Transaction::stage(
            self.clone(),
            token,
            pending,
            BTreeSet::from([slot]),
            stack,
            leftover,
        ))
    }

    /// Stage distributing `stack` across all slots, left to right.
    ///
    /// Each slot absorbs as much of the remaining quantity as its
    /// compatibility and room allow before the scan moves on; the scan
    /// stops early once nothing remains. `Failure` if no slot could take
    /// anything; otherwise the result quantity is the leftover.
    pub fn insert_anywhere(&self, stack: Stack<K>) -> TransactionResult<K> {
        if stack.is_empty() {
            return TransactionResult::Invalid;
        }
        let mut pending = FxHashMap::default();
        let mut touched = BTreeSet::new();
        let mut remaining = stack.quantity();
        let token = {
            let mut state = self.inner.state.lock();
            for slot in 0..self.inner.size {
                if remaining == 0 {
                    break;
                }
                let occupant = &state.stacks[slot as usize];
                let limit = self.inner.policy.slot_capacity(slot).min(stack.max_stack());
                if occupant.is_empty() {
                    let placed = remaining.min(limit);
                    if placed > 0 {
                        pending.insert(slot, stack.with_quantity(placed));
                        touched.insert(slot);
                        remaining -= placed;
                    }
                } else if self.inner.policy.can_merge(occupant, &stack) {
                    let limit = limit.min(occupant.max_stack());
                    let room = limit.saturating_sub(occupant.quantity());
                    let placed = remaining.min(room);
                    if placed > 0 {
                        pending.insert(slot, occupant.with_quantity(occupant.quantity() + placed));
                        touched.insert(slot);
                        remaining -= placed;
                    }
                }
            }
            if remaining == stack.quantity() {
                return TransactionResult::Failure;
            }
            self.install_token(&mut state)
        };
        tracing::debug!(
            slots = touched.len(),
            leftover = remaining,
            token,
            "staged distributed insert"
        );
        TransactionResult::Success(Transaction::stage(
            self.clone(),
            token,
            pending,
            touched,
            stack,
            remaining,
        ))
    }

    /// Stage removing up to `amount` from one slot.
    ///
    /// A zero amount is `Undefined`; an empty slot is `Failure`. On
    /// success the result is the extracted stack, sized
    /// `min(amount, occupant quantity)`.
    pub fn extract(&self, slot: u32, amount: u32) -> TransactionResult<K> {
        if slot >= self.inner.size {
            return TransactionResult::Invalid;
        }
        if amount == 0 {
            return TransactionResult::Undefined;
        }
        let (token, occupant, taken) = {
            let mut state = self.inner.state.lock();
            let occupant = state.stacks[slot as usize].clone();
            if occupant.is_empty() {
                return TransactionResult::Failure;
            }
            let taken = amount.min(occupant.quantity());
            (self.install_token(&mut state), occupant, taken)
        };
        tracing::debug!(slot, taken, token, "staged extract");
        let mut pending = FxHashMap::default();
        pending.insert(slot, occupant.with_quantity(occupant.quantity() - taken));
        TransactionResult::Success(Transaction::stage(
            self.clone(),
            token,
            pending,
            BTreeSet::from([slot]),
            occupant,
            taken,
        ))
    }

    /// Stage removing up to `amount` from every slot matching `filter`,
    /// aggregated into one result.
    ///
    /// Slots are scanned in index order; the first match establishes the
    /// result type and later matches must be mergeable with it or they are
    /// skipped. The scan stops as soon as the requested amount is
    /// satisfied. `Failure` if nothing matched.
    pub fn extract_matching<F>(&self, filter: F, amount: u32) -> TransactionResult<K>
    where
        F: Fn(&Stack<K>) -> bool,
    {
        if amount == 0 {
            return TransactionResult::Undefined;
        }
        let mut pending = FxHashMap::default();
        let mut touched = BTreeSet::new();
        let mut result = Stack::empty();
        let mut total = 0u32;
        let mut remaining = amount;
        let token = {
            let mut state = self.inner.state.lock();
            for slot in 0..self.inner.size {
                let occupant = &state.stacks[slot as usize];
                if occupant.is_empty() || !filter(occupant) {
                    continue;
                }
                if result.is_empty() {
                    result = occupant.clone();
                } else if !self.inner.policy.can_merge(&result, occupant) {
                    continue;
                }
                let taken = occupant.quantity().min(remaining);
                pending.insert(slot, occupant.with_quantity(occupant.quantity() - taken));
                touched.insert(slot);
                total += taken;
                remaining -= taken;
                if remaining == 0 {
                    break;
                }
            }
            if touched.is_empty() {
                return TransactionResult::Failure;
            }
            self.install_token(&mut state)
        };
        tracing::debug!(slots = touched.len(), total, token, "staged filtered extract");
        TransactionResult::Success(Transaction::stage(
            self.clone(),
            token,
            pending,
            touched,
            result,
            total,
        ))
    }

    /// Register an observer. Notification order is subscription order.
    pub fn subscribe(&self, observer: Arc<dyn StoreObserver<K>>) -> ObserverId {
        self.inner.state.lock().observers.subscribe(observer)
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.inner.state.lock().observers.unsubscribe(id)
    }

    /// Allocate a fresh guard token and install it as the store's current
    /// one, invalidating whatever transaction previously held it.
    fn install_token(&self, state: &mut StoreState<K>) -> u64 {
        let token = self.inner.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        state.current_token = Some(token);
        token
    }

    pub(crate) fn inner(&self) -> &StoreInner<K> {
        &self.inner
    }

    pub(crate) fn holds_token(&self, token: u64) -> bool {
        self.inner.state.lock().current_token == Some(token)
    }
}

/// Builder for [`SlotStore`] configuration.
///
/// # Example
///
/// ```ignore
/// use slotbox::prelude::*;
///
/// let store: SlotStore<u32> = SlotStore::builder(9)
///     .policy(FixedCapacity::new(16))
///     .build();
/// ```
pub struct SlotStoreBuilder<K: ResourceKey> {
    size: u32,
    seed: Option<Vec<Stack<K>>>,
    policy: Box<dyn SlotPolicy<K>>,
}

impl<K: ResourceKey> SlotStoreBuilder<K> {
    fn new(size: u32) -> Self {
        Self { size, seed: None, policy: Box::new(FixedCapacity::default()) }
    }

    /// Seed the store with existing contents. Overrides the builder's
    /// size: the store gets exactly one slot per stack given.
    pub fn stacks(mut self, stacks: Vec<Stack<K>>) -> Self {
        self.size = stacks.len() as u32;
        self.seed = Some(stacks);
        self
    }

    /// Use a custom capacity/compatibility policy.
    pub fn policy(mut self, policy: impl SlotPolicy<K> + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Build the store.
    pub fn build(self) -> SlotStore<K> {
        let stacks = self
            .seed
            .unwrap_or_else(|| vec![Stack::empty(); self.size as usize]);
        SlotStore {
            inner: Arc::new(StoreInner {
                size: stacks.len() as u32,
                state: Mutex::new(StoreState {
                    stacks,
                    current_token: None,
                    observers: ObserverRegistry::new(),
                }),
                next_token: AtomicU64::new(0),
                policy: self.policy,
            }),
        }
    }
}
