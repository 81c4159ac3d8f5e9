//! Staged transactions.
//!
//! Every mutating store operation returns a [`TransactionResult`]. On
//! success it carries a live [`Transaction`]: a sparse overlay of proposed
//! per-slot replacements plus an aggregate result stack, bound to the store
//! by a guard token. Nothing touches the committed array until
//! [`Transaction::confirm`], which applies the whole overlay or none of it.
//!
//! ## Guard tokens
//!
//! The store tracks at most one current token, and every successful staging
//! operation installs a fresh one. The most recently staged transaction is
//! therefore the only one eligible to confirm; any earlier staged
//! transaction is permanently stale the instant a new one is staged, and
//! its confirm fails with [`Error::Stale`] without touching the store.
//! Tokens are monotonically increasing generation counters compared by
//! value, so there is no aliasing ambiguity.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::stack::{ResourceKey, Stack};
use crate::store::SlotStore;

/// Classification of an operation's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// The operation staged (or applied) successfully.
    Success,
    /// Well-formed request that cannot currently succeed: inserting into a
    /// full store or slot, extracting from an empty one, no filter match.
    Failure,
    /// Structurally disallowed request: type mismatch, empty-stack insert,
    /// out-of-range slot.
    Invalid,
    /// The transaction was invalidated by a third party (superseded by a
    /// later staging operation) rather than by its own caller.
    Cancelled,
    /// The request was a semantic no-op: zero-amount extract, setting an
    /// empty slot to empty.
    Undefined,
}

impl TransactionKind {
    /// Whether this is [`TransactionKind::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionKind::Success)
    }

    /// Whether this is [`TransactionKind::Failure`].
    pub fn is_failure(&self) -> bool {
        matches!(self, TransactionKind::Failure)
    }

    /// Whether this is [`TransactionKind::Invalid`].
    pub fn is_invalid(&self) -> bool {
        matches!(self, TransactionKind::Invalid)
    }

    /// Whether this is [`TransactionKind::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransactionKind::Cancelled)
    }

    /// Whether this is [`TransactionKind::Undefined`].
    pub fn is_undefined(&self) -> bool {
        matches!(self, TransactionKind::Undefined)
    }
}

/// Lifecycle state of a [`Transaction`].
///
/// A transaction is created `Staged` and transitions exactly once to
/// `Confirmed` or `Cancelled`. Both terminal states are absorbing: further
/// confirms or cancels are no-ops returning the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Pending: the overlay is computed but not applied.
    Staged,
    /// The overlay was applied to the store and observers were notified.
    Confirmed,
    /// The overlay was discarded; the store never saw it.
    Cancelled,
}

/// A staged, previewable, all-or-nothing mutation of one [`SlotStore`].
pub struct Transaction<K: ResourceKey> {
    store: SlotStore<K>,
    token: u64,
    /// Proposed replacement values, keyed by slot. Absent slots are
    /// unchanged.
    pending: FxHashMap<u32, Stack<K>>,
    touched: BTreeSet<u32>,
    result: Stack<K>,
    result_quantity: u32,
    state: TransactionState,
    superseded: bool,
}

impl<K: ResourceKey> Transaction<K> {
    pub(crate) fn stage(
        store: SlotStore<K>,
        token: u64,
        pending: FxHashMap<u32, Stack<K>>,
        touched: BTreeSet<u32>,
        result: Stack<K>,
        result_quantity: u32,
    ) -> Self {
        Self {
            store,
            token,
            pending,
            touched,
            result,
            result_quantity,
            state: TransactionState::Staged,
            superseded: false,
        }
    }

    /// The aggregate result of this transaction, sized by
    /// [`result_quantity`](Self::result_quantity): the leftover for an
    /// insert, the removed stack for an extract.
    ///
    /// Returns a defensive copy, safe to read repeatedly. A filtered
    /// extract aggregates across slots, so the quantity may exceed one
    /// slot's capacity.
    pub fn preview_result(&self) -> Stack<K> {
        self.result.with_total(self.result_quantity)
    }

    /// The aggregate result quantity: leftover for an insert, amount
    /// removed for an extract.
    pub fn result_quantity(&self) -> u32 {
        self.result_quantity
    }

    /// Slots this transaction will write on confirm.
    pub fn touched_slots(&self) -> &BTreeSet<u32> {
        &self.touched
    }

    /// Read a slot through the staged overlay: the pending value if this
    /// transaction writes the slot, the committed value otherwise.
    pub fn stack_at(&self, slot: u32) -> Result<Stack<K>> {
        if let Some(stack) = self.pending.get(&slot) {
            return Ok(stack.clone());
        }
        self.store.stack_at(slot)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// True while this transaction is staged and still the store's current
    /// one, i.e. eligible to confirm.
    pub fn is_valid(&self) -> bool {
        self.state == TransactionState::Staged && self.store.holds_token(self.token)
    }

    /// Outcome classification.
    ///
    /// `Success` while staged-and-current or confirmed, and after the
    /// caller's own cancel. `Cancelled` once a later staging operation on
    /// the same store superseded this transaction.
    pub fn kind(&self) -> TransactionKind {
        match self.state {
            TransactionState::Staged => {
                if self.is_valid() {
                    TransactionKind::Success
                } else {
                    TransactionKind::Cancelled
                }
            }
            TransactionState::Confirmed => TransactionKind::Success,
            TransactionState::Cancelled => {
                if self.superseded {
                    TransactionKind::Cancelled
                } else {
                    TransactionKind::Success
                }
            }
        }
    }

    /// Apply the staged overlay to the store.
    ///
    /// Applies every pending entry atomically (all-or-nothing from the
    /// caller's point of view), releases the guard, notifies observers with
    /// the touched slot set, and transitions to `Confirmed`.
    ///
    /// Confirming an already-terminal transaction is a no-op returning the
    /// terminal state; it never double-applies. Confirming a superseded
    /// transaction fails with [`Error::Stale`] and leaves the store
    /// untouched.
    pub fn confirm(&mut self) -> Result<TransactionState> {
        match self.state {
            TransactionState::Confirmed | TransactionState::Cancelled => Ok(self.state),
            TransactionState::Staged => {
                let observers = {
                    let mut state = self.store.inner().state.lock();
                    if state.current_token != Some(self.token) {
                        self.superseded = true;
                        tracing::warn!(
                            token = self.token,
                            current = ?state.current_token,
                            "confirm attempted on stale transaction"
                        );
                        return Err(Error::Stale {
                            token: self.token,
                            current: state.current_token,
                        });
                    }
                    let pending = std::mem::take(&mut self.pending);
                    for (slot, stack) in pending {
                        state.stacks[slot as usize] = stack;
                    }
                    state.current_token = None;
                    state.observers.snapshot()
                };
                self.state = TransactionState::Confirmed;
                tracing::debug!(
                    token = self.token,
                    slots = self.touched.len(),
                    quantity = self.result_quantity,
                    "transaction confirmed"
                );
                for observer in observers {
                    observer.slots_changed(&self.store, &self.touched);
                }
                Ok(TransactionState::Confirmed)
            }
        }
    }

    /// Discard the staged overlay.
    ///
    /// Releases the guard if this transaction still holds it and
    /// transitions to `Cancelled`. No observable effect on the store.
    /// Idempotent: cancelling an already-terminal transaction returns its
    /// terminal state unchanged.
    pub fn cancel(&mut self) -> TransactionState {
        if self.state != TransactionState::Staged {
            return self.state;
        }
        {
            let mut state = self.store.inner().state.lock();
            if state.current_token == Some(self.token) {
                state.current_token = None;
            } else {
                self.superseded = true;
            }
        }
        self.pending.clear();
        self.touched.clear();
        self.state = TransactionState::Cancelled;
        tracing::debug!(token = self.token, "transaction cancelled");
        self.state
    }
}

impl<K: ResourceKey> Drop for Transaction<K> {
    fn drop(&mut self) {
        // An abandoned staged transaction must not keep holding the guard.
        if self.state == TransactionState::Staged {
            let mut state = self.store.inner().state.lock();
            if state.current_token == Some(self.token) {
                state.current_token = None;
            }
        }
    }
}

/// Outcome of a staging operation on a [`SlotStore`].
///
/// `Success` carries a live [`Transaction`]. All other variants are inert
/// and behave like an already-cancelled transaction: empty result stack,
/// zero quantity, `is_valid() == false`, no-op confirm and cancel. There
/// are no shared sentinel objects; every call site owns its own value.
#[must_use = "a staged transaction has no effect until confirmed"]
pub enum TransactionResult<K: ResourceKey> {
    /// The operation staged successfully.
    Success(Transaction<K>),
    /// Well-formed but impossible given current store state.
    Failure,
    /// Structurally disallowed request.
    Invalid,
    /// Invalidated by a third party before it could be returned.
    Cancelled,
    /// Semantic no-op.
    Undefined,
}

impl<K: ResourceKey> TransactionResult<K> {
    /// Outcome classification. For `Success` this is live: it reflects the
    /// carried transaction's current validity.
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Success(txn) => txn.kind(),
            Self::Failure => TransactionKind::Failure,
            Self::Invalid => TransactionKind::Invalid,
            Self::Cancelled => TransactionKind::Cancelled,
            Self::Undefined => TransactionKind::Undefined,
        }
    }

    /// True iff this carries a staged transaction that is still the
    /// store's current one.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Success(txn) => txn.is_valid(),
            _ => false,
        }
    }

    /// The aggregate result stack; empty for inert results.
    pub fn result(&self) -> Stack<K> {
        match self {
            Self::Success(txn) => txn.preview_result(),
            _ => Stack::empty(),
        }
    }

    /// The aggregate result quantity; zero for inert results.
    pub fn result_quantity(&self) -> u32 {
        match self {
            Self::Success(txn) => txn.result_quantity(),
            _ => 0,
        }
    }

    /// Confirm the carried transaction. Inert results are no-ops that
    /// report themselves cancelled.
    pub fn confirm(&mut self) -> Result<TransactionState> {
        match self {
            Self::Success(txn) => txn.confirm(),
            _ => Ok(TransactionState::Cancelled),
        }
    }

    /// Cancel the carried transaction. Inert results are no-ops that
    /// report themselves cancelled.
    pub fn cancel(&mut self) -> TransactionState {
        match self {
            Self::Success(txn) => txn.cancel(),
            _ => TransactionState::Cancelled,
        }
    }

    /// The carried transaction, if any.
    pub fn transaction(&self) -> Option<&Transaction<K>> {
        match self {
            Self::Success(txn) => Some(txn),
            _ => None,
        }
    }

    /// The carried transaction, if any, mutably.
    pub fn transaction_mut(&mut self) -> Option<&mut Transaction<K>> {
        match self {
            Self::Success(txn) => Some(txn),
            _ => None,
        }
    }

    /// Consume the result, yielding the carried transaction if any.
    pub fn into_transaction(self) -> Option<Transaction<K>> {
        match self {
            Self::Success(txn) => Some(txn),
            _ => None,
        }
    }
}
