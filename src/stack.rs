//! The stack value type.
//!
//! A [`Stack`] is an immutable snapshot of "some quantity of one resource
//! type": a type key (absent for the empty stack), a quantity, and the
//! maximum quantity one slot may hold of this type. Operations never mutate
//! a stack in place; they produce new values. The two invariants hold by
//! construction:
//!
//! - `quantity <= max_stack`
//! - the stack has no type key if and only if `quantity == 0`

use std::fmt;

/// Default per-slot capacity used by [`Stack::of`] and the default store
/// policy.
pub const DEFAULT_SLOT_CAPACITY: u32 = 64;

/// Bound for resource type keys.
///
/// Blanket-implemented, so any application key type (string ids, enums,
/// interned handles) works unmodified.
pub trait ResourceKey: Clone + Eq + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + fmt::Debug + Send + Sync + 'static> ResourceKey for T {}

/// An immutable typed, countable quantity occupying zero or one slot.
#[derive(Debug, Clone)]
pub struct Stack<K> {
    kind: Option<K>,
    quantity: u32,
    max_stack: u32,
}

impl<K: ResourceKey> Stack<K> {
    /// Create a stack of `kind` with an explicit per-slot maximum.
    ///
    /// `quantity` is clamped to `max_stack` (which is itself raised to at
    /// least 1); a zero quantity yields the empty stack.
    pub fn new(kind: K, quantity: u32, max_stack: u32) -> Self {
        let max_stack = max_stack.max(1);
        let quantity = quantity.min(max_stack);
        if quantity == 0 {
            Self::empty()
        } else {
            Self { kind: Some(kind), quantity, max_stack }
        }
    }

    /// Create a stack of `kind` with the default per-slot maximum
    /// ([`DEFAULT_SLOT_CAPACITY`]).
    pub fn of(kind: K, quantity: u32) -> Self {
        Self::new(kind, quantity, DEFAULT_SLOT_CAPACITY)
    }

    /// The empty stack: no type, zero quantity.
    pub fn empty() -> Self {
        Self { kind: None, quantity: 0, max_stack: DEFAULT_SLOT_CAPACITY }
    }

    /// The resource type key, or `None` for the empty stack.
    pub fn kind(&self) -> Option<&K> {
        self.kind.as_ref()
    }

    /// Quantity held.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Maximum quantity one slot may hold of this resource type.
    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    /// Whether this is the empty stack.
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
    }

    /// Quantity this stack could still grow by before hitting its own
    /// per-slot maximum.
    pub fn room(&self) -> u32 {
        self.max_stack.saturating_sub(self.quantity)
    }

    /// Copy of this stack resized to `quantity`, clamped to the per-slot
    /// maximum. A zero quantity (or resizing the empty stack) yields the
    /// empty stack.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        let quantity = quantity.min(self.max_stack);
        if quantity == 0 || self.kind.is_none() {
            Self { kind: None, quantity: 0, max_stack: self.max_stack }
        } else {
            Self { kind: self.kind.clone(), quantity, max_stack: self.max_stack }
        }
    }

    /// Copy resized without clamping. Used for transaction results, which
    /// aggregate across slots and may exceed one slot's capacity.
    pub(crate) fn with_total(&self, quantity: u32) -> Self {
        if quantity == 0 || self.kind.is_none() {
            Self { kind: None, quantity: 0, max_stack: self.max_stack }
        } else {
            Self { kind: self.kind.clone(), quantity, max_stack: self.max_stack }
        }
    }

    /// Whether `self` and `other` may share a slot: same type key, or
    /// either side empty. This is the default merge predicate; stores can
    /// override it through [`SlotPolicy`](crate::SlotPolicy).
    pub fn can_merge_with(&self, other: &Stack<K>) -> bool {
        self.is_empty() || other.is_empty() || self.kind == other.kind
    }
}

impl<K: PartialEq> PartialEq for Stack<K> {
    fn eq(&self, other: &Self) -> bool {
        // All empty stacks are the same stack, whatever capacity they carry.
        if self.kind.is_none() && other.kind.is_none() {
            return true;
        }
        self.kind == other.kind
            && self.quantity == other.quantity
            && self.max_stack == other.max_stack
    }
}

impl<K: Eq> Eq for Stack<K> {}
