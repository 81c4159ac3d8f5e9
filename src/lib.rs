//! # slotbox
//!
//! Transactional fixed-slot storage for stackable, typed resources.
//!
//! A [`SlotStore`] is an ordered, fixed-length array of slots, each holding
//! zero or one [`Stack`] (a type key, a quantity, and a per-slot maximum).
//! Every mutation — set, insert, extract — is staged into a
//! [`Transaction`]: the caller previews the outcome (leftover that did not
//! fit, quantity that would be removed), then confirms to apply the whole
//! overlay atomically, or cancels to discard it with no observable effect.
//!
//! ## Quick start
//!
//! ```
//! use slotbox::prelude::*;
//!
//! let store: SlotStore<&str> = SlotStore::new(9);
//!
//! let mut placed = store.insert(0, Stack::of("iron", 10));
//! assert!(placed.kind().is_success());
//! placed.confirm()?;
//! assert_eq!(store.stack_at(0)?.quantity(), 10);
//!
//! // Preview an extraction, then decide against it.
//! let mut taken = store.extract(0, 4);
//! assert_eq!(taken.result_quantity(), 4);
//! taken.cancel();
//! assert_eq!(store.stack_at(0)?.quantity(), 10);
//! # Ok::<(), slotbox::Error>(())
//! ```
//!
//! ## One staged transaction at a time
//!
//! The store hands out a fresh guard token with every staged transaction;
//! only the holder of the current token may confirm. Staging a new
//! transaction permanently invalidates any earlier staged one — its
//! confirm fails with [`Error::Stale`], its cancel stays a safe no-op.
//! This is optimistic mutual exclusion against *logical* races (two call
//! sites staging against one store), not a thread-safety substitute; the
//! store additionally serializes staging and commit behind one lock, so
//! sharing a handle across threads is safe.
//!
//! ## Soft outcomes vs hard errors
//!
//! Expected conditions never abort: a full slot, an empty slot, a type
//! mismatch, or a no-op request come back as a [`TransactionKind`] on the
//! operation result. Hard errors ([`Error::OutOfRange`] on direct
//! accessors, [`Error::Stale`] on a superseded confirm) use the crate's
//! [`Result`].

#![warn(missing_docs)]

mod error;
mod observer;
mod policy;
mod stack;
mod store;
mod transaction;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use store::{SlotStore, SlotStoreBuilder};

// Re-export the value model and policy seams
pub use policy::{FixedCapacity, SlotPolicy};
pub use stack::{ResourceKey, Stack, DEFAULT_SLOT_CAPACITY};

// Re-export the transaction surface
pub use observer::{ObserverId, StoreObserver};
pub use transaction::{Transaction, TransactionKind, TransactionResult, TransactionState};
