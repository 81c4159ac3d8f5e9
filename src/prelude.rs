//! Convenient imports for slotbox.
//!
//! ```
//! use slotbox::prelude::*;
//!
//! let store: SlotStore<&str> = SlotStore::new(3);
//! assert_eq!(store.size(), 3);
//! ```

// Main entry point
pub use crate::store::{SlotStore, SlotStoreBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Value model and policy seams
pub use crate::policy::{FixedCapacity, SlotPolicy};
pub use crate::stack::{ResourceKey, Stack, DEFAULT_SLOT_CAPACITY};

// Transaction surface
pub use crate::observer::{ObserverId, StoreObserver};
pub use crate::transaction::{Transaction, TransactionKind, TransactionResult, TransactionState};
