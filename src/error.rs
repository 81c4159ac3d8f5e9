//! Error types for slotbox.
//!
//! Expected conditions (full slot, empty slot, type mismatch, no-op request)
//! are never errors; they are reported through
//! [`TransactionKind`](crate::TransactionKind) on the operation result. The
//! `Error` enum covers the two hard cases: out-of-range indices on direct
//! accessors, and confirming a transaction that has been superseded.

use thiserror::Error;

/// All slotbox errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A slot index past the end of the store was passed to a direct
    /// accessor. Callers control indices directly, so this is a programmer
    /// error rather than a soft operation result.
    #[error("slot {slot} out of range for store of {size} slots")]
    OutOfRange {
        /// The offending slot index.
        slot: u32,
        /// Number of slots in the store.
        size: u32,
    },

    /// The transaction being confirmed is no longer the store's current
    /// one: a later staging operation superseded it. The store was left
    /// untouched; re-issue the operation against current state.
    #[error("stale transaction: token {token} has been superseded")]
    Stale {
        /// Guard token held by the stale transaction.
        token: u64,
        /// The store's current guard token, if any transaction is staged.
        current: Option<u64>,
    },
}

/// Result type for slotbox operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// A stale confirm may succeed if the operation is staged again against
    /// the store's current state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Stale { .. })
    }

    /// Check if this is a stale-transaction error.
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::Stale { .. })
    }

    /// Check if this is an out-of-range error.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::OutOfRange { .. })
    }
}
