//! Memory error types.
//!
//! [`MemoryError`] is used by the internal helpers of this crate. The
//! [`MemoryManager`](crate::MemoryManager) facade never returns it: failures
//! at its boundary are logged and the operation continues on in-memory state.

use pedsage_store::StoreError;

/// Alias for `Result<T, MemoryError>`.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors raised inside the memory subsystem.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The durable key-value store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The persisted snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The persisted snapshot was written by a newer format version.
    #[error("unsupported snapshot version {found} (supported up to {supported})")]
    UnsupportedSnapshot { found: u32, supported: u32 },

    /// A category name did not match any known category.
    #[error("unknown memory category: {0}")]
    UnknownCategory(String),

    /// A role name was neither `user` nor `assistant`.
    #[error("unknown message role: {0}")]
    UnknownRole(String),

    /// The external corpus search collaborator failed.
    #[error("corpus search failed: {reason}")]
    Corpus { reason: String },
}
