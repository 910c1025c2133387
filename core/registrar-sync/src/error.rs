//! Error types for the sync layer.

use registrar_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote store call failed. Nothing was written to the cache.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store or cache returned a record of the wrong shape or kind.
    #[error("unexpected record: {0}")]
    UnexpectedRecord(#[from] registrar_types::Error),
}

impl SyncError {
    /// See [`StoreError::is_not_found`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_not_found())
    }

    /// See [`StoreError::is_transient`].
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_transient())
    }

    /// See [`StoreError::is_rejected`].
    pub fn is_rejected(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_rejected())
    }
}
