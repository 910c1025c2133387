//! Error types for the store layer.

use registrar_types::{EntityId, EntityKind};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that a remote store call can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced id does not exist in the store.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    /// The store refused a write (e.g. a required field is missing).
    #[error("write rejected: {0}")]
    ValidationRejected(String),

    /// Network failure, timeout, or a server-side error.
    #[error("transient I/O failure: {0}")]
    Transient(String),

    /// The store created a record but did not report its id.
    #[error("store returned a {kind} without an id")]
    MissingId { kind: EntityKind },

    /// A response body could not be decoded as a record.
    #[error("decode error: {0}")]
    Decode(#[from] registrar_types::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid adapter configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true for failures worth retrying from the UI (network,
    /// timeout, 5xx). The core itself never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// Returns true if the failure means the referenced id is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns true if the store rejected the write's content.
    pub fn is_rejected(&self) -> bool {
        matches!(self, StoreError::ValidationRejected(_))
    }
}
