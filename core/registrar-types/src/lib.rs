//! Core type definitions for Registrar.
//!
//! This crate defines the plain data that every other Registrar crate
//! shares:
//! - Opaque entity identifiers assigned by the remote store
//! - The four record types (students, classes, professors, departments)
//! - The [`Record`] union used at the store seam
//! - Cache keys addressing one entity, a full listing, or a related view
//!
//! Nothing here performs I/O.

mod entities;
mod ids;
mod key;
mod kind;
mod record;

pub use entities::{Class, Department, Professor, Student};
pub use ids::EntityId;
pub use key::{CacheKey, Scope};
pub use kind::EntityKind;
pub use record::{Entity, Record};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid entity id: {0:?}")]
    InvalidId(String),

    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("expected a {expected} record, found a {found} record")]
    KindMismatch { expected: EntityKind, found: EntityKind },
}
