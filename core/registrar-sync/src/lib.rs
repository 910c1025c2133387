//! Relationship synchronization and cache consistency for Registrar.
//!
//! The remote store keeps relationships only as id fields embedded in the
//! owning record, and offers no relationship endpoint. This crate turns
//! link and unlink requests into read-modify-write sequences and keeps a
//! client-side cache consistent with the store afterwards.
//!
//! # Architecture
//!
//! - **Cache**: last fetched value per [`CacheKey`](registrar_types::CacheKey),
//!   marked stale on invalidation, guarded by per-key generations
//! - **Invalidation**: which keys a write makes stale, computed from the
//!   record before and after
//! - **Synchronizer**: reads through the cache, mutates through the store
//! - **Intents**: mutations as values, run on detached tasks
//! - **Projector**: rows with referenced names resolved for display
//! - **Table**: free-text filter and pagination
//!
//! ## Authoritative references
//!
//! | Relationship | Held by |
//! |---|---|
//! | class ↔ students | `Class::students` |
//! | class → professor | `Class::professor` |
//! | class → department | `Class::department` |
//! | department → head | `Department::head_of_department` |
//!
//! The inverse lists on students, professors and departments are derived
//! and never written by this crate.
//!
//! # Example
//!
//! ```
//! use registrar_store::memory::MemoryStore;
//! use registrar_sync::{EntityCache, RelationshipSynchronizer};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let sync = RelationshipSynchronizer::new(store, Arc::new(EntityCache::new()));
//! assert_eq!(sync.store().backend_name(), "memory");
//! ```

mod cache;
mod error;
mod intent;
mod invalidation;
pub mod projector;
mod synchronizer;
pub mod table;

pub use cache::{CacheStats, CachedValue, EntityCache};
pub use error::{SyncError, SyncResult};
pub use intent::{Intent, Outcome};
pub use invalidation::InvalidationPlan;
pub use projector::{Cell, Labels, Row};
pub use synchronizer::RelationshipSynchronizer;
pub use table::{PageView, TableView, Tabular};
