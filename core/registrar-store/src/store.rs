//! Remote store abstraction.
//!
//! Defines the trait every backend implements, allowing the sync layer to
//! run against the REST API or an in-memory fake.

use crate::error::StoreResult;
use async_trait::async_trait;
use registrar_types::{EntityId, EntityKind, Record};
use std::fmt;

/// The five operations a store supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreOp::List => "list",
            StoreOp::Get => "get",
            StoreOp::Create => "create",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
        })
    }
}

/// Per-entity CRUD against the record store.
///
/// Every call is a suspension point: other operations may run before the
/// awaited result returns.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the name of the backend, for logs.
    fn backend_name(&self) -> &'static str;

    /// Lists every record of a kind, in store order.
    async fn list_all(&self, kind: EntityKind) -> StoreResult<Vec<Record>>;

    /// Fetches one record. Fails with `NotFound` if the id is unknown.
    async fn get_by_id(&self, kind: EntityKind, id: &EntityId) -> StoreResult<Record>;

    /// Creates a record. Any id on the input is ignored; the returned
    /// record carries the id the store assigned.
    async fn create(&self, record: Record) -> StoreResult<Record>;

    /// Replaces the whole record stored under `id`. Not a partial patch:
    /// callers send the complete current record.
    async fn update(&self, id: &EntityId, record: Record) -> StoreResult<Record>;

    /// Deletes a record.
    async fn delete(&self, kind: EntityKind, id: &EntityId) -> StoreResult<()>;
}
