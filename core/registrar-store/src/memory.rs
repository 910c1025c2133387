//! In-memory store for tests and demos.
//!
//! Behaves like the REST API: ids are assigned on create, updates are full
//! replacements with last-write-wins, required fields are enforced, and
//! unknown ids fail with `NotFound`. Faults can be queued per operation and
//! kind, and every call is logged so tests can assert what was (and was
//! not) sent.

use crate::error::{StoreError, StoreResult};
use crate::store::{RemoteStore, StoreOp};
use async_trait::async_trait;
use registrar_types::{EntityId, EntityKind, Record};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// A failure to inject into the next matching call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    NotFound,
    Rejected(String),
    Transient(String),
}

/// One logged call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub kind: EntityKind,
    pub id: Option<EntityId>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Records per kind, in insertion order.
    tables: HashMap<EntityKind, Vec<Record>>,
    faults: HashMap<(StoreOp, EntityKind), VecDeque<Fault>>,
    calls: Vec<StoreCall>,
}

/// An in-process [`RemoteStore`]. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a record directly, bypassing validation and the call log.
    /// Keeps the record's id if it has one, otherwise assigns a new id.
    pub fn seed(&self, record: impl Into<Record>) -> EntityId {
        let mut record = record.into();
        let id = match record.id() {
            Some(id) => id.clone(),
            None => {
                let id = fresh_id();
                record.set_id(Some(id.clone()));
                id
            }
        };
        let mut inner = self.lock();
        let table = inner.tables.entry(record.kind()).or_default();
        match table.iter_mut().find(|r| r.id() == Some(&id)) {
            Some(slot) => *slot = record,
            None => table.push(record),
        }
        id
    }

    /// Reads a record directly, bypassing faults and the call log.
    pub fn peek(&self, kind: EntityKind, id: &EntityId) -> Option<Record> {
        self.lock()
            .tables
            .get(&kind)
            .and_then(|t| t.iter().find(|r| r.id() == Some(id)).cloned())
    }

    /// Queues a fault for the next `op` on `kind`.
    pub fn fail_next(&self, op: StoreOp, kind: EntityKind, fault: Fault) {
        self.lock()
            .faults
            .entry((op, kind))
            .or_default()
            .push_back(fault);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Number of calls matching `op` and `kind`.
    pub fn call_count(&self, op: StoreOp, kind: EntityKind) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.op == op && c.kind == kind)
            .count()
    }

    /// Clears the call log.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Logs the call and pops a queued fault, if any.
    fn begin(
        inner: &mut Inner,
        op: StoreOp,
        kind: EntityKind,
        id: Option<&EntityId>,
    ) -> StoreResult<()> {
        inner.calls.push(StoreCall {
            op,
            kind,
            id: id.cloned(),
        });
        let fault = inner
            .faults
            .get_mut(&(op, kind))
            .and_then(VecDeque::pop_front);
        match fault {
            None => Ok(()),
            Some(Fault::NotFound) => Err(StoreError::NotFound {
                kind,
                id: id.cloned().unwrap_or_else(|| EntityId::from("?")),
            }),
            Some(Fault::Rejected(msg)) => Err(StoreError::ValidationRejected(msg)),
            Some(Fault::Transient(msg)) => Err(StoreError::Transient(msg)),
        }
    }
}

fn fresh_id() -> EntityId {
    EntityId::from(Uuid::now_v7().simple().to_string().as_str())
}

fn not_found(kind: EntityKind, id: &EntityId) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.clone(),
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list_all(&self, kind: EntityKind) -> StoreResult<Vec<Record>> {
        let mut inner = self.lock();
        Self::begin(&mut inner, StoreOp::List, kind, None)?;
        Ok(inner.tables.get(&kind).cloned().unwrap_or_default())
    }

    async fn get_by_id(&self, kind: EntityKind, id: &EntityId) -> StoreResult<Record> {
        let mut inner = self.lock();
        Self::begin(&mut inner, StoreOp::Get, kind, Some(id))?;
        inner
            .tables
            .get(&kind)
            .and_then(|t| t.iter().find(|r| r.id() == Some(id)).cloned())
            .ok_or_else(|| not_found(kind, id))
    }

    async fn create(&self, mut record: Record) -> StoreResult<Record> {
        let kind = record.kind();
        let mut inner = self.lock();
        Self::begin(&mut inner, StoreOp::Create, kind, None)?;
        record.validate().map_err(StoreError::ValidationRejected)?;

        let id = fresh_id();
        record.set_id(Some(id.clone()));
        debug!("memory store created {kind} {id}");
        inner.tables.entry(kind).or_default().push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &EntityId, mut record: Record) -> StoreResult<Record> {
        let kind = record.kind();
        let mut inner = self.lock();
        Self::begin(&mut inner, StoreOp::Update, kind, Some(id))?;
        record.validate().map_err(StoreError::ValidationRejected)?;

        record.set_id(Some(id.clone()));
        let slot = inner
            .tables
            .get_mut(&kind)
            .and_then(|t| t.iter_mut().find(|r| r.id() == Some(id)))
            .ok_or_else(|| not_found(kind, id))?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> StoreResult<()> {
        let mut inner = self.lock();
        Self::begin(&mut inner, StoreOp::Delete, kind, Some(id))?;
        let table = inner.tables.get_mut(&kind).ok_or_else(|| not_found(kind, id))?;
        let before = table.len();
        table.retain(|r| r.id() != Some(id));
        if table.len() == before {
            return Err(not_found(kind, id));
        }
        Ok(())
    }
}
