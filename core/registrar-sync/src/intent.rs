//! Mutation intents.
//!
//! Every change a user can ask for, as a value. Intents run on a detached
//! task: dropping the handle does not cancel the remote calls, and the
//! cache is still invalidated when the operation completes.

use crate::error::SyncResult;
use crate::synchronizer::RelationshipSynchronizer;
use registrar_types::{EntityId, EntityKind, Record};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A requested mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Create(Record),
    Update { id: EntityId, record: Record },
    Delete { kind: EntityKind, id: EntityId },

    AddStudent { class: EntityId, student: EntityId },
    RemoveStudent { class: EntityId, student: EntityId },

    SetDepartment { class: EntityId, department: EntityId },
    ClearDepartment { class: EntityId },

    SetProfessor { class: EntityId, professor: EntityId },
    ClearProfessor { class: EntityId },

    SetHead { department: EntityId, professor: EntityId },
    ClearHead { department: EntityId },
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Create(r) => write!(f, "create {}", r.kind()),
            Intent::Update { id, record } => write!(f, "update {} {id}", record.kind()),
            Intent::Delete { kind, id } => write!(f, "delete {kind} {id}"),
            Intent::AddStudent { class, student } => write!(f, "enroll {student} in {class}"),
            Intent::RemoveStudent { class, student } => {
                write!(f, "unenroll {student} from {class}")
            }
            Intent::SetDepartment { class, department } => {
                write!(f, "move {class} to department {department}")
            }
            Intent::ClearDepartment { class } => write!(f, "clear department of {class}"),
            Intent::SetProfessor { class, professor } => {
                write!(f, "assign professor {professor} to {class}")
            }
            Intent::ClearProfessor { class } => write!(f, "clear professor of {class}"),
            Intent::SetHead {
                department,
                professor,
            } => write!(f, "make {professor} head of {department}"),
            Intent::ClearHead { department } => write!(f, "clear head of {department}"),
        }
    }
}

/// What a completed intent produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The record as written (or as fetched, if nothing needed writing).
    Record(Record),
    Deleted { kind: EntityKind, id: EntityId },
}

impl Outcome {
    pub fn record(&self) -> Option<&Record> {
        match self {
            Outcome::Record(r) => Some(r),
            Outcome::Deleted { .. } => None,
        }
    }
}

impl RelationshipSynchronizer {
    /// Runs an intent to completion on the current task.
    pub async fn apply(&self, intent: Intent) -> SyncResult<Outcome> {
        debug!("applying intent: {intent}");
        let record = match intent {
            Intent::Create(record) => self.create(record).await?,
            Intent::Update { id, record } => self.update(&id, record).await?,
            Intent::Delete { kind, id } => {
                self.delete(kind, &id).await?;
                return Ok(Outcome::Deleted { kind, id });
            }
            Intent::AddStudent { class, student } => {
                self.add_student(&class, &student).await?.into()
            }
            Intent::RemoveStudent { class, student } => {
                self.remove_student(&class, &student).await?.into()
            }
            Intent::SetDepartment { class, department } => {
                self.set_class_department(&class, &department).await?.into()
            }
            Intent::ClearDepartment { class } => self.clear_class_department(&class).await?.into(),
            Intent::SetProfessor { class, professor } => {
                self.set_class_professor(&class, &professor).await?.into()
            }
            Intent::ClearProfessor { class } => self.clear_class_professor(&class).await?.into(),
            Intent::SetHead {
                department,
                professor,
            } => self
                .set_head_of_department(&department, &professor)
                .await?
                .into(),
            Intent::ClearHead { department } => {
                self.clear_head_of_department(&department).await?.into()
            }
        };
        Ok(Outcome::Record(record))
    }

    /// Runs an intent on a spawned task.
    ///
    /// The operation completes (and invalidates the cache) whether or not
    /// the returned handle is awaited or dropped.
    pub fn dispatch(self: &Arc<Self>, intent: Intent) -> JoinHandle<SyncResult<Outcome>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.apply(intent).await })
    }
}
