//! Cache keys.
//!
//! A key is the pair (entity kind, scope). Keys are independent: stale
//! state on `(Class, All)` says nothing about `(Class, Id(c))`.

use crate::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What part of an entity kind a cached value covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The full listing of the kind.
    All,
    /// One record.
    Id(EntityId),
    /// The records of this kind related to one owner record, e.g.
    /// `(Student, RelatedTo(Class, c))` is the roster of class `c`.
    RelatedTo(EntityKind, EntityId),
}

/// Composite key identifying one cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub scope: Scope,
}

impl CacheKey {
    #[must_use]
    pub fn all(kind: EntityKind) -> Self {
        Self { kind, scope: Scope::All }
    }

    #[must_use]
    pub fn one(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, scope: Scope::Id(id) }
    }

    /// Records of `kind` related to the `owner_kind` record `owner`.
    #[must_use]
    pub fn related(kind: EntityKind, owner_kind: EntityKind, owner: EntityId) -> Self {
        Self {
            kind,
            scope: Scope::RelatedTo(owner_kind, owner),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Scope::All => write!(f, "{}:all", self.kind),
            Scope::Id(id) => write!(f, "{}:{id}", self.kind),
            Scope::RelatedTo(owner_kind, owner) => {
                write!(f, "{}:{owner_kind}/{owner}", self.kind)
            }
        }
    }
}
