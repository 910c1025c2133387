//! Which cache keys a write makes stale.
//!
//! A plan is computed from the owning record before and after the write
//! (`None` before a create, `None` after a delete). The rules:
//!
//! 1. The record itself: `(kind, Id)` and `(kind, All)`.
//! 2. Every related view the record appears in, keyed by the targets of its
//!    forward references, before and after: `(kind, RelatedTo(target_kind,
//!    target))`. E.g. a class in department `d` appears in
//!    `(Class, RelatedTo(Department, d))`.
//! 3. Views the record owns: a class owns its roster
//!    `(Student, RelatedTo(Class, c))`.
//! 4. Targets that keep a derived mirror of a reference that was added or
//!    removed: `(target_kind, Id(target))` and `(target_kind, All)`. Classes
//!    are mirrored by students, professors, and departments; a department's
//!    head is not mirrored.
//! 5. Views of this kind keyed by owners holding references to it. A
//!    student appears in the rosters of classes the student record does
//!    not name, so every roster is marked stale when a student changes.

use registrar_types::{CacheKey, EntityId, EntityKind, Record, Scope};
use std::collections::BTreeSet;

/// The keys to mark stale after a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Exact keys.
    pub keys: BTreeSet<CacheKey>,
    /// `(kind, owner_kind)`: every `(kind, RelatedTo(owner_kind, _))` view.
    pub related_views: BTreeSet<(EntityKind, EntityKind)>,
}

impl InvalidationPlan {
    /// Plans for a write that turned `before` into `after`.
    ///
    /// Returns an empty plan if both are `None` or neither has an id.
    pub fn for_write(before: Option<&Record>, after: Option<&Record>) -> Self {
        let mut plan = Self::default();
        let Some((kind, id)) = after
            .or(before)
            .and_then(|r| r.id().map(|id| (r.kind(), id.clone())))
        else {
            return plan;
        };

        // 1
        plan.keys.insert(CacheKey::one(kind, id.clone()));
        plan.keys.insert(CacheKey::all(kind));

        // 2
        let old_refs = references(before);
        let new_refs = references(after);
        for (target_kind, target) in old_refs.union(&new_refs) {
            plan.keys
                .insert(CacheKey::related(kind, *target_kind, target.clone()));
        }

        // 3
        for view_kind in owned_view_kinds(kind) {
            plan.keys.insert(CacheKey::related(*view_kind, kind, id.clone()));
        }

        // 4
        for (target_kind, target) in old_refs.symmetric_difference(&new_refs) {
            if is_mirrored(kind, *target_kind) {
                plan.keys.insert(CacheKey::one(*target_kind, target.clone()));
                plan.keys.insert(CacheKey::all(*target_kind));
            }
        }

        // 5
        for owner_kind in owners_of(kind) {
            plan.related_views.insert((kind, *owner_kind));
        }

        plan
    }

    /// Whether the plan marks `key` stale, exactly or through a view sweep.
    pub fn covers(&self, key: &CacheKey) -> bool {
        if self.keys.contains(key) {
            return true;
        }
        match &key.scope {
            Scope::RelatedTo(owner_kind, _) => {
                self.related_views.contains(&(key.kind, *owner_kind))
            }
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.related_views.is_empty()
    }

    /// Convenience for tests and logs: does the plan name this one record.
    pub fn touches(&self, kind: EntityKind, id: &EntityId) -> bool {
        self.keys.contains(&CacheKey::one(kind, id.clone()))
    }
}

fn references(record: Option<&Record>) -> BTreeSet<(EntityKind, EntityId)> {
    record
        .map(Record::forward_references)
        .unwrap_or_default()
        .into_iter()
        .collect()
}

/// Kinds of the views a record of `kind` owns (keyed by its own id).
fn owned_view_kinds(kind: EntityKind) -> &'static [EntityKind] {
    match kind {
        EntityKind::Class => &[EntityKind::Student],
        _ => &[],
    }
}

/// Kinds that hold forward references to `kind`.
fn owners_of(kind: EntityKind) -> &'static [EntityKind] {
    match kind {
        EntityKind::Student => &[EntityKind::Class],
        EntityKind::Professor => &[EntityKind::Class, EntityKind::Department],
        EntityKind::Department => &[EntityKind::Class],
        EntityKind::Class => &[],
    }
}

/// Whether records of `target` keep a derived list of `owner` records
/// pointing at them.
fn is_mirrored(owner: EntityKind, target: EntityKind) -> bool {
    matches!(
        (owner, target),
        (EntityKind::Class, EntityKind::Student)
            | (EntityKind::Class, EntityKind::Professor)
            | (EntityKind::Class, EntityKind::Department)
    )
}
