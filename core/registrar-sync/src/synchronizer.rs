//! Relationship synchronizer.
//!
//! Every mutation is a read-modify-write against the store followed by a
//! cache invalidation:
//!
//! 1. Fetch the owning record straight from the store (never the cache).
//! 2. Fetch every newly referenced target, so the write cannot dangle.
//! 3. Apply the change to a copy and write the whole record back.
//! 4. Only after the write succeeds, mark the affected keys stale.
//!
//! A failed fetch aborts before any write; a failed write leaves the cache
//! untouched. The store has no conditional write, so two operations on the
//! same record that both fetch before either writes will lose one update.
//! That race is left visible rather than papered over with retries.

use crate::cache::{CachedValue, EntityCache};
use crate::error::{SyncError, SyncResult};
use crate::invalidation::InvalidationPlan;
use registrar_store::RemoteStore;
use registrar_types::{
    CacheKey, Class, Department, Entity, EntityId, EntityKind, Professor, Record, Student,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mediates every read and write between callers, the store, and the
/// cache.
pub struct RelationshipSynchronizer {
    store: Arc<dyn RemoteStore>,
    cache: Arc<EntityCache>,
}

impl RelationshipSynchronizer {
    /// Creates a synchronizer over an explicitly constructed cache.
    pub fn new(store: Arc<dyn RemoteStore>, cache: Arc<EntityCache>) -> Self {
        Self { store, cache }
    }

    /// Returns the cache.
    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Lists every record of `kind`, through the cache.
    pub async fn list_records(&self, kind: EntityKind) -> SyncResult<Vec<Record>> {
        let key = CacheKey::all(kind);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit.into_records());
        }

        let generation = self.cache.generation(&key).await;
        let records = self.store.list_all(kind).await?;
        if !self
            .cache
            .set_if_generation(key, generation, CachedValue::Many(records.clone()))
            .await
        {
            debug!("{kind} listing invalidated while loading, not cached");
        }
        Ok(records)
    }

    /// Gets one record, through the cache.
    pub async fn get_record(&self, kind: EntityKind, id: &EntityId) -> SyncResult<Record> {
        let key = CacheKey::one(kind, id.clone());
        if let Some(CachedValue::One(hit)) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let generation = self.cache.generation(&key).await;
        let record = self.store.get_by_id(kind, id).await?;
        if !self
            .cache
            .set_if_generation(key, generation, CachedValue::One(record.clone()))
            .await
        {
            debug!("{kind} {id} invalidated while loading, not cached");
        }
        Ok(record)
    }

    /// Typed [`Self::list_records`].
    pub async fn list<T: Entity>(&self) -> SyncResult<Vec<T>> {
        narrow(self.list_records(T::KIND).await?)
    }

    /// Typed [`Self::get_record`].
    pub async fn get<T: Entity>(&self, id: &EntityId) -> SyncResult<T> {
        Ok(T::from_record(self.get_record(T::KIND, id).await?)?)
    }

    // ── Related views ────────────────────────────────────────────

    /// Students enrolled in a class, in `class.students` order. Ids with no
    /// matching student are skipped.
    pub async fn class_students(&self, class_id: &EntityId) -> SyncResult<Vec<Student>> {
        let key = CacheKey::related(EntityKind::Student, EntityKind::Class, class_id.clone());
        self.memo_view(key, || async move {
            let class: Class = self.get(class_id).await?;
            let students: Vec<Student> = self.list().await?;
            let by_id: HashMap<&EntityId, &Student> = students
                .iter()
                .filter_map(|s| s.id.as_ref().map(|id| (id, s)))
                .collect();
            let mut seen = HashSet::new();
            Ok(class
                .students
                .iter()
                .filter(|id| seen.insert(*id))
                .filter_map(|id| by_id.get(id).map(|s| (*s).clone()))
                .collect())
        })
        .await
    }

    /// Classes whose `department` is `department_id`.
    pub async fn department_classes(&self, department_id: &EntityId) -> SyncResult<Vec<Class>> {
        let key = CacheKey::related(
            EntityKind::Class,
            EntityKind::Department,
            department_id.clone(),
        );
        self.memo_view(key, || async move {
            let classes: Vec<Class> = self.list().await?;
            Ok(classes
                .into_iter()
                .filter(|c| c.department.as_ref() == Some(department_id))
                .collect())
        })
        .await
    }

    /// Classes taught by a professor.
    pub async fn professor_classes(&self, professor_id: &EntityId) -> SyncResult<Vec<Class>> {
        let key = CacheKey::related(EntityKind::Class, EntityKind::Professor, professor_id.clone());
        self.memo_view(key, || async move {
            let classes: Vec<Class> = self.list().await?;
            Ok(classes
                .into_iter()
                .filter(|c| c.professor.as_ref() == Some(professor_id))
                .collect())
        })
        .await
    }

    /// Classes a student is enrolled in, derived from `Class::students`.
    pub async fn student_classes(&self, student_id: &EntityId) -> SyncResult<Vec<Class>> {
        let key = CacheKey::related(EntityKind::Class, EntityKind::Student, student_id.clone());
        self.memo_view(key, || async move {
            let classes: Vec<Class> = self.list().await?;
            Ok(classes
                .into_iter()
                .filter(|c| c.has_student(student_id))
                .collect())
        })
        .await
    }

    /// Departments headed by a professor.
    pub async fn headed_departments(&self, professor_id: &EntityId) -> SyncResult<Vec<Department>> {
        let key = CacheKey::related(
            EntityKind::Department,
            EntityKind::Professor,
            professor_id.clone(),
        );
        self.memo_view(key, || async move {
            let departments: Vec<Department> = self.list().await?;
            Ok(departments
                .into_iter()
                .filter(|d| d.head_of_department.as_ref() == Some(professor_id))
                .collect())
        })
        .await
    }

    /// Students not enrolled in a class (candidates for enrollment).
    pub async fn available_students(&self, class_id: &EntityId) -> SyncResult<Vec<Student>> {
        let class: Class = self.get(class_id).await?;
        let students: Vec<Student> = self.list().await?;
        Ok(students
            .into_iter()
            .filter(|s| s.id.as_ref().is_none_or(|id| !class.has_student(id)))
            .collect())
    }

    /// Classes not in a department (candidates for assignment).
    pub async fn available_classes(&self, department_id: &EntityId) -> SyncResult<Vec<Class>> {
        let classes: Vec<Class> = self.list().await?;
        Ok(classes
            .into_iter()
            .filter(|c| c.department.as_ref() != Some(department_id))
            .collect())
    }

    async fn memo_view<T, F, Fut>(&self, key: CacheKey, compute: F) -> SyncResult<Vec<T>>
    where
        T: Entity,
        F: FnOnce() -> Fut,
        Fut: Future<Output = SyncResult<Vec<T>>>,
    {
        if let Some(hit) = self.cache.get(&key).await {
            return narrow(hit.into_records());
        }

        let generation = self.cache.generation(&key).await;
        let view = compute().await?;
        let records = view.iter().cloned().map(Entity::into_record).collect();
        if !self
            .cache
            .set_if_generation(key.clone(), generation, CachedValue::Many(records))
            .await
        {
            debug!("view {key} invalidated while computing, not cached");
        }
        Ok(view)
    }

    // ── Class ↔ students ─────────────────────────────────────────

    /// Enrolls a student. Idempotent: an already-enrolled student is not
    /// added twice and no write is made.
    pub async fn add_student(&self, class_id: &EntityId, student_id: &EntityId) -> SyncResult<Class> {
        self.ensure_exists(EntityKind::Student, student_id).await?;
        let class = self
            .modify::<Class, _>(class_id, |c| {
                if !c.has_student(student_id) {
                    c.students.push(student_id.clone());
                }
            })
            .await?;
        info!("student {student_id} enrolled in class {class_id}");
        Ok(class)
    }

    /// Unenrolls a student. Removing an absent student makes no write.
    pub async fn remove_student(
        &self,
        class_id: &EntityId,
        student_id: &EntityId,
    ) -> SyncResult<Class> {
        let class = self
            .modify::<Class, _>(class_id, |c| c.students.retain(|s| s != student_id))
            .await?;
        info!("student {student_id} removed from class {class_id}");
        Ok(class)
    }

    // ── Class → department ───────────────────────────────────────

    /// Moves a class into a department. Overwrites any previous department;
    /// ownership is exclusive so no separate removal is needed.
    pub async fn set_class_department(
        &self,
        class_id: &EntityId,
        department_id: &EntityId,
    ) -> SyncResult<Class> {
        self.ensure_exists(EntityKind::Department, department_id).await?;
        let class = self
            .modify::<Class, _>(class_id, |c| c.department = Some(department_id.clone()))
            .await?;
        info!("class {class_id} assigned to department {department_id}");
        Ok(class)
    }

    /// Removes a class from its department.
    pub async fn clear_class_department(&self, class_id: &EntityId) -> SyncResult<Class> {
        let class = self
            .modify::<Class, _>(class_id, |c| c.department = None)
            .await?;
        info!("class {class_id} removed from its department");
        Ok(class)
    }

    // ── Class → professor ────────────────────────────────────────

    /// Assigns a professor to a class. A professor may teach any number of
    /// classes.
    pub async fn set_class_professor(
        &self,
        class_id: &EntityId,
        professor_id: &EntityId,
    ) -> SyncResult<Class> {
        self.ensure_exists(EntityKind::Professor, professor_id).await?;
        let class = self
            .modify::<Class, _>(class_id, |c| c.professor = Some(professor_id.clone()))
            .await?;
        info!("professor {professor_id} assigned to class {class_id}");
        Ok(class)
    }

    pub async fn clear_class_professor(&self, class_id: &EntityId) -> SyncResult<Class> {
        let class = self
            .modify::<Class, _>(class_id, |c| c.professor = None)
            .await?;
        info!("class {class_id} has no professor");
        Ok(class)
    }

    // ── Department → head ────────────────────────────────────────

    /// Sets the head of a department. A professor may head any number of
    /// departments.
    pub async fn set_head_of_department(
        &self,
        department_id: &EntityId,
        professor_id: &EntityId,
    ) -> SyncResult<Department> {
        self.ensure_exists(EntityKind::Professor, professor_id).await?;
        let department = self
            .modify::<Department, _>(department_id, |d| {
                d.head_of_department = Some(professor_id.clone());
            })
            .await?;
        info!("professor {professor_id} heads department {department_id}");
        Ok(department)
    }

    pub async fn clear_head_of_department(&self, department_id: &EntityId) -> SyncResult<Department> {
        let department = self
            .modify::<Department, _>(department_id, |d| d.head_of_department = None)
            .await?;
        info!("department {department_id} has no head");
        Ok(department)
    }

    // ── Plain CRUD ───────────────────────────────────────────────

    /// Creates a record. The store assigns the id.
    pub async fn create(&self, record: Record) -> SyncResult<Record> {
        self.ensure_references(None, &record).await?;
        let created = self.store.create(record).await.inspect_err(|e| {
            warn!("create failed: {e}");
        })?;
        self.apply_plan(&InvalidationPlan::for_write(None, Some(&created)))
            .await;
        if let Some(id) = created.id() {
            info!("created {} {id}", created.kind());
        }
        Ok(created)
    }

    /// Replaces the record stored under `id` with `record`.
    pub async fn update(&self, id: &EntityId, record: Record) -> SyncResult<Record> {
        let before = self.fetch_current_record(record.kind(), id).await?;
        self.ensure_references(Some(&before), &record).await?;
        let written = self.write(id, before, record).await?;
        info!("updated {} {id}", written.kind());
        Ok(written)
    }

    /// Deletes a record. References to it held by other records are left
    /// as they are; the store has no cascading delete.
    pub async fn delete(&self, kind: EntityKind, id: &EntityId) -> SyncResult<()> {
        let before = self.fetch_current_record(kind, id).await?;
        self.store.delete(kind, id).await.inspect_err(|e| {
            warn!("delete {kind} {id} failed: {e}");
        })?;
        self.apply_plan(&InvalidationPlan::for_write(Some(&before), None))
            .await;
        info!("deleted {kind} {id}");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────

    /// Fetch, change, and write back one record. Skips the write (and the
    /// invalidation) when `change` leaves the record as it was.
    async fn modify<T, F>(&self, id: &EntityId, change: F) -> SyncResult<T>
    where
        T: Entity + PartialEq,
        F: FnOnce(&mut T) + Send,
    {
        let current = T::from_record(self.fetch_current_record(T::KIND, id).await?)?;
        let mut next = current.clone();
        change(&mut next);
        if next == current {
            debug!("{} {id} already in the requested state, no write", T::KIND);
            return Ok(current);
        }
        let written = self
            .write(id, current.into_record(), next.into_record())
            .await?;
        Ok(T::from_record(written)?)
    }

    /// Reads the current server copy, bypassing the cache.
    async fn fetch_current_record(&self, kind: EntityKind, id: &EntityId) -> SyncResult<Record> {
        self.store.get_by_id(kind, id).await.map_err(|e| {
            warn!("fetch {kind} {id} failed: {e}");
            SyncError::from(e)
        })
    }

    async fn ensure_exists(&self, kind: EntityKind, id: &EntityId) -> SyncResult<()> {
        self.fetch_current_record(kind, id).await.map(|_| ())
    }

    /// Confirms every reference `after` adds over `before` points at an
    /// existing record.
    async fn ensure_references(&self, before: Option<&Record>, after: &Record) -> SyncResult<()> {
        let existing: BTreeSet<_> = before
            .map(Record::forward_references)
            .unwrap_or_default()
            .into_iter()
            .collect();
        let added: BTreeSet<_> = after
            .forward_references()
            .into_iter()
            .filter(|r| !existing.contains(r))
            .collect();
        for (kind, id) in added {
            self.ensure_exists(kind, &id).await?;
        }
        Ok(())
    }

    /// Writes `after` over `before` and invalidates on success.
    async fn write(&self, id: &EntityId, before: Record, after: Record) -> SyncResult<Record> {
        let kind = after.kind();
        let written = self.store.update(id, after).await.inspect_err(|e| {
            warn!("write {kind} {id} failed, cache left as is: {e}");
        })?;
        self.apply_plan(&InvalidationPlan::for_write(Some(&before), Some(&written)))
            .await;
        Ok(written)
    }

    async fn apply_plan(&self, plan: &InvalidationPlan) {
        self.cache.invalidate_all(plan.keys.iter().cloned()).await;
        for (kind, owner_kind) in &plan.related_views {
            self.cache.invalidate_related(*kind, *owner_kind).await;
        }
    }
}

fn narrow<T: Entity>(records: Vec<Record>) -> SyncResult<Vec<T>> {
    records
        .into_iter()
        .map(|r| T::from_record(r).map_err(SyncError::from))
        .collect()
}
