//! Interleavings of concurrent operations.
//!
//! The store has no conditional write, so two read-modify-write sequences
//! on the same record can overwrite each other. These tests pin that
//! behavior down under a scripted interleaving instead of leaving it to
//! scheduler luck.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use registrar_store::memory::MemoryStore;
use registrar_store::{RemoteStore, StoreOp, StoreResult};
use registrar_sync::{EntityCache, Intent, Outcome, RelationshipSynchronizer};
use registrar_types::{CacheKey, Class, Entity, EntityId, EntityKind, Record, Student};
use std::sync::Arc;
use tokio::sync::{Barrier, Notify};

fn id(raw: &str) -> EntityId {
    EntityId::from(raw)
}

fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    store.seed(Student {
        id: Some(id("s1")),
        name: "Alice".into(),
        ..Default::default()
    });
    store.seed(Student {
        id: Some(id("s9")),
        name: "Zed".into(),
        ..Default::default()
    });
    store.seed(Class {
        id: Some(id("c1")),
        name: "Algebra".into(),
        term: "Fall".into(),
        students: vec![id("s9")],
        ..Default::default()
    });
    store
}

fn students_of(store: &MemoryStore, class: &str) -> Vec<EntityId> {
    let record = store.peek(EntityKind::Class, &id(class)).unwrap();
    Class::from_record(record).unwrap().students
}

async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

// ── Scripted store ──────────────────────────────────────────────

/// Makes both class fetches complete before either write, then holds the
/// write selected by `lands_last` until the other write is done.
struct InterleavedStore {
    inner: MemoryStore,
    both_fetched: Barrier,
    first_written: Notify,
    lands_last: fn(&Class) -> bool,
}

#[async_trait]
impl RemoteStore for InterleavedStore {
    fn backend_name(&self) -> &'static str {
        "interleaved"
    }

    async fn list_all(&self, kind: EntityKind) -> StoreResult<Vec<Record>> {
        self.inner.list_all(kind).await
    }

    async fn get_by_id(&self, kind: EntityKind, id: &EntityId) -> StoreResult<Record> {
        let record = self.inner.get_by_id(kind, id).await?;
        if kind == EntityKind::Class {
            self.both_fetched.wait().await;
        }
        Ok(record)
    }

    async fn create(&self, record: Record) -> StoreResult<Record> {
        self.inner.create(record).await
    }

    async fn update(&self, id: &EntityId, record: Record) -> StoreResult<Record> {
        let last = matches!(&record, Record::Class(c) if (self.lands_last)(c));
        if last {
            self.first_written.notified().await;
            self.inner.update(id, record).await
        } else {
            let written = self.inner.update(id, record).await;
            self.first_written.notify_one();
            written
        }
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> StoreResult<()> {
        self.inner.delete(kind, id).await
    }
}

fn interleaved(store: &MemoryStore, lands_last: fn(&Class) -> bool) -> Arc<RelationshipSynchronizer> {
    let gated = InterleavedStore {
        inner: store.clone(),
        both_fetched: Barrier::new(2),
        first_written: Notify::new(),
        lands_last,
    };
    Arc::new(RelationshipSynchronizer::new(
        Arc::new(gated),
        Arc::new(EntityCache::new()),
    ))
}

fn add_s1() -> Intent {
    Intent::AddStudent {
        class: id("c1"),
        student: id("s1"),
    }
}

fn remove_s9() -> Intent {
    Intent::RemoveStudent {
        class: id("c1"),
        student: id("s9"),
    }
}

// ── Lost update ─────────────────────────────────────────────────

#[tokio::test]
async fn remove_landing_last_loses_the_add() {
    let store = seeded();
    // The removal writes a list without s9 and without s1.
    let sync = interleaved(&store, |c| c.students.is_empty());

    let a = sync.dispatch(add_s1());
    let b = sync.dispatch(remove_s9());
    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    // Each operation saw its own write succeed.
    let written = |o: &Outcome| Class::from_record(o.record().unwrap().clone()).unwrap();
    assert_eq!(written(&a).students, vec![id("s9"), id("s1")]);
    assert_eq!(written(&b).students, Vec::<EntityId>::new());

    // The store kept the last write only.
    assert_eq!(students_of(&store, "c1"), Vec::<EntityId>::new());
}

#[tokio::test]
async fn add_landing_last_loses_the_remove() {
    let store = seeded();
    let sync = interleaved(&store, |c| c.has_student(&id("s1")));

    let a = sync.dispatch(add_s1());
    let b = sync.dispatch(remove_s9());
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(students_of(&store, "c1"), vec![id("s9"), id("s1")]);
}

#[tokio::test]
async fn sequential_operations_do_not_lose_updates() {
    let store = seeded();
    let sync = Arc::new(RelationshipSynchronizer::new(
        Arc::new(store.clone()),
        Arc::new(EntityCache::new()),
    ));

    sync.apply(add_s1()).await.unwrap();
    sync.apply(remove_s9()).await.unwrap();

    assert_eq!(students_of(&store, "c1"), vec![id("s1")]);
}

// ── Detached completion ─────────────────────────────────────────

#[tokio::test]
async fn dropped_handle_still_completes_and_invalidates() {
    let store = seeded();
    let sync = Arc::new(RelationshipSynchronizer::new(
        Arc::new(store.clone()),
        Arc::new(EntityCache::new()),
    ));
    let key = CacheKey::all(EntityKind::Class);
    sync.list::<Class>().await.unwrap();
    assert!(!sync.cache().is_stale(&key).await);

    drop(sync.dispatch(add_s1()));

    let watched = store.clone();
    settle(|| watched.call_count(StoreOp::Update, EntityKind::Class) == 1).await;
    let cache = Arc::clone(sync.cache());
    for _ in 0..1_000 {
        if cache.is_stale(&key).await {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert!(cache.is_stale(&key).await);
    assert_eq!(students_of(&store, "c1"), vec![id("s9"), id("s1")]);
}

#[tokio::test]
async fn dispatched_delete_reports_what_was_deleted() {
    let store = seeded();
    let sync = Arc::new(RelationshipSynchronizer::new(
        Arc::new(store.clone()),
        Arc::new(EntityCache::new()),
    ));

    let outcome = sync
        .dispatch(Intent::Delete {
            kind: EntityKind::Student,
            id: id("s9"),
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Deleted {
            kind: EntityKind::Student,
            id: id("s9")
        }
    );
    assert!(store.peek(EntityKind::Student, &id("s9")).is_none());
}

// ── Generation guard ────────────────────────────────────────────

/// Holds listings of `held` after reading them until released.
struct SlowListStore {
    inner: MemoryStore,
    held: EntityKind,
    release: Notify,
}

#[async_trait]
impl RemoteStore for SlowListStore {
    fn backend_name(&self) -> &'static str {
        "slow-list"
    }

    async fn list_all(&self, kind: EntityKind) -> StoreResult<Vec<Record>> {
        let records = self.inner.list_all(kind).await?;
        if kind == self.held {
            self.release.notified().await;
        }
        Ok(records)
    }

    async fn get_by_id(&self, kind: EntityKind, id: &EntityId) -> StoreResult<Record> {
        self.inner.get_by_id(kind, id).await
    }

    async fn create(&self, record: Record) -> StoreResult<Record> {
        self.inner.create(record).await
    }

    async fn update(&self, id: &EntityId, record: Record) -> StoreResult<Record> {
        self.inner.update(id, record).await
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> StoreResult<()> {
        self.inner.delete(kind, id).await
    }
}

#[tokio::test]
async fn read_racing_a_write_does_not_cache_stale_data() {
    let store = seeded();
    let slow = Arc::new(SlowListStore {
        inner: store.clone(),
        held: EntityKind::Class,
        release: Notify::new(),
    });
    let sync = Arc::new(RelationshipSynchronizer::new(
        slow.clone(),
        Arc::new(EntityCache::new()),
    ));

    let reader = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.list::<Class>().await })
    };
    let watched = store.clone();
    settle(|| watched.call_count(StoreOp::List, EntityKind::Class) == 1).await;

    // The write lands while the listing is in flight.
    sync.add_student(&id("c1"), &id("s1")).await.unwrap();
    slow.release.notify_one();

    let stale = reader.await.unwrap().unwrap();
    assert_eq!(stale[0].students, vec![id("s9")]);
    assert!(sync.cache().is_stale(&CacheKey::all(EntityKind::Class)).await);

    slow.release.notify_one();
    let fresh = sync.list::<Class>().await.unwrap();
    assert_eq!(fresh[0].students, vec![id("s9"), id("s1")]);
}

#[tokio::test]
async fn first_view_computation_racing_a_rename_is_not_cached() {
    let store = seeded();
    let slow = Arc::new(SlowListStore {
        inner: store.clone(),
        held: EntityKind::Student,
        release: Notify::new(),
    });
    let sync = Arc::new(RelationshipSynchronizer::new(
        slow.clone(),
        Arc::new(EntityCache::new()),
    ));

    let reader = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.class_students(&id("c1")).await })
    };
    let watched = store.clone();
    settle(|| watched.call_count(StoreOp::List, EntityKind::Student) == 1).await;

    // The roster has never been cached; the rename sweeps it while in flight.
    let renamed = Student {
        id: Some(id("s9")),
        name: "Zeta".into(),
        ..Default::default()
    };
    sync.update(&id("s9"), renamed.into_record()).await.unwrap();
    slow.release.notify_one();

    let stale = reader.await.unwrap().unwrap();
    assert_eq!(stale[0].name, "Zed");
    let roster = CacheKey::related(EntityKind::Student, EntityKind::Class, id("c1"));
    assert!(sync.cache().is_stale(&roster).await);

    slow.release.notify_one();
    let fresh = sync.class_students(&id("c1")).await.unwrap();
    assert_eq!(fresh[0].name, "Zeta");
}
