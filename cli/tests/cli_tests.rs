use clap::Parser;
use pretty_assertions::assert_eq;
use registrar_cli::{Args, Command, run};
use registrar_store::memory::MemoryStore;
use registrar_sync::{EntityCache, Intent, RelationshipSynchronizer};
use registrar_types::{Class, Department, EntityId, EntityKind, Professor, Student};
use std::io::Write;
use std::sync::Arc;

fn parse(args: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("registrar").chain(args.iter().copied())).unwrap()
}

fn fixture() -> (MemoryStore, RelationshipSynchronizer) {
    let store = MemoryStore::new();
    store.seed(Student {
        id: Some("s1".into()),
        name: "Alice".into(),
        ..Default::default()
    });
    store.seed(Student {
        id: Some("s2".into()),
        name: "Bob".into(),
        ..Default::default()
    });
    store.seed(Professor {
        id: Some("p1".into()),
        name: "Turing".into(),
        ..Default::default()
    });
    store.seed(Department {
        id: Some("d1".into()),
        name: "Maths".into(),
        ..Default::default()
    });
    store.seed(Class {
        id: Some("c1".into()),
        name: "Algebra".into(),
        term: "Fall".into(),
        professor: Some("p1".into()),
        ..Default::default()
    });
    let sync = RelationshipSynchronizer::new(Arc::new(store.clone()), Arc::new(EntityCache::new()));
    (store, sync)
}

async fn exec(sync: &RelationshipSynchronizer, args: &[&str]) -> anyhow::Result<String> {
    let mut out = Vec::new();
    run(sync, parse(args).command, &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

// ── Parsing ─────────────────────────────────────────────────────

#[test]
fn parses_relationship_commands() {
    let args = parse(&["enroll", "c1", "s1"]);
    assert_eq!(
        args.command.intent().unwrap(),
        Some(Intent::AddStudent {
            class: EntityId::from("c1"),
            student: EntityId::from("s1"),
        })
    );

    let args = parse(&["clear-head", "d1"]);
    assert_eq!(
        args.command.intent().unwrap(),
        Some(Intent::ClearHead {
            department: EntityId::from("d1"),
        })
    );
}

#[test]
fn kinds_accept_plural_names() {
    let args = parse(&["list", "classes"]);
    assert!(matches!(
        args.command,
        Command::List {
            kind: EntityKind::Class,
            ..
        }
    ));
}

#[test]
fn page_size_must_be_an_offered_option() {
    assert!(Args::try_parse_from(["registrar", "list", "students", "--page-size", "7"]).is_err());
    let args = parse(&["list", "students", "--page-size", "25"]);
    assert!(matches!(args.command, Command::List { page_size: 25, .. }));
}

#[test]
fn reads_are_not_intents() {
    assert_eq!(parse(&["roster", "c1"]).command.intent().unwrap(), None);
}

#[test]
fn update_takes_id_from_the_path() {
    let args = parse(&["update", "student", "s1", r#"{"id":"other","name":"Alicia"}"#]);
    let Some(Intent::Update { id, record }) = args.command.intent().unwrap() else {
        panic!("expected an update intent");
    };
    assert_eq!(id, EntityId::from("s1"));
    assert_eq!(record.id(), Some(&EntityId::from("s1")));
    assert_eq!(record.name(), "Alicia");
}

#[test]
fn malformed_json_is_an_error() {
    let args = parse(&["create", "student", "{not json"]);
    assert!(args.command.intent().is_err());
}

// ── Configuration ───────────────────────────────────────────────

#[test]
fn defaults_apply_without_config() {
    let config = parse(&["list", "students"]).store_config().unwrap();
    assert_eq!(config.timeout_secs, 30);
}

#[test]
fn flag_overrides_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api_base_url = \"http://records.internal:8080\"\ntimeout_secs = 5").unwrap();
    let path = file.path().to_str().unwrap();

    let from_file = parse(&["--config", path, "list", "students"])
        .store_config()
        .unwrap();
    assert_eq!(from_file.api_base_url, "http://records.internal:8080");
    assert_eq!(from_file.timeout_secs, 5);

    let overridden = parse(&[
        "--config",
        path,
        "--api-base-url",
        "https://api.example.org",
        "--timeout-secs",
        "0",
        "list",
        "students",
    ])
    .store_config()
    .unwrap();
    assert_eq!(overridden.api_base_url, "https://api.example.org");
    assert_eq!(overridden.timeout(), None);
}

#[test]
fn bad_url_is_rejected() {
    let args = parse(&["--api-base-url", "ftp://nope", "list", "students"]);
    assert!(args.store_config().is_err());
}

#[test]
fn missing_config_file_is_an_error() {
    let args = parse(&["--config", "/definitely/not/here.toml", "list", "students"]);
    assert!(args.store_config().is_err());
}

// ── Commands ────────────────────────────────────────────────────

#[tokio::test]
async fn list_prints_projected_rows() {
    let (_store, sync) = fixture();

    let out = exec(&sync, &["list", "classes"]).await.unwrap();

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "id\tname\tterm\tdescription\tprofessor\tdepartment");
    assert_eq!(lines[1], "c1\tAlgebra\tFall\t\tTuring\t");
    assert_eq!(lines[2], "page 1 of 1 (1 matching)");
}

#[tokio::test]
async fn list_filters_by_query() {
    let (_store, sync) = fixture();

    let out = exec(&sync, &["list", "students", "--query", "BO"]).await.unwrap();

    assert!(out.contains("s2\tBob"));
    assert!(!out.contains("Alice"));
    assert!(out.ends_with("page 1 of 1 (1 matching)\n"));
}

#[tokio::test]
async fn enroll_then_roster() {
    let (_store, sync) = fixture();

    exec(&sync, &["enroll", "c1", "s2"]).await.unwrap();
    exec(&sync, &["enroll", "c1", "s1"]).await.unwrap();
    let roster = exec(&sync, &["roster", "c1"]).await.unwrap();

    assert_eq!(roster, "s2\tBob\t\t\t\ns1\tAlice\t\t\t\n");
}

#[tokio::test]
async fn set_department_then_department_classes() {
    let (_store, sync) = fixture();

    let out = exec(&sync, &["set-department", "c1", "d1"]).await.unwrap();
    assert!(out.contains("\"department\": \"d1\""));

    let classes = exec(&sync, &["department-classes", "d1"]).await.unwrap();
    assert_eq!(classes, "c1\tAlgebra\tFall\t\tTuring\tMaths\n");
}

#[tokio::test]
async fn teaching_lists_classes_and_heads() {
    let (_store, sync) = fixture();
    exec(&sync, &["set-head", "d1", "p1"]).await.unwrap();

    let out = exec(&sync, &["teaching", "p1"]).await.unwrap();

    assert_eq!(
        out,
        "classes:\nc1\tAlgebra\tFall\t\tTuring\t\nheads:\nd1\tMaths\t\tTuring\n"
    );
}

#[tokio::test]
async fn create_show_delete() {
    let (store, sync) = fixture();

    let created = exec(&sync, &["create", "professor", r#"{"name":"Hopper"}"#])
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&created).unwrap();
    let id = value["id"].as_str().unwrap().to_string();

    let shown = exec(&sync, &["show", "professors", &id]).await.unwrap();
    assert!(shown.contains("Hopper"));

    let deleted = exec(&sync, &["delete", "professor", &id]).await.unwrap();
    assert_eq!(deleted, format!("deleted professor {id}\n"));
    assert!(store.peek(EntityKind::Professor, &id.as_str().into()).is_none());
}

#[tokio::test]
async fn unknown_target_fails_with_context() {
    let (_store, sync) = fixture();

    let err = exec(&sync, &["enroll", "c1", "ghost"]).await.unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("enroll ghost in c1 failed"), "{message}");
}
