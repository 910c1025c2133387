use pretty_assertions::assert_eq;
use registrar_types::{Class, Department, Entity, EntityId, EntityKind, Record, Student};
use serde_json::json;

fn class_fixture() -> Class {
    Class {
        id: Some(EntityId::from("c1")),
        name: "Algebra".into(),
        description: None,
        term: "Fall".into(),
        students: vec![EntityId::from("s1"), EntityId::from("s2")],
        professor: Some(EntityId::from("p1")),
        department: None,
    }
}

// ── Wire format ──────────────────────────────────────────────────

#[test]
fn class_reads_camel_case_and_blank_foreign_keys() {
    let value = json!({
        "id": "c1",
        "name": "Algebra",
        "term": "Fall",
        "students": ["s1", "", "s2"],
        "professor": "p1",
        "department": ""
    });
    let class: Class = serde_json::from_value(value).unwrap();
    assert_eq!(class, class_fixture());
}

#[test]
fn missing_lists_and_null_lists_read_as_empty() {
    let class: Class =
        serde_json::from_value(json!({"name": "A", "term": "T", "students": null})).unwrap();
    assert!(class.students.is_empty());
    assert_eq!(class.professor, None);
    assert_eq!(class.department, None);

    let student: Student = serde_json::from_value(json!({"name": "Ann"})).unwrap();
    assert!(student.enrolled_classes.is_empty());
}

#[test]
fn null_or_missing_name_and_term_read_as_blank() {
    let class: Class = serde_json::from_value(json!({"id": "c1", "name": null})).unwrap();
    assert_eq!(class.name, "");
    assert_eq!(class.term, "");

    let record = Record::from(class);
    assert_eq!(record.validate(), Err("class name is required".to_string()));
}

#[test]
fn cleared_foreign_key_is_written_as_empty_string() {
    let mut class = class_fixture();
    class.professor = None;
    let value = serde_json::to_value(&class).unwrap();
    assert_eq!(value["professor"], json!(""));
    assert_eq!(value["department"], json!(""));
    assert_eq!(value["students"], json!(["s1", "s2"]));
}

#[test]
fn new_record_is_written_without_id() {
    let student = Student {
        name: "Ann".into(),
        birth_date: Some("2001-02-03".into()),
        ..Default::default()
    };
    let value = serde_json::to_value(&student).unwrap();
    assert!(value.get("id").is_none());
    assert_eq!(value["birthDate"], json!("2001-02-03"));
}

#[test]
fn department_head_uses_camel_case() {
    let dept: Department = serde_json::from_value(json!({
        "id": "d1",
        "name": "Math",
        "headOfDepartment": "p9",
        "classes": ["c1"]
    }))
    .unwrap();
    assert_eq!(dept.head_of_department, Some(EntityId::from("p9")));
    assert_eq!(dept.classes, vec![EntityId::from("c1")]);
}

// ── Record ───────────────────────────────────────────────────────

#[test]
fn record_from_value_uses_kind() {
    let record = Record::from_value(EntityKind::Class, json!({"name": "A", "term": "T"})).unwrap();
    assert_eq!(record.kind(), EntityKind::Class);
    assert_eq!(record.name(), "A");
    assert_eq!(record.id(), None);
}

#[test]
fn record_to_value_is_untagged() {
    let record = Record::from(class_fixture());
    let value = record.to_value().unwrap();
    assert_eq!(value["name"], json!("Algebra"));
    assert!(value.get("Class").is_none());
}

#[test]
fn forward_references_of_class() {
    let refs = Record::from(class_fixture()).forward_references();
    assert_eq!(
        refs,
        vec![
            (EntityKind::Student, EntityId::from("s1")),
            (EntityKind::Student, EntityId::from("s2")),
            (EntityKind::Professor, EntityId::from("p1")),
        ]
    );
}

#[test]
fn derived_lists_are_not_forward_references() {
    let student = Student {
        id: Some("s1".into()),
        name: "Ann".into(),
        enrolled_classes: vec!["c1".into()],
        ..Default::default()
    };
    assert!(Record::from(student).forward_references().is_empty());
}

#[test]
fn validate_requires_name_and_term() {
    let mut class = class_fixture();
    assert!(Record::from(class.clone()).validate().is_ok());

    class.term = " ".into();
    assert_eq!(
        Record::from(class.clone()).validate(),
        Err("class term is required".to_string())
    );

    class.name = String::new();
    assert_eq!(
        Record::from(class).validate(),
        Err("class name is required".to_string())
    );
}

#[test]
fn from_record_rejects_other_kind() {
    let record = Record::from(class_fixture());
    let err = Student::from_record(record).unwrap_err();
    assert!(err.to_string().contains("expected a student record"));
}

#[test]
fn set_id_round_trips() {
    let mut record = Record::from(Student {
        name: "Ann".into(),
        ..Default::default()
    });
    record.set_id(Some("s7".into()));
    let student = Student::from_record(record).unwrap();
    assert_eq!(student.id(), Some(&EntityId::from("s7")));
}
