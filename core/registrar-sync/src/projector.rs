//! Presentation rows.
//!
//! Joins records with the names of the records they reference. Nothing
//! here touches the cache; the inputs are borrowed and left as they are.
//! A foreign key whose target is not in the lookup renders as the raw id.

use crate::error::SyncResult;
use crate::synchronizer::RelationshipSynchronizer;
use registrar_types::{EntityId, EntityKind, Record};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// One named cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub column: &'static str,
    pub value: String,
}

/// One projected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: Option<EntityId>,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Value of `column`, if the row has it.
    pub fn cell(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.value.as_str())
    }
}

/// Display names by kind and id.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    names: HashMap<EntityKind, HashMap<EntityId, String>>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds labels from any mix of records; records without an id are
    /// skipped.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut labels = Self::new();
        for record in records {
            labels.insert(record);
        }
        labels
    }

    pub fn insert(&mut self, record: &Record) {
        if let Some(id) = record.id() {
            self.names
                .entry(record.kind())
                .or_default()
                .insert(id.clone(), record.name().to_string());
        }
    }

    /// Name of the referenced record, or the raw id when unknown.
    pub fn label(&self, kind: EntityKind, id: &EntityId) -> String {
        self.names
            .get(&kind)
            .and_then(|m| m.get(id))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn reference(&self, kind: EntityKind, id: Option<&EntityId>) -> String {
        id.map(|id| self.label(kind, id)).unwrap_or_default()
    }
}

/// Column names for a kind, in display order.
pub fn columns(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Student => &["name", "birthDate", "address", "phone"],
        EntityKind::Class => &["name", "term", "description", "professor", "department"],
        EntityKind::Professor => &["name", "address", "phone", "hireDate"],
        EntityKind::Department => &["name", "description", "headOfDepartment"],
    }
}

/// Projects one record.
pub fn project(record: &Record, labels: &Labels) -> Row {
    let values: Vec<String> = match record {
        Record::Student(s) => vec![
            s.name.clone(),
            text(&s.birth_date),
            text(&s.address),
            text(&s.phone),
        ],
        Record::Class(c) => vec![
            c.name.clone(),
            c.term.clone(),
            text(&c.description),
            labels.reference(EntityKind::Professor, c.professor.as_ref()),
            labels.reference(EntityKind::Department, c.department.as_ref()),
        ],
        Record::Professor(p) => vec![
            p.name.clone(),
            text(&p.address),
            text(&p.phone),
            text(&p.hire_date),
        ],
        Record::Department(d) => vec![
            d.name.clone(),
            text(&d.description),
            labels.reference(EntityKind::Professor, d.head_of_department.as_ref()),
        ],
    };

    Row {
        id: record.id().cloned(),
        cells: columns(record.kind())
            .iter()
            .zip(values)
            .map(|(&column, value)| Cell { column, value })
            .collect(),
    }
}

pub fn project_all(records: &[Record], labels: &Labels) -> Vec<Row> {
    records.iter().map(|r| project(r, labels)).collect()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Kinds whose names a row of `kind` shows.
fn lookup_kinds(kind: EntityKind) -> &'static [EntityKind] {
    match kind {
        EntityKind::Class => &[EntityKind::Professor, EntityKind::Department],
        EntityKind::Department => &[EntityKind::Professor],
        EntityKind::Student | EntityKind::Professor => &[],
    }
}

impl RelationshipSynchronizer {
    /// Lists `kind` and projects it into rows.
    ///
    /// A failed lookup listing does not fail the call; the affected
    /// references render as raw ids.
    pub async fn rows(&self, kind: EntityKind) -> SyncResult<Vec<Row>> {
        let records = self.list_records(kind).await?;
        Ok(self.project_records(&records).await)
    }

    /// Projects already-loaded records, looking up names through the cache.
    pub async fn project_records(&self, records: &[Record]) -> Vec<Row> {
        let mut kinds: Vec<EntityKind> = Vec::new();
        for record in records {
            if !kinds.contains(&record.kind()) {
                kinds.push(record.kind());
            }
        }
        let mut lookups = Vec::new();
        for kind in kinds {
            lookups.extend(self.labels_source(kind).await);
        }
        project_all(records, &Labels::from_records(&lookups))
    }

    async fn labels_source(&self, kind: EntityKind) -> Vec<Record> {
        let mut out = Vec::new();
        for lookup in lookup_kinds(kind) {
            match self.list_records(*lookup).await {
                Ok(records) => out.extend(records),
                Err(e) => warn!("could not load {lookup} names, showing ids: {e}"),
            }
        }
        out
    }
}
