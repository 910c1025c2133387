use crate::{Class, Department, EntityId, EntityKind, Error, Professor, Student};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A record of any kind, as carried across the store seam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Student(Student),
    Class(Class),
    Professor(Professor),
    Department(Department),
}

impl Record {
    /// Decodes a JSON value as a record of the given kind.
    pub fn from_value(kind: EntityKind, value: serde_json::Value) -> crate::Result<Self> {
        Ok(match kind {
            EntityKind::Student => Record::Student(serde_json::from_value(value)?),
            EntityKind::Class => Record::Class(serde_json::from_value(value)?),
            EntityKind::Professor => Record::Professor(serde_json::from_value(value)?),
            EntityKind::Department => Record::Department(serde_json::from_value(value)?),
        })
    }

    /// Encodes the record as its wire JSON.
    pub fn to_value(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Student(_) => EntityKind::Student,
            Record::Class(_) => EntityKind::Class,
            Record::Professor(_) => EntityKind::Professor,
            Record::Department(_) => EntityKind::Department,
        }
    }

    pub fn id(&self) -> Option<&EntityId> {
        match self {
            Record::Student(r) => r.id.as_ref(),
            Record::Class(r) => r.id.as_ref(),
            Record::Professor(r) => r.id.as_ref(),
            Record::Department(r) => r.id.as_ref(),
        }
    }

    pub fn set_id(&mut self, id: Option<EntityId>) {
        match self {
            Record::Student(r) => r.id = id,
            Record::Class(r) => r.id = id,
            Record::Professor(r) => r.id = id,
            Record::Department(r) => r.id = id,
        }
    }

    /// Display label (every kind has a required name).
    pub fn name(&self) -> &str {
        match self {
            Record::Student(r) => &r.name,
            Record::Class(r) => &r.name,
            Record::Professor(r) => &r.name,
            Record::Department(r) => &r.name,
        }
    }

    /// Authoritative references held by this record, as (target kind, id).
    ///
    /// Derived mirror lists are not included.
    pub fn forward_references(&self) -> Vec<(EntityKind, EntityId)> {
        match self {
            Record::Class(c) => c
                .students
                .iter()
                .map(|s| (EntityKind::Student, s.clone()))
                .chain(c.professor.iter().map(|p| (EntityKind::Professor, p.clone())))
                .chain(c.department.iter().map(|d| (EntityKind::Department, d.clone())))
                .collect(),
            Record::Department(d) => d
                .head_of_department
                .iter()
                .map(|p| (EntityKind::Professor, p.clone()))
                .collect(),
            Record::Student(_) | Record::Professor(_) => Vec::new(),
        }
    }

    /// Checks required fields the way the store does before accepting a
    /// write. Returns the rejection message on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.name().trim().is_empty() {
            return Err(format!("{} name is required", self.kind()));
        }
        if let Record::Class(c) = self {
            if c.term.trim().is_empty() {
                return Err("class term is required".to_string());
            }
        }
        Ok(())
    }
}

/// Typed access to one record kind.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: EntityKind;

    fn id(&self) -> Option<&EntityId>;

    fn into_record(self) -> Record;

    /// Narrows a record, failing with [`Error::KindMismatch`] when the kind
    /// differs.
    fn from_record(record: Record) -> crate::Result<Self>;
}

macro_rules! impl_entity {
    ($ty:ident, $kind:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn id(&self) -> Option<&EntityId> {
                self.id.as_ref()
            }

            fn into_record(self) -> Record {
                Record::$kind(self)
            }

            fn from_record(record: Record) -> crate::Result<Self> {
                match record {
                    Record::$kind(inner) => Ok(inner),
                    other => Err(Error::KindMismatch {
                        expected: EntityKind::$kind,
                        found: other.kind(),
                    }),
                }
            }
        }

        impl From<$ty> for Record {
            fn from(value: $ty) -> Self {
                Record::$kind(value)
            }
        }
    };
}

impl_entity!(Student, Student);
impl_entity!(Class, Class);
impl_entity!(Professor, Professor);
impl_entity!(Department, Department);
