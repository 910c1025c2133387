//! The four record types exchanged with the remote store.
//!
//! Field names follow the store's camelCase JSON. Authoritative forward
//! references are `Class::students`, `Class::professor`,
//! `Class::department` and `Department::head_of_department`. The list
//! fields on `Student`, `Professor` and `Department` are derived mirrors
//! kept by the store; the core passes them through untouched and never
//! reads them as truth.

use crate::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Derived; see [`Class::students`].
    #[serde(default, deserialize_with = "id_list::deserialize")]
    pub enrolled_classes: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub term: String,
    /// Enrolled students. Membership holds iff the student id is here.
    #[serde(default, deserialize_with = "id_list::deserialize")]
    pub students: Vec<EntityId>,
    #[serde(default, with = "foreign_key")]
    pub professor: Option<EntityId>,
    /// Owning department. A class belongs to at most one department.
    #[serde(default, with = "foreign_key")]
    pub department: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Professor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<String>,
    /// Derived; see [`Class::professor`].
    #[serde(default, deserialize_with = "id_list::deserialize")]
    pub classes: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, deserialize_with = "text::deserialize")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "foreign_key")]
    pub head_of_department: Option<EntityId>,
    /// Derived; see [`Class::department`].
    #[serde(default, deserialize_with = "id_list::deserialize")]
    pub classes: Vec<EntityId>,
}

impl Class {
    /// Whether `student` is enrolled.
    pub fn has_student(&self, student: &EntityId) -> bool {
        self.students.contains(student)
    }
}

/// Single-valued reference: `""`, `null` and absent all mean "none".
/// "None" goes out as `""`, which is what the store expects for a cleared
/// reference.
mod foreign_key {
    use crate::EntityId;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<EntityId>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_ref().map_or("", EntityId::as_str))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<EntityId>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.and_then(|s| EntityId::parse(s).ok()))
    }
}

/// Required text: `null` and absent read as empty; `Record::validate`
/// rejects the blank value before any write.
mod text {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
    }
}

/// Id lists: `null` and absent read as empty, blank entries are dropped.
mod id_list {
    use crate::EntityId;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<EntityId>, D::Error> {
        let raw = Option::<Vec<String>>::deserialize(d)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| EntityId::parse(s).ok())
            .collect())
    }
}
