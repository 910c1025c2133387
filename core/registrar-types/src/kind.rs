use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four record types managed through the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Student,
    Class,
    Professor,
    Department,
}

impl EntityKind {
    /// Every kind, in display order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Student,
        EntityKind::Class,
        EntityKind::Professor,
        EntityKind::Department,
    ];

    /// Singular lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Class => "class",
            EntityKind::Professor => "professor",
            EntityKind::Department => "department",
        }
    }

    /// REST collection segment (e.g. `/classes`).
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            EntityKind::Student => "students",
            EntityKind::Class => "classes",
            EntityKind::Professor => "professors",
            EntityKind::Department => "departments",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = crate::Error;

    /// Accepts both the singular name and the collection name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower || k.collection() == lower)
            .ok_or_else(|| crate::Error::UnknownKind(s.to_string()))
    }
}
