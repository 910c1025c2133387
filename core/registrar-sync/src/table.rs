//! Free-text filtering and pagination over ordered records.
//!
//! Read-side only: inputs are borrowed, never reordered or mutated.

use crate::projector::Row;
use registrar_types::Record;
use serde::{Deserialize, Serialize};

/// Default rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page sizes offered to the user.
pub const PAGE_SIZE_OPTIONS: [usize; 3] = [10, 25, 100];

/// Something with searchable fields.
pub trait Tabular {
    /// String form of every visible field. Empty fields may be omitted.
    fn search_fields(&self) -> Vec<String>;

    /// Case-insensitive substring match against any field. `needle` must
    /// already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self
                .search_fields()
                .iter()
                .any(|f| !f.is_empty() && f.to_lowercase().contains(needle))
    }
}

impl Tabular for Row {
    /// The id followed by every cell.
    fn search_fields(&self) -> Vec<String> {
        self.id
            .iter()
            .map(ToString::to_string)
            .chain(self.cells.iter().map(|c| c.value.clone()))
            .collect()
    }
}

impl Tabular for String {
    fn search_fields(&self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl Tabular for &str {
    fn search_fields(&self) -> Vec<String> {
        vec![(*self).to_string()]
    }
}

impl Tabular for Record {
    /// Every non-empty top-level JSON value. Lists are joined with commas.
    fn search_fields(&self) -> Vec<String> {
        let Ok(serde_json::Value::Object(fields)) = self.to_value() else {
            return Vec::new();
        };
        fields.values().filter_map(json_text).collect()
    }
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(json_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

/// Stable filter: the items that match `query`, in their original order.
pub fn filter<'a, T: Tabular>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let needle = query.to_lowercase();
    items.iter().filter(|item| item.matches(&needle)).collect()
}

/// The slice `[page * size, page * size + size)`, clamped to `items`.
/// A zero page size yields an empty page.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<'a, T> {
    pub items: Vec<&'a T>,
    /// Matches across all pages.
    pub total: usize,
    pub page: usize,
    pub page_count: usize,
}

/// Query and paging state of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    query: String,
    page: usize,
    page_size: usize,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            query: String::new(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replaces the query and returns to the first page.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 0;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Changes the page size and returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.page = 0;
    }

    /// Pages needed for `len` items; at least one.
    pub fn page_count(&self, len: usize) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        len.div_ceil(self.page_size).max(1)
    }

    /// Filters `items` by the query and cuts out the current page.
    pub fn apply<'a, T: Tabular>(&self, items: &'a [T]) -> PageView<'a, T> {
        let matched = filter(items, &self.query);
        let total = matched.len();
        PageView {
            items: paginate(&matched, self.page, self.page_size).to_vec(),
            total,
            page: self.page,
            page_count: self.page_count(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_text_skips_empty_and_false() {
        assert_eq!(json_text(&serde_json::json!("")), None);
        assert_eq!(json_text(&serde_json::json!(null)), None);
        assert_eq!(json_text(&serde_json::json!(false)), None);
        assert_eq!(json_text(&serde_json::json!([])), None);
        assert_eq!(
            json_text(&serde_json::json!(["s1", "s2"])),
            Some("s1,s2".to_string())
        );
        assert_eq!(json_text(&serde_json::json!(7)), Some("7".to_string()));
    }

    #[test]
    fn zero_page_size_is_one_page() {
        let mut view = TableView::new();
        view.set_page_size(0);
        assert_eq!(view.page_count(50), 1);
        assert!(paginate(&[1, 2, 3], 0, 0).is_empty());
    }
}
