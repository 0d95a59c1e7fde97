//! Todo model: the ordered item list, the filter, and the persisted record shape.
//!
//! Every mutation here is positional over the *model* list. Mapping from the
//! index a user sees on screen to a model index is the oracle's job.

use crate::result::{ConformanceError, ConformanceResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single todo entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Item text, always trimmed and non-empty
    pub text: String,
    /// Completion flag
    pub completed: bool,
}

impl TodoItem {
    /// Create an active item
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }

    /// Set the completion flag
    #[must_use]
    pub const fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// Ordered todo list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    items: Vec<TodoItem>,
}

impl TodoList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from items, dropping any whose trimmed text is empty
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = TodoItem>) -> Self {
        let items = items
            .into_iter()
            .filter_map(|item| {
                let text = item.text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(TodoItem::new(text).with_completed(item.completed))
                }
            })
            .collect();
        Self { items }
    }

    /// Items in order
    #[must_use]
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items not completed
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.items.iter().filter(|item| !item.completed).count()
    }

    /// Number of completed items
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.items.len() - self.active_count()
    }

    /// Append a new item. Blank text is ignored.
    pub fn add(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.items.push(TodoItem::new(text));
        }
    }

    /// Flip the completion flag of one item
    pub fn toggle(&mut self, index: usize) -> ConformanceResult<()> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(ConformanceError::IndexOutOfRange { index, len })?;
        item.completed = !item.completed;
        Ok(())
    }

    /// Set every item's completion flag
    pub fn toggle_all(&mut self, completed: bool) {
        for item in &mut self.items {
            item.completed = completed;
        }
    }

    /// Commit an edit. Text that trims to empty removes the item.
    pub fn edit(&mut self, index: usize, text: &str) -> ConformanceResult<()> {
        self.check_index(index)?;
        let text = text.trim();
        if text.is_empty() {
            let _ = self.items.remove(index);
        } else {
            self.items[index].text = text.to_string();
        }
        Ok(())
    }

    /// Remove every completed item, keeping the rest in order
    pub fn clear_completed(&mut self) {
        self.items.retain(|item| !item.completed);
    }

    /// Fail with `IndexOutOfRange` unless `index` addresses an item
    pub fn check_index(&self, index: usize) -> ConformanceResult<()> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(ConformanceError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }

    /// The records this list should serialize to in storage
    #[must_use]
    pub fn to_records(&self) -> Vec<PersistedRecord> {
        self.items.iter().map(PersistedRecord::from).collect()
    }
}

/// Which subset of items the list view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Every item
    #[default]
    All,
    /// Items not completed
    Active,
    /// Completed items
    Completed,
}

impl Filter {
    /// All filters in the order the footer shows them
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Completed];

    /// Whether an item is shown under this filter
    #[must_use]
    pub const fn matches(self, item: &TodoItem) -> bool {
        match self {
            Self::All => true,
            Self::Active => !item.completed,
            Self::Completed => item.completed,
        }
    }

    /// Link label in the footer
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }

    /// Hash route the link points to
    #[must_use]
    pub const fn route(self) -> &'static str {
        match self {
            Self::All => "#/",
            Self::Active => "#/active",
            Self::Completed => "#/completed",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One record of the application's serialized todo collection.
///
/// Extra fields the application stores (ids and the like) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// Item text
    pub title: String,
    /// Completion flag
    pub completed: bool,
}

impl From<&TodoItem> for PersistedRecord {
    fn from(item: &TodoItem) -> Self {
        Self {
            title: item.text.clone(),
            completed: item.completed,
        }
    }
}

/// Format `count` with a singular or plural noun.
///
/// `plural` defaults to `singular` with an `s` appended.
#[must_use]
pub fn pluralize(count: usize, singular: &str, plural: Option<&str>) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        match plural {
            Some(plural) => format!("{count} {plural}"),
            None => format!("{count} {singular}s"),
        }
    }
}

/// Counter text the footer shows for `active` remaining items
#[must_use]
pub fn counter_text(active: usize) -> String {
    format!("{} left", pluralize(active, "item", None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> TodoList {
        let mut list = TodoList::new();
        list.add("buy some cheese");
        list.add("feed the cat");
        list.add("book a doctors appointment");
        list
    }

    #[test]
    fn test_add_trims_and_appends() {
        let mut list = TodoList::new();
        list.add("  walk the dog ");
        assert_eq!(list.items(), &[TodoItem::new("walk the dog")]);
    }

    #[test]
    fn test_add_blank_is_noop() {
        let mut list = three();
        list.add("   ");
        list.add("");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut list = three();
        let err = list.toggle(3).unwrap_err();
        assert!(matches!(
            err,
            ConformanceError::IndexOutOfRange { index: 3, len: 3 }
        ));
    }

    #[test]
    fn test_edit_whitespace_removes_and_shifts() {
        let mut list = three();
        list.edit(1, "   ").unwrap();
        let texts: Vec<_> = list.items().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, ["buy some cheese", "book a doctors appointment"]);
    }

    #[test]
    fn test_edit_keeps_completion() {
        let mut list = three();
        list.toggle(0).unwrap();
        list.edit(0, "buy brie").unwrap();
        assert_eq!(list.items()[0], TodoItem::new("buy brie").with_completed(true));
    }

    #[test]
    fn test_clear_completed_preserves_order() {
        let mut list = three();
        list.toggle(1).unwrap();
        list.clear_completed();
        let texts: Vec<_> = list.items().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, ["buy some cheese", "book a doctors appointment"]);
    }

    #[test]
    fn test_from_items_drops_blank() {
        let list = TodoList::from_items([TodoItem::new(" a "), TodoItem::new("  ")]);
        assert_eq!(list.items(), &[TodoItem::new("a")]);
    }

    #[test]
    fn test_filter_matches() {
        let done = TodoItem::new("x").with_completed(true);
        assert!(Filter::All.matches(&done));
        assert!(!Filter::Active.matches(&done));
        assert!(Filter::Completed.matches(&done));
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "item", None), "1 item");
        assert_eq!(pluralize(0, "item", None), "0 items");
        assert_eq!(pluralize(2, "child", Some("children")), "2 children");
    }

    #[test]
    fn test_counter_text() {
        assert_eq!(counter_text(1), "1 item left");
        assert_eq!(counter_text(0), "0 items left");
        assert_eq!(counter_text(3), "3 items left");
    }

    #[test]
    fn test_record_ignores_extra_fields() {
        let json = r#"[{"id":"a1","title":"feed the cat","completed":true}]"#;
        let records: Vec<PersistedRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(
            records,
            vec![PersistedRecord {
                title: "feed the cat".to_string(),
                completed: true
            }]
        );
    }
}
