//! Harness adapter: the capability surface the runner drives.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  HarnessAdapter (trait)                                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────┐    ┌───────────────────────────┐  │
//! │  │  ChromiumAdapter      │    │  SimulatedApp             │  │
//! │  │  (feature "browser")  │    │  (in-memory TodoMVC)      │  │
//! │  │  CDP via chromiumoxide│    │  oracle/runner unit tests │  │
//! │  └───────────────────────┘    └───────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adapters address elements by semantic [`Target`], never by CSS. Turning
//! an [`Action`] into adapter calls ([`perform`]) and reading the page back
//! into an [`Observation`] ([`observe`]) are written once here against the
//! trait.

use crate::action::Action;
use crate::model::{Filter, PersistedRecord};
use crate::oracle::Projection;
use crate::result::ConformanceResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class the application puts on completed items
pub const COMPLETED_CLASS: &str = "completed";
/// Class on the selected filter link
pub const SELECTED_CLASS: &str = "selected";
/// Class on an item in edit mode
pub const EDITING_CLASS: &str = "editing";
/// Label of the clear-completed button
pub const CLEAR_COMPLETED_TEXT: &str = "Clear completed";

/// Stable identifiers for the elements scenarios touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// "What needs to be done?" input
    NewTodo,
    /// Every rendered todo item (use with `count_matches`)
    TodoItems,
    /// The n-th rendered todo item
    TodoItem(usize),
    /// The n-th rendered item's title label
    TodoTitle(usize),
    /// The n-th rendered item's checkbox
    ItemCheckbox(usize),
    /// The n-th rendered item's edit textbox
    EditBox(usize),
    /// Footer "N items left"
    Counter,
    /// "Mark all as complete" checkbox
    ToggleAll,
    /// "Clear completed" button
    ClearCompleted,
    /// Footer filter link
    FilterLink(Filter),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewTodo => f.write_str("new-todo input"),
            Self::TodoItems => f.write_str("todo items"),
            Self::TodoItem(n) => write!(f, "todo item #{n}"),
            Self::TodoTitle(n) => write!(f, "todo title #{n}"),
            Self::ItemCheckbox(n) => write!(f, "checkbox #{n}"),
            Self::EditBox(n) => write!(f, "edit box #{n}"),
            Self::Counter => f.write_str("todo counter"),
            Self::ToggleAll => f.write_str("toggle-all control"),
            Self::ClearCompleted => f.write_str("clear-completed button"),
            Self::FilterLink(filter) => write!(f, "filter link {filter}"),
        }
    }
}

/// Keys scenarios press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Commit
    Enter,
    /// Cancel
    Escape,
    /// Delete backwards
    Backspace,
}

impl Key {
    /// DOM `KeyboardEvent.key` name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Escape => "Escape",
            Self::Backspace => "Backspace",
        }
    }
}

/// Driver capability surface consumed by the runner.
#[async_trait]
pub trait HarnessAdapter: Send + Sync {
    /// Load a URL
    async fn navigate(&mut self, url: &str) -> ConformanceResult<()>;

    /// Reload the current page
    async fn reload(&mut self) -> ConformanceResult<()>;

    /// Browser history back
    async fn go_back(&mut self) -> ConformanceResult<()>;

    /// Replace an input's content
    async fn fill_text(&mut self, target: Target, text: &str) -> ConformanceResult<()>;

    /// Press a key with the target focused
    async fn press_key(&mut self, target: Target, key: Key) -> ConformanceResult<()>;

    /// Click the target
    async fn click(&mut self, target: Target) -> ConformanceResult<()>;

    /// Double-click the target
    async fn double_click(&mut self, target: Target) -> ConformanceResult<()>;

    /// Move focus away from the target
    async fn dispatch_blur(&mut self, target: Target) -> ConformanceResult<()>;

    /// Rendered text of the target
    async fn read_visible_text(&self, target: Target) -> ConformanceResult<String>;

    /// Attribute value, `None` if absent
    async fn read_attribute(&self, target: Target, name: &str)
        -> ConformanceResult<Option<String>>;

    /// Number of elements matching the target
    async fn count_matches(&self, target: Target) -> ConformanceResult<usize>;

    /// Whether the target exists and is rendered visibly
    async fn is_visible(&self, target: Target) -> ConformanceResult<bool>;

    /// Whether a checkbox target exists and is checked
    async fn is_checked(&self, target: Target) -> ConformanceResult<bool>;

    /// Parse the serialized collection stored under `key`; absent key reads as empty
    async fn read_persisted_snapshot(&self, key: &str)
        -> ConformanceResult<Vec<PersistedRecord>>;
}

/// What the page showed at one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Titles of rendered items
    pub titles: Vec<String>,
    /// Completed class per rendered item
    pub completed: Vec<bool>,
    /// Rendered item carrying the editing class
    pub editing: Option<usize>,
    /// Checkbox and title label both visible, per rendered item
    pub controls_visible: Vec<bool>,
    /// Counter text, `None` when not rendered
    pub counter: Option<String>,
    /// Toggle-all checked (absent reads as unchecked)
    pub toggle_all_checked: bool,
    /// Clear-completed button visible
    pub clear_completed_visible: bool,
    /// Clear-completed button text, `None` when hidden
    pub clear_completed_text: Option<String>,
    /// Filter link carrying the selected class, `None` when no filters rendered
    pub selected_filter: Option<Filter>,
    /// Storage contents
    pub persisted: Vec<PersistedRecord>,
}

impl Observation {
    /// The observation a conforming application produces for `projection`
    #[must_use]
    pub fn expected_from(projection: &Projection) -> Self {
        let footer = projection.footer_visible;
        Self {
            titles: projection.visible.iter().map(|i| i.text.clone()).collect(),
            completed: projection.visible.iter().map(|i| i.completed).collect(),
            editing: projection.editing,
            controls_visible: (0..projection.visible.len())
                .map(|n| projection.editing != Some(n))
                .collect(),
            counter: footer.then(|| projection.counter_text.clone()),
            toggle_all_checked: projection.toggle_all_checked,
            clear_completed_visible: projection.clear_completed_visible,
            clear_completed_text: projection
                .clear_completed_visible
                .then(|| CLEAR_COMPLETED_TEXT.to_string()),
            selected_filter: footer.then_some(projection.filter),
            persisted: projection.persisted.clone(),
        }
    }

    /// Field-by-field differences between `self` (expected) and `observed`
    #[must_use]
    pub fn diff(&self, observed: &Self) -> Vec<FieldMismatch> {
        let mut out = Vec::new();
        push_if_differs(&mut out, "titles", &self.titles, &observed.titles);
        push_if_differs(&mut out, "completed", &self.completed, &observed.completed);
        push_if_differs(&mut out, "editing", &self.editing, &observed.editing);
        push_if_differs(
            &mut out,
            "controls_visible",
            &self.controls_visible,
            &observed.controls_visible,
        );
        push_if_differs(&mut out, "counter", &self.counter, &observed.counter);
        push_if_differs(
            &mut out,
            "toggle_all_checked",
            &self.toggle_all_checked,
            &observed.toggle_all_checked,
        );
        push_if_differs(
            &mut out,
            "clear_completed_visible",
            &self.clear_completed_visible,
            &observed.clear_completed_visible,
        );
        push_if_differs(
            &mut out,
            "clear_completed_text",
            &self.clear_completed_text,
            &observed.clear_completed_text,
        );
        push_if_differs(
            &mut out,
            "selected_filter",
            &self.selected_filter,
            &observed.selected_filter,
        );
        push_if_differs(&mut out, "persisted", &self.persisted, &observed.persisted);
        out
    }
}

fn push_if_differs<T: PartialEq + fmt::Debug>(
    out: &mut Vec<FieldMismatch>,
    field: &str,
    expected: &T,
    observed: &T,
) {
    if expected != observed {
        out.push(FieldMismatch {
            field: field.to_string(),
            expected: format!("{expected:?}"),
            observed: format!("{observed:?}"),
        });
    }
}

/// One differing projection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMismatch {
    /// Field name
    pub field: String,
    /// Expected value, debug-formatted
    pub expected: String,
    /// Observed value, debug-formatted
    pub observed: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, observed {}",
            self.field, self.expected, self.observed
        )
    }
}

/// Read every projection the oracle predicts from the live page.
pub async fn observe<A: HarnessAdapter + ?Sized>(
    adapter: &A,
    storage_key: &str,
) -> ConformanceResult<Observation> {
    let count = adapter.count_matches(Target::TodoItems).await?;
    let mut titles = Vec::with_capacity(count);
    let mut completed = Vec::with_capacity(count);
    let mut editing = None;
    let mut controls_visible = Vec::with_capacity(count);
    for n in 0..count {
        titles.push(adapter.read_visible_text(Target::TodoTitle(n)).await?);
        let class = adapter
            .read_attribute(Target::TodoItem(n), "class")
            .await?
            .unwrap_or_default();
        completed.push(has_class(&class, COMPLETED_CLASS));
        if editing.is_none() && has_class(&class, EDITING_CLASS) {
            editing = Some(n);
        }
        controls_visible.push(
            adapter.is_visible(Target::ItemCheckbox(n)).await?
                && adapter.is_visible(Target::TodoTitle(n)).await?,
        );
    }

    let counter = if adapter.is_visible(Target::Counter).await? {
        Some(adapter.read_visible_text(Target::Counter).await?)
    } else {
        None
    };

    let clear_completed_visible = adapter.is_visible(Target::ClearCompleted).await?;
    let clear_completed_text = if clear_completed_visible {
        Some(
            adapter
                .read_visible_text(Target::ClearCompleted)
                .await?
                .trim()
                .to_string(),
        )
    } else {
        None
    };

    let mut selected_filter = None;
    for filter in Filter::ALL {
        let link = Target::FilterLink(filter);
        if adapter.count_matches(link).await? == 0 {
            continue;
        }
        let class = adapter.read_attribute(link, "class").await?.unwrap_or_default();
        if has_class(&class, SELECTED_CLASS) {
            selected_filter = Some(filter);
            break;
        }
    }

    Ok(Observation {
        titles,
        completed,
        editing,
        controls_visible,
        counter,
        toggle_all_checked: adapter.is_checked(Target::ToggleAll).await?,
        clear_completed_visible,
        clear_completed_text,
        selected_filter,
        persisted: adapter.read_persisted_snapshot(storage_key).await?,
    })
}

fn has_class(class_attr: &str, class: &str) -> bool {
    class_attr.split_whitespace().any(|c| c == class)
}

/// Execute one action through the adapter.
///
/// `before` is the projection verified after the previous action; the
/// toggle-all control only flips between "all" and "none", so reaching
/// `ToggleAll { completed: false }` from a mixed list takes two clicks.
/// An item already in edit mode has its label hidden and is typed into
/// without another double-click.
pub async fn perform<A: HarnessAdapter + ?Sized>(
    adapter: &mut A,
    action: &Action,
    before: &Projection,
) -> ConformanceResult<()> {
    match action {
        Action::Add { text } => {
            adapter.fill_text(Target::NewTodo, text).await?;
            adapter.press_key(Target::NewTodo, Key::Enter).await
        }
        Action::ToggleOne { index } => adapter.click(Target::ItemCheckbox(*index)).await,
        Action::BeginEdit { index } => adapter.double_click(Target::TodoTitle(*index)).await,
        Action::ToggleAll { completed } => {
            if before.list.is_empty() {
                return Ok(());
            }
            let clicks = match (before.toggle_all_checked, *completed) {
                (true, false) | (false, true) => 1,
                (false, false) if before.list.completed_count() > 0 => 2,
                _ => 0,
            };
            for _ in 0..clicks {
                adapter.click(Target::ToggleAll).await?;
            }
            Ok(())
        }
        Action::Edit { index, text } => {
            begin_edit(adapter, *index, text, before).await?;
            adapter.press_key(Target::EditBox(*index), Key::Enter).await
        }
        Action::EditWithBlurCommit { index, text } => {
            begin_edit(adapter, *index, text, before).await?;
            adapter.dispatch_blur(Target::EditBox(*index)).await
        }
        Action::CancelEdit { index, text } => {
            begin_edit(adapter, *index, text, before).await?;
            adapter.press_key(Target::EditBox(*index), Key::Escape).await
        }
        Action::ClearCompleted => adapter.click(Target::ClearCompleted).await,
        Action::SetFilter { filter } => adapter.click(Target::FilterLink(*filter)).await,
        Action::Reload => adapter.reload().await,
        Action::GoBack => adapter.go_back().await,
    }
}

async fn begin_edit<A: HarnessAdapter + ?Sized>(
    adapter: &mut A,
    index: usize,
    text: &str,
    before: &Projection,
) -> ConformanceResult<()> {
    if before.editing != Some(index) {
        adapter.double_click(Target::TodoTitle(index)).await?;
    }
    adapter.fill_text(Target::EditBox(index), text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TodoItem, TodoList};

    fn projection(items: &[(&str, bool)], filter: Filter) -> Projection {
        let list = TodoList::from_items(
            items
                .iter()
                .map(|(t, c)| TodoItem::new(*t).with_completed(*c)),
        );
        Projection::derive(&list, filter)
    }

    #[test]
    fn test_expected_observation_hides_footer_when_empty() {
        let expected = Observation::expected_from(&projection(&[], Filter::All));
        assert_eq!(expected.counter, None);
        assert_eq!(expected.selected_filter, None);
        assert!(!expected.toggle_all_checked);
        assert!(!expected.clear_completed_visible);
    }

    #[test]
    fn test_expected_observation_uses_visible_subset() {
        let expected = Observation::expected_from(&projection(
            &[("a", true), ("b", false)],
            Filter::Completed,
        ));
        assert_eq!(expected.titles, ["a"]);
        assert_eq!(expected.completed, [true]);
        assert_eq!(expected.persisted.len(), 2);
        assert_eq!(expected.counter.as_deref(), Some("1 item left"));
    }

    #[test]
    fn test_expected_observation_hides_controls_of_edited_item() {
        let mut projection = projection(&[("a", true), ("b", false)], Filter::All);
        projection.editing = Some(1);
        let expected = Observation::expected_from(&projection);
        assert_eq!(expected.editing, Some(1));
        assert_eq!(expected.controls_visible, [true, false]);
        assert_eq!(expected.clear_completed_text.as_deref(), Some("Clear completed"));
    }

    #[test]
    fn test_diff_reports_each_field() {
        let expected = Observation::expected_from(&projection(&[("a", false)], Filter::All));
        let mut observed = expected.clone();
        observed.titles = vec!["a ".to_string()];
        observed.toggle_all_checked = true;
        let diff = expected.diff(&observed);
        let fields: Vec<_> = diff.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(fields, ["titles", "toggle_all_checked"]);
        assert_eq!(diff[0].observed, r#"["a "]"#);
    }

    #[test]
    fn test_has_class() {
        assert!(has_class("completed editing", "completed"));
        assert!(!has_class("not-completed", "completed"));
        assert!(!has_class("", "completed"));
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::EditBox(2).to_string(), "edit box #2");
        assert_eq!(
            Target::FilterLink(Filter::Active).to_string(),
            "filter link Active"
        );
    }
}
