//! Action vocabulary: the closed set of user intents a scenario is made of.
//!
//! Actions are plain data. Their model effect lives in [`crate::oracle`],
//! their driver mechanics in [`crate::adapter`].
//!
//! Scenario files spell actions with an internal `type` tag:
//!
//! ```yaml
//! - type: add
//!   text: buy some cheese
//! - type: toggle_one
//!   index: 0
//! - type: set_filter
//!   filter: completed
//! ```

use crate::model::Filter;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single user intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Type into the new-todo input and press Enter
    Add {
        /// Raw text typed, before trimming
        text: String,
    },
    /// Click one item's checkbox
    ToggleOne {
        /// Index in the visible list
        index: usize,
    },
    /// Drive the toggle-all control until every item has the given flag
    ToggleAll {
        /// Target completion flag
        completed: bool,
    },
    /// Double-click an item and leave it in edit mode
    BeginEdit {
        /// Index in the visible list
        index: usize,
    },
    /// Double-click an item, replace its text, press Enter
    Edit {
        /// Index in the visible list
        index: usize,
        /// Raw replacement text
        text: String,
    },
    /// Double-click an item, replace its text, blur the edit box
    EditWithBlurCommit {
        /// Index in the visible list
        index: usize,
        /// Raw replacement text
        text: String,
    },
    /// Double-click an item, type a draft, press Escape
    CancelEdit {
        /// Index in the visible list
        index: usize,
        /// Draft text that must be discarded
        text: String,
    },
    /// Click the clear-completed button
    ClearCompleted,
    /// Click one of the footer filter links
    SetFilter {
        /// Filter to select
        filter: Filter,
    },
    /// Reload the page
    Reload,
    /// Browser history back
    GoBack,
}

impl Action {
    /// `Add` shorthand
    #[must_use]
    pub fn add(text: impl Into<String>) -> Self {
        Self::Add { text: text.into() }
    }

    /// `ToggleOne` shorthand
    #[must_use]
    pub const fn toggle(index: usize) -> Self {
        Self::ToggleOne { index }
    }

    /// `ToggleAll` shorthand
    #[must_use]
    pub const fn toggle_all(completed: bool) -> Self {
        Self::ToggleAll { completed }
    }

    /// `BeginEdit` shorthand
    #[must_use]
    pub const fn begin_edit(index: usize) -> Self {
        Self::BeginEdit { index }
    }

    /// `Edit` shorthand
    #[must_use]
    pub fn edit(index: usize, text: impl Into<String>) -> Self {
        Self::Edit {
            index,
            text: text.into(),
        }
    }

    /// `EditWithBlurCommit` shorthand
    #[must_use]
    pub fn edit_with_blur(index: usize, text: impl Into<String>) -> Self {
        Self::EditWithBlurCommit {
            index,
            text: text.into(),
        }
    }

    /// `CancelEdit` shorthand
    #[must_use]
    pub fn cancel_edit(index: usize, text: impl Into<String>) -> Self {
        Self::CancelEdit {
            index,
            text: text.into(),
        }
    }

    /// `SetFilter` shorthand
    #[must_use]
    pub const fn filter(filter: Filter) -> Self {
        Self::SetFilter { filter }
    }

    /// Visible-list index this action addresses, if any
    #[must_use]
    pub const fn target_index(&self) -> Option<usize> {
        match self {
            Self::ToggleOne { index }
            | Self::BeginEdit { index }
            | Self::Edit { index, .. }
            | Self::EditWithBlurCommit { index, .. }
            | Self::CancelEdit { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { text } => write!(f, "add {text:?}"),
            Self::ToggleOne { index } => write!(f, "toggle #{index}"),
            Self::ToggleAll { completed: true } => f.write_str("mark all completed"),
            Self::ToggleAll { completed: false } => f.write_str("mark all active"),
            Self::BeginEdit { index } => write!(f, "begin edit #{index}"),
            Self::Edit { index, text } => write!(f, "edit #{index} to {text:?}"),
            Self::EditWithBlurCommit { index, text } => {
                write!(f, "edit #{index} to {text:?} (blur)")
            }
            Self::CancelEdit { index, text } => write!(f, "cancel edit #{index} ({text:?})"),
            Self::ClearCompleted => f.write_str("clear completed"),
            Self::SetFilter { filter } => write!(f, "filter {filter}"),
            Self::Reload => f.write_str("reload"),
            Self::GoBack => f.write_str("go back"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_tagged_actions() {
        let yaml = r"
- type: add
  text: buy some cheese
- type: toggle_one
  index: 0
- type: toggle_all
  completed: true
- type: edit_with_blur_commit
  index: 1
  text: buy some sausages
- type: begin_edit
  index: 2
- type: clear_completed
- type: set_filter
  filter: active
- type: go_back
";
        let actions: Vec<Action> = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::add("buy some cheese"),
                Action::toggle(0),
                Action::toggle_all(true),
                Action::edit_with_blur(1, "buy some sausages"),
                Action::begin_edit(2),
                Action::ClearCompleted,
                Action::filter(Filter::Active),
                Action::GoBack,
            ]
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<Vec<Action>, _> = serde_yaml_ng::from_str("- type: explode");
        assert!(result.is_err());
    }

    #[test]
    fn test_target_index() {
        assert_eq!(Action::cancel_edit(2, "x").target_index(), Some(2));
        assert_eq!(Action::begin_edit(1).target_index(), Some(1));
        assert_eq!(Action::ClearCompleted.target_index(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Action::toggle(1).to_string(), "toggle #1");
        assert_eq!(Action::begin_edit(0).to_string(), "begin edit #0");
        assert_eq!(
            Action::filter(Filter::Completed).to_string(),
            "filter Completed"
        );
    }
}
