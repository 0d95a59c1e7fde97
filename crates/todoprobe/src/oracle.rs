//! Oracle: expected application state after every action.
//!
//! The oracle folds actions over a [`TodoList`] and derives a fresh
//! [`Projection`] from the resulting model after each one. Projections are
//! never patched incrementally.

use crate::action::Action;
use crate::model::{counter_text, Filter, PersistedRecord, TodoItem, TodoList};
use crate::result::{ConformanceError, ConformanceResult};
use serde::{Deserialize, Serialize};

/// Everything a conforming application should show for one model state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    /// Full model
    pub list: TodoList,
    /// Selected filter
    pub filter: Filter,
    /// Items shown under the filter, in model order
    pub visible: Vec<TodoItem>,
    /// Items not completed
    pub active_count: usize,
    /// Footer counter, e.g. `"2 items left"`
    pub counter_text: String,
    /// Clear-completed button shown
    pub clear_completed_visible: bool,
    /// Toggle-all control checked
    pub toggle_all_checked: bool,
    /// Footer (counter, filters, clear button) rendered at all
    pub footer_visible: bool,
    /// Visible index of the item in edit mode
    pub editing: Option<usize>,
    /// Serialized collection storage should hold
    pub persisted: Vec<PersistedRecord>,
}

impl Projection {
    /// Derive every projection from the model and filter
    #[must_use]
    pub fn derive(list: &TodoList, filter: Filter) -> Self {
        let visible: Vec<TodoItem> = list
            .items()
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        let active_count = list.active_count();
        Self {
            list: list.clone(),
            filter,
            visible,
            active_count,
            counter_text: counter_text(active_count),
            clear_completed_visible: list.completed_count() > 0,
            toggle_all_checked: !list.is_empty() && active_count == 0,
            footer_visible: !list.is_empty(),
            editing: None,
            persisted: list.to_records(),
        }
    }

    /// Texts of the visible items
    #[must_use]
    pub fn visible_texts(&self) -> Vec<&str> {
        self.visible.iter().map(|item| item.text.as_str()).collect()
    }
}

/// Expected-state engine.
///
/// Tracks the model, the current filter route, the route history that
/// [`Action::GoBack`] walks and the item left in edit mode by
/// [`Action::BeginEdit`]. Any other action ends that edit without changing
/// the item.
#[derive(Debug, Clone, Default)]
pub struct Oracle {
    list: TodoList,
    /// `None` until a filter link is first clicked (bare base URL)
    route: Option<Filter>,
    history: Vec<Option<Filter>>,
    /// Model index of the item in edit mode
    editing: Option<usize>,
}

impl Oracle {
    /// Oracle for a freshly loaded, empty application
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle starting from a given model and filter
    #[must_use]
    pub fn with_state(list: TodoList, filter: Filter) -> Self {
        Self {
            list,
            route: Some(filter),
            history: Vec::new(),
            editing: None,
        }
    }

    /// Current model
    #[must_use]
    pub const fn list(&self) -> &TodoList {
        &self.list
    }

    /// Current filter
    #[must_use]
    pub fn filter(&self) -> Filter {
        self.route.unwrap_or_default()
    }

    /// Projection of the current state
    #[must_use]
    pub fn projection(&self) -> Projection {
        let mut projection = Projection::derive(&self.list, self.filter());
        projection.editing = self.editing.map(|model| {
            let filter = self.filter();
            self.list.items()[..model]
                .iter()
                .filter(|item| filter.matches(item))
                .count()
        });
        projection
    }

    /// Map an index into the visible list to an index into the model
    pub fn model_index(&self, visible_index: usize) -> ConformanceResult<usize> {
        let filter = self.filter();
        self.list
            .items()
            .iter()
            .enumerate()
            .filter(|(_, item)| filter.matches(item))
            .map(|(index, _)| index)
            .nth(visible_index)
            .ok_or_else(|| ConformanceError::IndexOutOfRange {
                index: visible_index,
                len: self.projection().visible.len(),
            })
    }

    /// Apply one action and return the projection that follows it.
    ///
    /// On error the oracle is left unchanged.
    pub fn apply(&mut self, action: &Action) -> ConformanceResult<Projection> {
        let mut editing = None;
        match action {
            Action::Add { text } => self.list.add(text),
            Action::ToggleOne { index: visible } => {
                let index = self.model_index(*visible)?;
                if self.editing == Some(index) {
                    return Err(ConformanceError::scenario(format!(
                        "item #{visible} is in edit mode and its checkbox is hidden"
                    )));
                }
                self.list.toggle(index)?;
            }
            Action::BeginEdit { index } => editing = Some(self.model_index(*index)?),
            Action::ToggleAll { completed } => self.list.toggle_all(*completed),
            Action::Edit { index, text } | Action::EditWithBlurCommit { index, text } => {
                let index = self.model_index(*index)?;
                self.list.edit(index, text)?;
            }
            Action::CancelEdit { index, .. } => {
                let _ = self.model_index(*index)?;
            }
            Action::ClearCompleted => self.list.clear_completed(),
            Action::SetFilter { filter } => {
                if self.route != Some(*filter) {
                    self.history.push(self.route);
                    self.route = Some(*filter);
                }
            }
            Action::Reload => {}
            Action::GoBack => {
                self.route = self.history.pop().ok_or_else(|| {
                    ConformanceError::scenario("go back with no filter navigation to undo")
                })?;
            }
        }
        self.editing = editing;
        Ok(self.projection())
    }

    /// Apply actions in order, returning the projection after each one
    pub fn run<'a>(
        &mut self,
        actions: impl IntoIterator<Item = &'a Action>,
    ) -> ConformanceResult<Vec<Projection>> {
        actions
            .into_iter()
            .map(|action| self.apply(action))
            .collect()
    }
}
