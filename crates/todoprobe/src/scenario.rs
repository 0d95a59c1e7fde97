//! Scenarios: named action sequences, loaded from YAML/JSON or taken from
//! the built-in catalog.
//!
//! ```yaml
//! name: trim-edit
//! group: Editing
//! description: Edits are trimmed before they are saved
//! actions:
//!   - type: add
//!     text: buy some cheese
//!   - type: edit
//!     index: 0
//!     text: "    buy some sausages    "
//! ```

use crate::action::Action;
use crate::model::Filter;
use crate::result::{ConformanceError, ConformanceResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Items most catalog scenarios start from
pub const TODO_ITEMS: [&str; 3] = [
    "buy some cheese",
    "feed the cat",
    "book a doctors appointment",
];

/// A named, ordered list of actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name
    pub name: String,
    /// Feature group
    #[serde(default)]
    pub group: String,
    /// Human-readable intent
    #[serde(default)]
    pub description: String,
    /// Actions, applied in order
    pub actions: Vec<Action>,
}

impl Scenario {
    /// Create a scenario
    #[must_use]
    pub fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            description: String::new(),
            actions,
        }
    }

    /// Set the feature group
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Parse and validate a YAML scenario
    pub fn from_yaml(yaml: &str) -> ConformanceResult<Self> {
        let scenario: Self = serde_yaml_ng::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse and validate a JSON scenario
    pub fn from_json(json: &str) -> ConformanceResult<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario file; `.json` is parsed as JSON, anything else as YAML
    pub fn load(path: &Path) -> ConformanceResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }

    /// Structural checks. Index validity depends on state and is left to the oracle.
    pub fn validate(&self) -> ConformanceResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConformanceError::scenario("scenario name is empty"));
        }
        if self.actions.is_empty() {
            return Err(ConformanceError::scenario(format!(
                "scenario '{}' has no actions",
                self.name
            )));
        }
        Ok(())
    }
}

fn seed(items: &[&str]) -> Vec<Action> {
    items.iter().map(|text| Action::add(*text)).collect()
}

fn seeded(items: &[&str], rest: impl IntoIterator<Item = Action>) -> Vec<Action> {
    let mut actions = seed(items);
    actions.extend(rest);
    actions
}

/// Scenarios covering the TodoMVC feature groups.
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    let all = &TODO_ITEMS[..];
    let two = &TODO_ITEMS[..2];
    vec![
        // New Todo
        Scenario::new("add-items", seed(two))
            .with_group("New Todo")
            .with_description("Items are appended in order and persisted"),
        Scenario::new("add-clears-input", seed(&TODO_ITEMS[..1]))
            .with_group("New Todo")
            .with_description("The input is emptied once an item is added"),
        Scenario::new("add-appends-to-bottom", seed(all))
            .with_group("New Todo")
            .with_description("New items go to the bottom; counter reads 3 items left"),
        Scenario::new(
            "add-ignores-blank",
            vec![Action::add("   "), Action::add(TODO_ITEMS[0]), Action::add("")],
        )
        .with_group("New Todo")
        .with_description("Whitespace-only input creates nothing"),
        // Mark all as completed
        Scenario::new("mark-all-completed", seeded(all, [Action::toggle_all(true)]))
            .with_group("Mark all as completed")
            .with_description("Toggle-all completes every item"),
        Scenario::new(
            "clear-complete-state-of-all",
            seeded(all, [Action::toggle_all(true), Action::toggle_all(false)]),
        )
        .with_group("Mark all as completed")
        .with_description("Toggle-all twice leaves every item active"),
        Scenario::new(
            "toggle-all-tracks-items",
            seeded(
                all,
                [
                    Action::toggle_all(true),
                    Action::toggle(0),
                    Action::toggle(0),
                ],
            ),
        )
        .with_group("Mark all as completed")
        .with_description("Toggle-all unchecks when one item is reopened and rechecks after"),
        // Item
        Scenario::new(
            "mark-items-complete",
            seeded(two, [Action::toggle(0), Action::toggle(1)]),
        )
        .with_group("Item")
        .with_description("Items can be completed one by one"),
        Scenario::new(
            "unmark-items-complete",
            seeded(two, [Action::toggle(0), Action::toggle(0)]),
        )
        .with_group("Item")
        .with_description("A completed item can be reopened"),
        Scenario::new(
            "edit-item",
            seeded(all, [Action::edit(1, "buy some sausages")]),
        )
        .with_group("Item")
        .with_description("Double-click edit replaces the title"),
        // Editing
        Scenario::new("edit-hides-controls", seeded(all, [Action::begin_edit(1)]))
            .with_group("Editing")
            .with_description("The edited item hides its checkbox and title label"),
        Scenario::new(
            "save-edit-on-blur",
            seeded(all, [Action::edit_with_blur(1, "buy some sausages")]),
        )
        .with_group("Editing")
        .with_description("Leaving the edit box commits the edit"),
        Scenario::new(
            "trim-edit",
            seeded(all, [Action::edit(1, "    buy some sausages    ")]),
        )
        .with_group("Editing")
        .with_description("Edits are trimmed before they are saved"),
        Scenario::new("remove-on-empty-edit", seeded(all, [Action::edit(1, "")]))
            .with_group("Editing")
            .with_description("An empty edit deletes the item"),
        Scenario::new(
            "cancel-edit-on-escape",
            seeded(all, [Action::cancel_edit(1, "buy some sausages")]),
        )
        .with_group("Editing")
        .with_description("Escape discards the draft"),
        // Counter
        Scenario::new("counter", seed(two))
            .with_group("Counter")
            .with_description("The counter follows the number of active items"),
        // Clear completed button
        Scenario::new("clear-completed-shown", seeded(all, [Action::toggle(0)]))
            .with_group("Clear completed button")
            .with_description("The button appears once an item is completed"),
        Scenario::new("clear-completed-text", seeded(all, [Action::toggle(0)]))
            .with_group("Clear completed button")
            .with_description("The button reads \"Clear completed\""),
        Scenario::new(
            "clear-completed-removes",
            seeded(all, [Action::toggle(1), Action::ClearCompleted]),
        )
        .with_group("Clear completed button")
        .with_description("Completed items are removed, the rest keep their order"),
        Scenario::new(
            "clear-completed-hidden",
            seeded(all, [Action::toggle(0), Action::ClearCompleted]),
        )
        .with_group("Clear completed button")
        .with_description("The button disappears when nothing is completed"),
        // Persistence
        Scenario::new(
            "persist-across-reload",
            seeded(two, [Action::toggle(0), Action::Reload]),
        )
        .with_group("Persistence")
        .with_description("Items and completion survive a reload"),
        // Routing
        Scenario::new(
            "display-active",
            seeded(all, [Action::toggle(1), Action::filter(Filter::Active)]),
        )
        .with_group("Routing")
        .with_description("The Active filter hides completed items"),
        Scenario::new(
            "back-button",
            seeded(
                all,
                [
                    Action::toggle(1),
                    Action::filter(Filter::All),
                    Action::filter(Filter::Active),
                    Action::filter(Filter::Completed),
                    Action::GoBack,
                    Action::GoBack,
                ],
            ),
        )
        .with_group("Routing")
        .with_description("History back walks the filter routes in reverse"),
        Scenario::new(
            "display-completed",
            seeded(all, [Action::toggle(1), Action::filter(Filter::Completed)]),
        )
        .with_group("Routing")
        .with_description("The Completed filter shows only completed items"),
        Scenario::new(
            "display-all",
            seeded(
                all,
                [
                    Action::toggle(1),
                    Action::filter(Filter::Active),
                    Action::filter(Filter::Completed),
                    Action::filter(Filter::All),
                ],
            ),
        )
        .with_group("Routing")
        .with_description("Returning to All shows the full list in order"),
        Scenario::new(
            "highlight-filter",
            seeded(
                all,
                [
                    Action::filter(Filter::Active),
                    Action::filter(Filter::Completed),
                ],
            ),
        )
        .with_group("Routing")
        .with_description("The selected filter link is highlighted"),
    ]
}

/// Find a catalog scenario by name
#[must_use]
pub fn find(name: &str) -> Option<Scenario> {
    catalog().into_iter().find(|s| s.name == name)
}
