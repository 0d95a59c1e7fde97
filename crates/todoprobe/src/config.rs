//! Runner configuration.
//!
//! Loaded from YAML, with every field optional:
//!
//! ```yaml
//! base_url: http://localhost:8080/
//! storage_key: react-todos
//! stabilization:
//!   timeout_ms: 5000
//!   poll_interval_ms: 100
//!   settle_polls: 3
//! headless: true
//! jobs: 4
//! selectors:
//!   new_todo: "input.new-todo"
//! ```

use crate::adapter::Target;
use crate::model::Filter;
use crate::result::ConformanceResult;
use crate::simulated::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Hosted TodoMVC demo
pub const DEFAULT_BASE_URL: &str = "https://demo.playwright.dev/todomvc";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "TODO_BASE_URL";

/// Stabilization polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
    /// Total time to wait for the page to match, in milliseconds
    pub timeout_ms: u64,
    /// Interval between polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Consecutive identical observations that count as settled
    pub settle_polls: usize,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            poll_interval_ms: 100,
            settle_polls: 3,
        }
    }
}

impl StabilizationConfig {
    /// Create a config with the given timeout
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            poll_interval_ms: 100,
            settle_polls: 3,
        }
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the settle count
    #[must_use]
    pub const fn with_settle_polls(mut self, polls: usize) -> Self {
        self.settle_polls = polls;
        self
    }

    /// Timeout as a duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval as a duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// CSS selectors the Chromium adapter resolves targets with.
///
/// Defaults match the hosted React TodoMVC demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// New-todo input
    pub new_todo: String,
    /// Repeated todo item
    pub todo_item: String,
    /// Title label, relative to an item
    pub todo_title: String,
    /// Checkbox, relative to an item
    pub item_checkbox: String,
    /// Edit textbox, relative to an item
    pub edit_box: String,
    /// Footer counter
    pub counter: String,
    /// Toggle-all checkbox
    pub toggle_all: String,
    /// Clear-completed button
    pub clear_completed: String,
    /// Container of the filter links; links are matched by `href`
    pub filters: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            new_todo: r#"input[placeholder="What needs to be done?"]"#.to_string(),
            todo_item: r#"[data-testid="todo-item"]"#.to_string(),
            todo_title: r#"[data-testid="todo-title"]"#.to_string(),
            item_checkbox: "input.toggle".to_string(),
            edit_box: "input.edit".to_string(),
            counter: r#"[data-testid="todo-count"]"#.to_string(),
            toggle_all: "#toggle-all".to_string(),
            clear_completed: "button.clear-completed".to_string(),
            filters: "ul.filters".to_string(),
        }
    }
}

impl Selectors {
    /// Selector of the filter link for `filter`
    #[must_use]
    pub fn filter_link(&self, filter: Filter) -> String {
        format!(r#"{} a[href="{}"]"#, self.filters, filter.route())
    }

    /// Page-level selector for a target and the item index it addresses.
    ///
    /// Per-item targets resolve to the item selector and a child selector;
    /// the adapter picks the n-th item first.
    #[must_use]
    pub fn resolve(&self, target: Target) -> (String, Option<(usize, String)>) {
        match target {
            Target::NewTodo => (self.new_todo.clone(), None),
            Target::TodoItems => (self.todo_item.clone(), None),
            Target::TodoItem(n) => (self.todo_item.clone(), Some((n, String::new()))),
            Target::TodoTitle(n) => (self.todo_item.clone(), Some((n, self.todo_title.clone()))),
            Target::ItemCheckbox(n) => {
                (self.todo_item.clone(), Some((n, self.item_checkbox.clone())))
            }
            Target::EditBox(n) => (self.todo_item.clone(), Some((n, self.edit_box.clone()))),
            Target::Counter => (self.counter.clone(), None),
            Target::ToggleAll => (self.toggle_all.clone(), None),
            Target::ClearCompleted => (self.clear_completed.clone(), None),
            Target::FilterLink(filter) => (self.filter_link(filter), None),
        }
    }
}

/// Complete runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Application under test
    pub base_url: String,
    /// Storage key holding the serialized collection
    pub storage_key: String,
    /// Stabilization polling
    pub stabilization: StabilizationConfig,
    /// Navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Run the browser headless
    pub headless: bool,
    /// Disable the Chromium sandbox (containers)
    pub no_sandbox: bool,
    /// Path to the Chromium binary, auto-detected when absent
    pub chromium_path: Option<String>,
    /// Scenarios run concurrently
    pub jobs: usize,
    /// Element selectors
    pub selectors: Selectors,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            stabilization: StabilizationConfig::default(),
            navigation_timeout_ms: 30_000,
            headless: true,
            no_sandbox: false,
            chromium_path: None,
            jobs: 1,
            selectors: Selectors::default(),
        }
    }
}

impl RunnerConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> ConformanceResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file
    pub fn load(path: &Path) -> ConformanceResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Apply `TODO_BASE_URL` if set
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the storage key
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set stabilization polling
    #[must_use]
    pub const fn with_stabilization(mut self, stabilization: StabilizationConfig) -> Self {
        self.stabilization = stabilization;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set concurrent scenario count (at least one)
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Navigation timeout as a duration
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ConformanceResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.storage_key, "react-todos");
        assert_eq!(config.stabilization.timeout(), Duration::from_secs(5));
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RunnerConfig::from_yaml(
            "base_url: http://localhost:8080/\nstabilization:\n  timeout_ms: 250\n",
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/");
        assert_eq!(config.stabilization.timeout_ms, 250);
        assert_eq!(config.stabilization.poll_interval_ms, 100);
        assert_eq!(config.selectors, Selectors::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = RunnerConfig::default().with_jobs(4).with_headless(false);
        let parsed = RunnerConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_yaml_type_rejected() {
        assert!(RunnerConfig::from_yaml("jobs: many").is_err());
    }

    #[test]
    fn test_with_jobs_floor() {
        assert_eq!(RunnerConfig::default().with_jobs(0).jobs, 1);
    }

    #[test]
    fn test_stabilization_builders() {
        let s = StabilizationConfig::new(Duration::from_millis(300))
            .with_poll_interval(Duration::from_millis(10))
            .with_settle_polls(5);
        assert_eq!(s.timeout(), Duration::from_millis(300));
        assert_eq!(s.poll_interval(), Duration::from_millis(10));
        assert_eq!(s.settle_polls, 5);
    }

    #[test]
    fn test_resolve_per_item_targets() {
        let selectors = Selectors::default();
        let (item, child) = selectors.resolve(Target::TodoTitle(2));
        assert_eq!(item, selectors.todo_item);
        assert_eq!(child, Some((2, selectors.todo_title.clone())));
        assert_eq!(selectors.resolve(Target::Counter).1, None);
    }

    #[test]
    fn test_filter_link_selector() {
        let selectors = Selectors::default();
        assert_eq!(
            selectors.filter_link(Filter::Active),
            r##"ul.filters a[href="#/active"]"##
        );
    }
}
