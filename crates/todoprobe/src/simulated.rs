//! In-memory TodoMVC application for testing without a browser.
//!
//! `SimulatedApp` behaves like the React TodoMVC reference at the level the
//! adapter observes it: rendered items under the current hash route, an
//! editing mode per item, a footer hidden for empty lists, and a JSON
//! collection in a string-keyed storage map. [`Faults`] inject the kinds of
//! defects the conformance runner has to catch.

use crate::adapter::{
    HarnessAdapter, Key, Target, CLEAR_COMPLETED_TEXT, COMPLETED_CLASS, EDITING_CLASS,
    SELECTED_CLASS,
};
use crate::model::{counter_text, Filter, PersistedRecord, TodoItem};
use crate::result::{ConformanceError, ConformanceResult};
use crate::suite::AdapterFactory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Default storage key of the React TodoMVC reference
pub const DEFAULT_STORAGE_KEY: &str = "react-todos";

/// Defects to inject into the simulated application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// Commit edits without trimming
    pub untrimmed_edits: bool,
    /// Storage writes become readable only after this delay
    pub persist_delay: Duration,
    /// Never write to storage
    pub drop_persistence: bool,
    /// Counter shows one more than the active count
    pub counter_off_by_one: bool,
    /// Rendered titles change on every listing of the items and never settle
    pub flicker: bool,
    /// Clicking "Clear completed" removes nothing
    pub clear_completed_noop: bool,
    /// Element lookups fail in the driver instead of matching nothing
    pub lookup_errors: bool,
    /// The checkbox and title label stay visible while an item is edited
    pub editing_keeps_controls: bool,
    /// Text shown on the clear-completed button instead of the standard label
    pub clear_completed_label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTodo {
    id: String,
    title: String,
    completed: bool,
}

#[derive(Debug, Clone)]
struct StorageWrite {
    visible_at: Instant,
    value: String,
}

/// Simulated TodoMVC application implementing [`HarnessAdapter`].
#[derive(Debug)]
pub struct SimulatedApp {
    storage_key: String,
    faults: Faults,
    storage: HashMap<String, Vec<StorageWrite>>,
    url: Option<String>,
    /// Hash route, `None` until a filter link is followed from the bare URL
    route: Option<Filter>,
    history: Vec<Option<Filter>>,
    todos: Vec<TodoItem>,
    new_todo_value: String,
    /// Model index and buffer of the item being edited
    editing: Option<(usize, String)>,
    next_id: u64,
    /// Item listings served, drives `Faults::flicker`
    reads: AtomicUsize,
    /// Adapter calls, for verification in tests
    pub call_history: Vec<String>,
}

impl Default for SimulatedApp {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedApp {
    /// A conforming application
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            faults: Faults::default(),
            storage: HashMap::new(),
            url: None,
            route: None,
            history: Vec::new(),
            todos: Vec::new(),
            new_todo_value: String::new(),
            editing: None,
            next_id: 0,
            reads: AtomicUsize::new(0),
            call_history: Vec::new(),
        }
    }

    /// An application with injected defects
    #[must_use]
    pub fn with_faults(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::new()
        }
    }

    /// Set the storage key the application writes to
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Check if an adapter method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Application-side item state
    #[must_use]
    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    fn record(&mut self, call: String) {
        self.call_history.push(call);
    }

    fn require_loaded(&self) -> ConformanceResult<()> {
        if self.url.is_some() {
            Ok(())
        } else {
            Err(ConformanceError::driver("page not loaded"))
        }
    }

    /// Model indices of rendered items
    fn rendered(&self) -> Vec<usize> {
        self.todos
            .iter()
            .enumerate()
            .filter(|(_, item)| self.filter().matches(item))
            .map(|(index, _)| index)
            .collect()
    }

    fn rendered_index(&self, n: usize, target: Target) -> ConformanceResult<usize> {
        self.rendered()
            .get(n)
            .copied()
            .ok_or_else(|| not_found(target))
    }

    fn editing_index(&self, n: usize, target: Target) -> ConformanceResult<usize> {
        let index = self.rendered_index(n, target)?;
        match &self.editing {
            Some((editing, _)) if *editing == index => Ok(index),
            _ => Err(not_found(target)),
        }
    }

    /// Filter applied to the list; the bare URL shows everything
    fn filter(&self) -> Filter {
        self.route.unwrap_or(Filter::All)
    }

    fn footer_rendered(&self) -> bool {
        !self.todos.is_empty()
    }

    fn all_completed(&self) -> bool {
        self.todos.iter().all(|item| item.completed)
    }

    fn persist(&mut self) {
        if self.faults.drop_persistence {
            return;
        }
        let records: Vec<StoredTodo> = self
            .todos
            .iter()
            .enumerate()
            .map(|(n, item)| StoredTodo {
                id: format!("todo-{}", self.next_id + n as u64),
                title: item.text.clone(),
                completed: item.completed,
            })
            .collect();
        self.next_id += records.len() as u64;
        let value = serde_json::to_string(&records).unwrap_or_else(|_| "[]".to_string());
        self.storage
            .entry(self.storage_key.clone())
            .or_default()
            .push(StorageWrite {
                visible_at: Instant::now() + self.faults.persist_delay,
                value,
            });
    }

    /// Latest storage value readable now
    fn stored_value(&self, key: &str, now: Instant) -> Option<&str> {
        self.storage
            .get(key)?
            .iter()
            .rev()
            .find(|write| write.visible_at <= now)
            .map(|write| write.value.as_str())
    }

    /// Rebuild application state from storage, as a page load does
    fn load_from_storage(&mut self) {
        let latest = self
            .storage
            .get(&self.storage_key)
            .and_then(|writes| writes.last())
            .map(|write| write.value.clone());
        self.todos = latest
            .and_then(|value| serde_json::from_str::<Vec<StoredTodo>>(&value).ok())
            .unwrap_or_default()
            .into_iter()
            .map(|stored| TodoItem::new(stored.title).with_completed(stored.completed))
            .collect();
        self.new_todo_value.clear();
        self.editing = None;
    }

    fn commit_edit(&mut self) {
        if let Some((index, buffer)) = self.editing.take() {
            let text = if self.faults.untrimmed_edits {
                buffer.as_str()
            } else {
                buffer.trim()
            };
            if text.trim().is_empty() {
                let _ = self.todos.remove(index);
            } else {
                self.todos[index].text = text.to_string();
            }
            self.persist();
        }
    }
}

/// Creates a fresh [`SimulatedApp`] per scenario.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFactory {
    faults: Faults,
    storage_key: Option<String>,
}

impl SimulatedFactory {
    /// Factory for applications with the given defects
    #[must_use]
    pub fn new(faults: Faults) -> Self {
        Self {
            faults,
            storage_key: None,
        }
    }

    /// Set the storage key the applications write to
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }
}

#[async_trait]
impl AdapterFactory for SimulatedFactory {
    type Adapter = SimulatedApp;

    async fn create(&self) -> ConformanceResult<SimulatedApp> {
        let app = SimulatedApp::with_faults(self.faults.clone());
        Ok(match &self.storage_key {
            Some(key) => app.with_storage_key(key.clone()),
            None => app,
        })
    }
}

fn not_found(target: Target) -> ConformanceError {
    ConformanceError::driver(format!("element not found: {target}"))
}

fn route_from_url(url: &str) -> Option<Filter> {
    match url.split_once('#').map(|(_, fragment)| fragment)? {
        "/" => Some(Filter::All),
        "/active" => Some(Filter::Active),
        "/completed" => Some(Filter::Completed),
        _ => None,
    }
}

#[async_trait]
impl HarnessAdapter for SimulatedApp {
    async fn navigate(&mut self, url: &str) -> ConformanceResult<()> {
        self.record(format!("navigate:{url}"));
        self.url = Some(url.to_string());
        self.route = route_from_url(url);
        self.history.clear();
        self.load_from_storage();
        Ok(())
    }

    async fn reload(&mut self) -> ConformanceResult<()> {
        self.record("reload".to_string());
        self.require_loaded()?;
        self.load_from_storage();
        Ok(())
    }

    async fn go_back(&mut self) -> ConformanceResult<()> {
        self.record("go_back".to_string());
        self.require_loaded()?;
        self.route = self
            .history
            .pop()
            .ok_or_else(|| ConformanceError::driver("no history entry to go back to"))?;
        self.editing = None;
        Ok(())
    }

    async fn fill_text(&mut self, target: Target, text: &str) -> ConformanceResult<()> {
        self.record(format!("fill_text:{target}:{text}"));
        self.require_loaded()?;
        match target {
            Target::NewTodo => {
                // focusing the input blurs an open edit box
                self.commit_edit();
                self.new_todo_value = text.to_string();
            }
            Target::EditBox(n) => {
                let index = self.editing_index(n, target)?;
                self.editing = Some((index, text.to_string()));
            }
            _ => {
                return Err(ConformanceError::driver(format!(
                    "{target} is not a text input"
                )))
            }
        }
        Ok(())
    }

    async fn press_key(&mut self, target: Target, key: Key) -> ConformanceResult<()> {
        self.record(format!("press_key:{target}:{}", key.name()));
        self.require_loaded()?;
        match (target, key) {
            (Target::NewTodo, Key::Enter) => {
                let text = self.new_todo_value.trim().to_string();
                if !text.is_empty() {
                    self.todos.push(TodoItem::new(text));
                    self.new_todo_value.clear();
                    self.persist();
                }
            }
            (Target::NewTodo, Key::Backspace) => {
                let _ = self.new_todo_value.pop();
            }
            (Target::EditBox(n), Key::Enter) => {
                let _ = self.editing_index(n, target)?;
                self.commit_edit();
            }
            (Target::EditBox(n), Key::Escape) => {
                let _ = self.editing_index(n, target)?;
                self.editing = None;
            }
            (Target::EditBox(n), Key::Backspace) => {
                let _ = self.editing_index(n, target)?;
                if let Some((_, buffer)) = self.editing.as_mut() {
                    let _ = buffer.pop();
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn click(&mut self, target: Target) -> ConformanceResult<()> {
        self.record(format!("click:{target}"));
        self.require_loaded()?;
        if let Target::ItemCheckbox(n) = target {
            let index = self.rendered_index(n, target)?;
            if matches!(self.editing, Some((editing, _)) if editing == index) {
                return Err(ConformanceError::driver(format!("{target} is hidden")));
            }
        }
        self.commit_edit();
        match target {
            Target::ItemCheckbox(n) => {
                let index = self.rendered_index(n, target)?;
                self.todos[index].completed = !self.todos[index].completed;
                self.persist();
            }
            Target::ToggleAll => {
                if self.todos.is_empty() {
                    return Err(not_found(target));
                }
                let completed = !self.all_completed();
                for item in &mut self.todos {
                    item.completed = completed;
                }
                self.persist();
            }
            Target::ClearCompleted => {
                if !self.todos.iter().any(|item| item.completed) {
                    return Err(not_found(target));
                }
                if !self.faults.clear_completed_noop {
                    self.todos.retain(|item| !item.completed);
                    self.persist();
                }
            }
            Target::FilterLink(filter) => {
                if !self.footer_rendered() {
                    return Err(not_found(target));
                }
                if self.route != Some(filter) {
                    self.history.push(self.route);
                    self.route = Some(filter);
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn double_click(&mut self, target: Target) -> ConformanceResult<()> {
        self.record(format!("double_click:{target}"));
        self.require_loaded()?;
        match target {
            Target::TodoItem(n) | Target::TodoTitle(n) => {
                self.commit_edit();
                let index = self.rendered_index(n, target)?;
                self.editing = Some((index, self.todos[index].text.clone()));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn dispatch_blur(&mut self, target: Target) -> ConformanceResult<()> {
        self.record(format!("dispatch_blur:{target}"));
        self.require_loaded()?;
        if let Target::EditBox(n) = target {
            let _ = self.editing_index(n, target)?;
            self.commit_edit();
        }
        Ok(())
    }

    async fn read_visible_text(&self, target: Target) -> ConformanceResult<String> {
        self.require_loaded()?;
        match target {
            Target::TodoTitle(n) | Target::TodoItem(n) => {
                let index = self.rendered_index(n, target)?;
                let text = self.todos[index].text.clone();
                if self.faults.flicker {
                    let reads = self.reads.load(Ordering::Relaxed);
                    return Ok(format!("{text}{}", ".".repeat(1 + reads % 2)));
                }
                Ok(text)
            }
            Target::Counter if self.footer_rendered() => {
                let active = self.todos.iter().filter(|item| !item.completed).count();
                let shown = if self.faults.counter_off_by_one {
                    active + 1
                } else {
                    active
                };
                Ok(counter_text(shown))
            }
            Target::EditBox(n) => {
                let _ = self.editing_index(n, target)?;
                Ok(String::new())
            }
            Target::NewTodo => Ok(String::new()),
            Target::ClearCompleted if self.todos.iter().any(|item| item.completed) => {
                Ok(self
                    .faults
                    .clear_completed_label
                    .clone()
                    .unwrap_or_else(|| CLEAR_COMPLETED_TEXT.to_string()))
            }
            Target::FilterLink(filter) if self.footer_rendered() => {
                Ok(filter.label().to_string())
            }
            _ => Err(not_found(target)),
        }
    }

    async fn read_attribute(
        &self,
        target: Target,
        name: &str,
    ) -> ConformanceResult<Option<String>> {
        self.require_loaded()?;
        match (target, name) {
            (Target::TodoItem(n), "class") => {
                let index = self.rendered_index(n, target)?;
                let mut classes = Vec::new();
                if self.todos[index].completed {
                    classes.push(COMPLETED_CLASS);
                }
                if matches!(self.editing, Some((editing, _)) if editing == index) {
                    classes.push(EDITING_CLASS);
                }
                Ok(Some(classes.join(" ")))
            }
            (Target::FilterLink(filter), "class") => {
                if !self.footer_rendered() {
                    return Err(not_found(target));
                }
                Ok((filter == self.filter()).then(|| SELECTED_CLASS.to_string()))
            }
            (Target::FilterLink(filter), "href") if self.footer_rendered() => {
                Ok(Some(filter.route().to_string()))
            }
            (Target::NewTodo, "placeholder") => Ok(Some("What needs to be done?".to_string())),
            (Target::EditBox(n), "value") => {
                let _ = self.editing_index(n, target)?;
                Ok(self.editing.as_ref().map(|(_, buffer)| buffer.clone()))
            }
            (Target::NewTodo, "value") => Ok(Some(self.new_todo_value.clone())),
            _ => {
                if self.count_matches(target).await? == 0 {
                    Err(not_found(target))
                } else {
                    Ok(None)
                }
            }
        }
    }

    async fn count_matches(&self, target: Target) -> ConformanceResult<usize> {
        self.require_loaded()?;
        if self.faults.lookup_errors {
            return Err(ConformanceError::driver(format!("lookup of {target} failed")));
        }
        let rendered = self.rendered();
        let count = match target {
            Target::NewTodo => 1,
            Target::TodoItems => {
                // one listing per observation pass
                let _ = self.reads.fetch_add(1, Ordering::Relaxed);
                rendered.len()
            }
            Target::TodoItem(n) | Target::TodoTitle(n) | Target::ItemCheckbox(n) => {
                usize::from(n < rendered.len())
            }
            Target::EditBox(n) => usize::from(self.editing_index(n, target).is_ok()),
            Target::Counter | Target::FilterLink(_) => usize::from(self.footer_rendered()),
            Target::ToggleAll => usize::from(!self.todos.is_empty()),
            Target::ClearCompleted => usize::from(self.todos.iter().any(|item| item.completed)),
        };
        Ok(count)
    }

    async fn is_visible(&self, target: Target) -> ConformanceResult<bool> {
        if self.count_matches(target).await? == 0 {
            return Ok(false);
        }
        let visible = match target {
            Target::ItemCheckbox(n) | Target::TodoTitle(n) => {
                let index = self.rendered_index(n, target)?;
                self.faults.editing_keeps_controls
                    || !matches!(self.editing, Some((editing, _)) if editing == index)
            }
            _ => true,
        };
        Ok(visible)
    }

    async fn is_checked(&self, target: Target) -> ConformanceResult<bool> {
        self.require_loaded()?;
        match target {
            Target::ToggleAll => Ok(!self.todos.is_empty() && self.all_completed()),
            Target::ItemCheckbox(n) => {
                let index = self.rendered_index(n, target)?;
                Ok(self.todos[index].completed)
            }
            _ => Ok(false),
        }
    }

    async fn read_persisted_snapshot(
        &self,
        key: &str,
    ) -> ConformanceResult<Vec<PersistedRecord>> {
        self.require_loaded()?;
        match self.stored_value(key, Instant::now()) {
            Some(value) => Ok(serde_json::from_str(value)?),
            None => Ok(Vec::new()),
        }
    }
}
