//! Conformance runner: drives an adapter through a scenario and checks the
//! page against the oracle after every action.
//!
//! Per action:
//! 1. the oracle computes the expected projection (bad indices fail fast)
//! 2. the adapter performs the action
//! 3. the page is polled until it matches, settles on something else, or
//!    the stabilization timeout elapses

use crate::action::Action;
use crate::adapter::{observe, perform, FieldMismatch, HarnessAdapter, Observation};
use crate::config::{RunnerConfig, StabilizationConfig};
use crate::oracle::{Oracle, Projection};
use crate::result::{ConformanceError, ConformanceResult};
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of one scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started
    Idle,
    /// Executing actions
    Running,
    /// Every comparison succeeded
    Passed,
    /// Stopped at the first failure
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a scenario failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An action addressed an item that is not visible
    IndexOutOfRange,
    /// The page settled on a state other than the expected one
    AssertionMismatch,
    /// The page was still changing when the timeout elapsed
    StabilizationTimeout,
    /// A driver call failed
    DriverError,
    /// The run was aborted between actions
    Aborted,
    /// The scenario itself is invalid
    Scenario,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::IndexOutOfRange => "index out of range",
            Self::AssertionMismatch => "assertion mismatch",
            Self::StabilizationTimeout => "stabilization timeout",
            Self::DriverError => "driver error",
            Self::Aborted => "aborted",
            Self::Scenario => "invalid scenario",
        };
        f.write_str(s)
    }
}

impl From<&ConformanceError> for FailureKind {
    fn from(err: &ConformanceError) -> Self {
        match err {
            ConformanceError::IndexOutOfRange { .. } => Self::IndexOutOfRange,
            ConformanceError::StabilizationTimeout { .. } => Self::StabilizationTimeout,
            ConformanceError::AssertionMismatch { .. } => Self::AssertionMismatch,
            ConformanceError::Scenario { .. }
            | ConformanceError::Json(_)
            | ConformanceError::Yaml(_) => Self::Scenario,
            ConformanceError::DriverError { .. }
            | ConformanceError::BrowserLaunchError { .. }
            | ConformanceError::NavigationError { .. }
            | ConformanceError::Io(_) => Self::DriverError,
        }
    }
}

/// Structured description of the first failure in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioFailure {
    /// Failing action, `None` during setup (adapter creation, initial page load)
    pub action_index: Option<usize>,
    /// The failing action, rendered
    pub action: Option<String>,
    /// Failure kind
    pub kind: FailureKind,
    /// One-line explanation
    pub message: String,
    /// Fields that differed at the last poll
    pub mismatches: Vec<FieldMismatch>,
}

impl ScenarioFailure {
    fn from_error(step: Option<(usize, &Action)>, err: &ConformanceError) -> Self {
        Self {
            action_index: step.map(|(index, _)| index),
            action: step.map(|(_, action)| action.to_string()),
            kind: FailureKind::from(err),
            message: err.to_string(),
            mismatches: Vec::new(),
        }
    }
}

impl fmt::Display for ScenarioFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.action_index, &self.action) {
            (Some(index), Some(action)) => write!(f, "action #{index} ({action}): ")?,
            _ => f.write_str("setup: ")?,
        }
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of one verified action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Action index
    pub index: usize,
    /// The action, rendered
    pub action: String,
    /// Polls until the page matched
    pub polls: usize,
    /// Wall time including polling, in milliseconds
    pub duration_ms: u64,
}

/// Result of running one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Feature group
    pub group: String,
    /// Final state, `Passed` or `Failed`
    pub state: RunState,
    /// Actions verified before the run ended
    pub steps: Vec<StepReport>,
    /// First failure, if any
    pub failure: Option<ScenarioFailure>,
    /// Total wall time in milliseconds
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Whether every comparison succeeded
    #[must_use]
    pub fn passed(&self) -> bool {
        self.state == RunState::Passed
    }

    /// Report for a scenario whose adapter could not be created
    #[must_use]
    pub fn not_started(scenario: &Scenario, err: &ConformanceError) -> Self {
        Self::failed_early(scenario, ScenarioFailure::from_error(None, err))
    }

    /// Report for a scenario skipped because the run was aborted
    #[must_use]
    pub fn aborted(scenario: &Scenario) -> Self {
        Self::failed_early(
            scenario,
            ScenarioFailure {
                action_index: None,
                action: None,
                kind: FailureKind::Aborted,
                message: "run aborted before the scenario started".to_string(),
                mismatches: Vec::new(),
            },
        )
    }

    fn failed_early(scenario: &Scenario, failure: ScenarioFailure) -> Self {
        Self {
            name: scenario.name.clone(),
            group: scenario.group.clone(),
            state: RunState::Failed,
            steps: Vec::new(),
            failure: Some(failure),
            duration_ms: 0,
        }
    }
}

/// Result of polling the page for one expected observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The page matched
    Matched {
        /// Polls taken
        polls: usize,
    },
    /// The page settled on a different state
    Mismatch {
        /// Last observation
        observed: Observation,
        /// Polls taken
        polls: usize,
    },
    /// The page kept changing until the timeout
    Unstable {
        /// Last observation
        observed: Observation,
        /// Polls taken
        polls: usize,
    },
}

/// Poll `observe` at a fixed interval until the page matches `expected`.
///
/// At the timeout the page counts as settled if the last
/// `settle_polls` observations were identical.
pub async fn stabilize<A: HarnessAdapter + ?Sized>(
    adapter: &A,
    expected: &Observation,
    storage_key: &str,
    config: &StabilizationConfig,
) -> ConformanceResult<PollOutcome> {
    let deadline = Instant::now() + config.timeout();
    let mut polls = 0;
    let mut streak = 0;
    let mut last: Option<Observation> = None;
    loop {
        let observed = observe(adapter, storage_key).await?;
        polls += 1;
        if observed == *expected {
            return Ok(PollOutcome::Matched { polls });
        }
        streak = if last.as_ref() == Some(&observed) {
            streak + 1
        } else {
            1
        };

        if Instant::now() >= deadline {
            return Ok(if streak >= config.settle_polls.max(1) {
                PollOutcome::Mismatch { observed, polls }
            } else {
                PollOutcome::Unstable { observed, polls }
            });
        }
        last = Some(observed);
        tokio::time::sleep(config.poll_interval()).await;
    }
}

/// Runs scenarios against one adapter.
#[derive(Debug)]
pub struct ConformanceRunner<A> {
    adapter: A,
    config: RunnerConfig,
    state: RunState,
    abort: Arc<AtomicBool>,
}

impl<A: HarnessAdapter> ConformanceRunner<A> {
    /// Create a runner
    pub fn new(adapter: A, config: RunnerConfig) -> Self {
        Self {
            adapter,
            config,
            state: RunState::Idle,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an abort flag, checked between actions
    #[must_use]
    pub fn with_abort(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    /// Handle that aborts the run when set
    #[must_use]
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// The adapter
    #[must_use]
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Consume the runner, returning the adapter
    pub fn into_adapter(self) -> A {
        self.adapter
    }

    /// Run one scenario from a freshly loaded, empty application
    pub async fn run(&mut self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        self.state = RunState::Running;
        info!(scenario = %scenario.name, actions = scenario.actions.len(), "Scenario started");

        let mut steps = Vec::with_capacity(scenario.actions.len());
        let failure = self.execute(scenario, &mut steps).await.err();

        self.state = if failure.is_some() {
            RunState::Failed
        } else {
            RunState::Passed
        };
        match &failure {
            Some(failure) => warn!(scenario = %scenario.name, %failure, "Scenario failed"),
            None => info!(scenario = %scenario.name, "Scenario passed"),
        }

        ScenarioReport {
            name: scenario.name.clone(),
            group: scenario.group.clone(),
            state: self.state,
            steps,
            failure,
            duration_ms: elapsed_ms(started),
        }
    }

    async fn execute(
        &mut self,
        scenario: &Scenario,
        steps: &mut Vec<StepReport>,
    ) -> Result<(), ScenarioFailure> {
        let mut oracle = Oracle::new();

        self.adapter
            .navigate(&self.config.base_url)
            .await
            .map_err(|e| ScenarioFailure::from_error(None, &e))?;
        let _ = self.verify(None, &oracle.projection()).await?;
        debug!(url = %self.config.base_url, "Initial state verified");

        for (index, action) in scenario.actions.iter().enumerate() {
            let step = Some((index, action));
            if self.abort.load(Ordering::SeqCst) {
                return Err(ScenarioFailure {
                    action_index: Some(index),
                    action: Some(action.to_string()),
                    kind: FailureKind::Aborted,
                    message: "run aborted before this action".to_string(),
                    mismatches: Vec::new(),
                });
            }

            let started = Instant::now();
            let before = oracle.projection();
            let expected = oracle
                .apply(action)
                .map_err(|e| ScenarioFailure::from_error(step, &e))?;
            debug!(index, %action, "Performing action");
            perform(&mut self.adapter, action, &before)
                .await
                .map_err(|e| ScenarioFailure::from_error(step, &e))?;
            let polls = self.verify(step, &expected).await?;
            debug!(index, polls, "Action verified");

            steps.push(StepReport {
                index,
                action: action.to_string(),
                polls,
                duration_ms: elapsed_ms(started),
            });
        }
        Ok(())
    }

    async fn verify(
        &self,
        step: Option<(usize, &Action)>,
        projection: &Projection,
    ) -> Result<usize, ScenarioFailure> {
        let expected = Observation::expected_from(projection);
        let stabilization = &self.config.stabilization;
        let outcome = stabilize(
            &self.adapter,
            &expected,
            &self.config.storage_key,
            stabilization,
        )
        .await
        .map_err(|e| ScenarioFailure::from_error(step, &e))?;

        let (err, observed) = match outcome {
            PollOutcome::Matched { polls } => return Ok(polls),
            PollOutcome::Mismatch { observed, polls } => {
                debug!(polls, "Page settled on a different state");
                let mismatches = expected.diff(&observed);
                let err = mismatches.first().map_or_else(
                    || ConformanceError::scenario("observation differs in no field"),
                    |m| ConformanceError::AssertionMismatch {
                        field: m.field.clone(),
                        expected: m.expected.clone(),
                        observed: m.observed.clone(),
                    },
                );
                (err, observed)
            }
            PollOutcome::Unstable { observed, polls } => {
                debug!(polls, "Page still changing at timeout");
                let err = ConformanceError::StabilizationTimeout {
                    ms: stabilization.timeout_ms,
                };
                (err, observed)
            }
        };

        let mut failure = ScenarioFailure::from_error(step, &err);
        failure.mismatches = expected.diff(&observed);
        Err(failure)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Filter;
    use crate::scenario::{catalog, find, TODO_ITEMS};
    use crate::simulated::{Faults, SimulatedApp};
    use std::time::Duration;

    fn fast_config() -> RunnerConfig {
        RunnerConfig::default()
            .with_base_url("http://todo.test/")
            .with_stabilization(
                StabilizationConfig::new(Duration::from_millis(150))
                    .with_poll_interval(Duration::from_millis(5)),
            )
    }

    fn seeded_actions(rest: impl IntoIterator<Item = Action>) -> Vec<Action> {
        TODO_ITEMS.iter().map(|text| Action::add(*text)).chain(rest).collect()
    }

    async fn run_with(faults: Faults, scenario: &Scenario) -> ScenarioReport {
        let mut runner = ConformanceRunner::new(SimulatedApp::with_faults(faults), fast_config());
        runner.run(scenario).await
    }

    #[tokio::test]
    async fn test_catalog_passes_against_conforming_app() {
        for scenario in catalog() {
            let report = run_with(Faults::default(), &scenario).await;
            assert!(
                report.passed(),
                "{}: {:?}",
                scenario.name,
                report.failure
            );
            assert_eq!(report.steps.len(), scenario.actions.len());
        }
    }

    #[tokio::test]
    async fn test_runner_states() {
        let mut runner = ConformanceRunner::new(SimulatedApp::new(), fast_config());
        assert_eq!(runner.state(), RunState::Idle);
        let report = runner.run(&find("counter").unwrap()).await;
        assert_eq!(runner.state(), RunState::Passed);
        assert_eq!(report.state, RunState::Passed);
        assert!(runner.adapter().was_called("navigate:http://todo.test/"));
    }

    #[tokio::test]
    async fn test_mark_all_active_from_mixed_list() {
        let scenario = Scenario::new(
            "mixed-to-active",
            vec![
                Action::add("a"),
                Action::add("b"),
                Action::toggle(0),
                Action::toggle_all(false),
            ],
        );
        let report = run_with(Faults::default(), &scenario).await;
        assert!(report.passed(), "{:?}", report.failure);
    }

    #[tokio::test]
    async fn test_back_from_first_filter_returns_to_bare_url() {
        let scenario = Scenario::new(
            "back-to-start",
            vec![
                Action::add("a"),
                Action::filter(Filter::All),
                Action::filter(Filter::Active),
                Action::GoBack,
                Action::GoBack,
            ],
        );
        assert!(Oracle::new().run(&scenario.actions).is_ok());
        let report = run_with(Faults::default(), &scenario).await;
        assert!(report.passed(), "{:?}", report.failure);
        assert_eq!(report.steps.len(), 5);
    }

    #[tokio::test]
    async fn test_untrimmed_edit_is_a_mismatch() {
        let faults = Faults {
            untrimmed_edits: true,
            ..Faults::default()
        };
        let report = run_with(faults, &find("trim-edit").unwrap()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::AssertionMismatch);
        assert_eq!(failure.action_index, Some(3));
        let fields: Vec<_> = failure.mismatches.iter().map(|m| m.field.as_str()).collect();
        assert!(fields.contains(&"titles"));
        assert!(fields.contains(&"persisted"));
    }

    #[tokio::test]
    async fn test_slow_persistence_within_timeout_passes() {
        let faults = Faults {
            persist_delay: Duration::from_millis(30),
            ..Faults::default()
        };
        let report = run_with(faults, &find("add-items").unwrap()).await;
        assert!(report.passed(), "{:?}", report.failure);
        assert!(report.steps.iter().any(|s| s.polls > 1));
    }

    #[tokio::test]
    async fn test_lost_writes_fail_on_persisted_field() {
        let faults = Faults {
            drop_persistence: true,
            ..Faults::default()
        };
        let report = run_with(faults, &find("add-clears-input").unwrap()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::AssertionMismatch);
        assert_eq!(failure.mismatches.len(), 1);
        assert_eq!(failure.mismatches[0].field, "persisted");
    }

    #[tokio::test]
    async fn test_counter_defect_detected() {
        let faults = Faults {
            counter_off_by_one: true,
            ..Faults::default()
        };
        let report = run_with(faults, &find("counter").unwrap()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.action_index, Some(0));
        assert_eq!(failure.mismatches[0].field, "counter");
        assert!(failure.mismatches[0].observed.contains("2 items left"));
    }

    #[tokio::test]
    async fn test_flicker_is_a_timeout() {
        let faults = Faults {
            flicker: true,
            ..Faults::default()
        };
        let report = run_with(faults, &find("add-items").unwrap()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::StabilizationTimeout);
        assert_eq!(failure.action_index, Some(0));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_a_driver_error() {
        let faults = Faults {
            lookup_errors: true,
            ..Faults::default()
        };
        let report = run_with(faults, &find("add-items").unwrap()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::DriverError);
        assert_eq!(failure.action_index, None);
        assert!(failure.message.contains("lookup of todo items failed"));
        assert!(failure.mismatches.is_empty());
    }

    #[tokio::test]
    async fn test_edit_mode_hides_item_controls() {
        let report = run_with(Faults::default(), &find("edit-hides-controls").unwrap()).await;
        assert!(report.passed(), "{:?}", report.failure);
        let scenario = Scenario::new(
            "edit-then-toggle-other",
            seeded_actions([Action::begin_edit(1), Action::toggle(0), Action::ClearCompleted]),
        );
        let report = run_with(Faults::default(), &scenario).await;
        assert!(report.passed(), "{:?}", report.failure);
    }

    #[tokio::test]
    async fn test_edit_mode_without_hidden_controls_is_a_mismatch() {
        let faults = Faults {
            editing_keeps_controls: true,
            ..Faults::default()
        };
        let report = run_with(faults, &find("edit-hides-controls").unwrap()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::AssertionMismatch);
        assert_eq!(failure.mismatches[0].field, "controls_visible");
    }

    #[tokio::test]
    async fn test_clear_completed_label_checked() {
        let faults = Faults {
            clear_completed_label: Some("Clear".to_string()),
            ..Faults::default()
        };
        let report = run_with(faults, &find("clear-completed-text").unwrap()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.mismatches[0].field, "clear_completed_text");
        assert!(failure.mismatches[0].observed.contains("\"Clear\""));
    }

    #[tokio::test]
    async fn test_clear_completed_defect_detected() {
        let faults = Faults {
            clear_completed_noop: true,
            ..Faults::default()
        };
        let report = run_with(faults, &find("clear-completed-removes").unwrap()).await;
        assert_eq!(report.failure.unwrap().kind, FailureKind::AssertionMismatch);
    }

    #[tokio::test]
    async fn test_index_out_of_range_fails_fast() {
        let scenario = Scenario::new("bad", vec![Action::add(TODO_ITEMS[0]), Action::toggle(5)]);
        let mut runner = ConformanceRunner::new(SimulatedApp::new(), fast_config());
        let report = runner.run(&scenario).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::IndexOutOfRange);
        assert_eq!(failure.action_index, Some(1));
        assert!(!runner.adapter().was_called("click"));
    }

    #[tokio::test]
    async fn test_index_addresses_visible_list() {
        let scenario = Scenario::new(
            "filtered-toggle",
            vec![
                Action::add("a"),
                Action::add("b"),
                Action::toggle(0),
                Action::filter(Filter::Active),
                Action::toggle(0),
            ],
        );
        let mut runner = ConformanceRunner::new(SimulatedApp::new(), fast_config());
        let report = runner.run(&scenario).await;
        assert!(report.passed(), "{:?}", report.failure);
        assert!(runner.adapter().todos().iter().all(|i| i.completed));
    }

    #[tokio::test]
    async fn test_abort_between_actions() {
        let mut runner = ConformanceRunner::new(SimulatedApp::new(), fast_config());
        runner.abort_handle().store(true, Ordering::SeqCst);
        let report = runner.run(&find("add-items").unwrap()).await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::Aborted);
        assert_eq!(failure.action_index, Some(0));
        assert!(report.steps.is_empty());
        assert_eq!(runner.state(), RunState::Failed);
    }

    #[tokio::test]
    async fn test_go_back_without_history_is_scenario_error() {
        let scenario = Scenario::new("back", vec![Action::add("a"), Action::GoBack]);
        let report = run_with(Faults::default(), &scenario).await;
        assert_eq!(report.failure.unwrap().kind, FailureKind::Scenario);
    }

    #[tokio::test]
    async fn test_stabilize_matches_immediately() {
        let mut app = SimulatedApp::new();
        app.navigate("http://todo.test/").await.unwrap();
        let expected = Observation::expected_from(&Oracle::new().projection());
        let outcome = stabilize(&app, &expected, "react-todos", &StabilizationConfig::default())
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Matched { polls: 1 });
    }

    #[test]
    fn test_failure_display() {
        let failure = ScenarioFailure::from_error(
            Some((2, &Action::toggle(7))),
            &ConformanceError::IndexOutOfRange { index: 7, len: 3 },
        );
        assert_eq!(
            failure.to_string(),
            "action #2 (toggle #7): index out of range: Index 7 out of range for a list of 3 visible items"
        );
    }

    #[test]
    fn test_failure_kind_from_error() {
        assert_eq!(
            FailureKind::from(&ConformanceError::driver("x")),
            FailureKind::DriverError
        );
        assert_eq!(
            FailureKind::from(&ConformanceError::StabilizationTimeout { ms: 1 }),
            FailureKind::StabilizationTimeout
        );
    }
}
