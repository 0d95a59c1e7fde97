//! Suite runner: many scenarios, `jobs` at a time, one fresh adapter each.

use crate::adapter::HarnessAdapter;
use crate::config::RunnerConfig;
use crate::report::SuiteReport;
use crate::result::{ConformanceError, ConformanceResult};
use crate::runner::{ConformanceRunner, ScenarioReport};
use crate::scenario::Scenario;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Creates one adapter per scenario.
#[async_trait]
pub trait AdapterFactory: Send + Sync + 'static {
    /// Adapter type produced
    type Adapter: HarnessAdapter + 'static;

    /// Create a fresh adapter with its own page and storage
    async fn create(&self) -> ConformanceResult<Self::Adapter>;
}

/// Callback invoked as each scenario finishes
pub type ProgressFn = Arc<dyn Fn(&ScenarioReport) + Send + Sync>;

/// Runs scenarios concurrently.
pub struct SuiteRunner<F> {
    factory: Arc<F>,
    config: RunnerConfig,
    abort: Arc<AtomicBool>,
    progress: Option<ProgressFn>,
}

impl<F> fmt::Debug for SuiteRunner<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("config", &self.config)
            .field("abort", &self.abort)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl<F: AdapterFactory> SuiteRunner<F> {
    /// Create a suite runner
    pub fn new(factory: F, config: RunnerConfig) -> Self {
        Self {
            factory: Arc::new(factory),
            config,
            abort: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Report each scenario as it finishes
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The adapter factory
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Handle that aborts every running scenario between actions when set
    #[must_use]
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Run every scenario; reports come back in input order
    pub async fn run(&self, scenarios: Vec<Scenario>) -> SuiteReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let total = scenarios.len();
        let jobs = self.config.jobs.clamp(1, total.max(1));
        info!(scenarios = total, jobs, "Suite started");

        let results: Arc<Mutex<Vec<Option<ScenarioReport>>>> =
            Arc::new(Mutex::new(vec![None; total]));
        let queue = Arc::new(Mutex::new(
            scenarios.iter().cloned().enumerate().collect::<VecDeque<_>>(),
        ));
        let mut handles = Vec::with_capacity(jobs);
        for worker in 0..jobs {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let factory = Arc::clone(&self.factory);
            let config = self.config.clone();
            let abort = Arc::clone(&self.abort);
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, scenario)) = next else { break };
                    debug!(worker, scenario = %scenario.name, "Picked scenario");
                    let report =
                        run_one(factory.as_ref(), &config, Arc::clone(&abort), &scenario).await;
                    if let Some(progress) = &progress {
                        progress(&report);
                    }
                    results.lock().await[index] = Some(report);
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Suite worker panicked");
            }
        }

        let mut results = results.lock().await;
        let reports = scenarios
            .iter()
            .zip(results.iter_mut())
            .map(|(scenario, slot)| {
                slot.take().unwrap_or_else(|| {
                    ScenarioReport::not_started(
                        scenario,
                        &ConformanceError::driver("suite worker panicked while running the scenario"),
                    )
                })
            })
            .collect();

        let report = SuiteReport {
            started_at,
            base_url: self.config.base_url.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            scenarios: reports,
        };
        info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            "Suite finished"
        );
        report
    }
}

async fn run_one<F: AdapterFactory>(
    factory: &F,
    config: &RunnerConfig,
    abort: Arc<AtomicBool>,
    scenario: &Scenario,
) -> ScenarioReport {
    if abort.load(Ordering::SeqCst) {
        return ScenarioReport::aborted(scenario);
    }
    match factory.create().await {
        Ok(adapter) => {
            let mut runner = ConformanceRunner::new(adapter, config.clone()).with_abort(abort);
            runner.run(scenario).await
        }
        Err(e) => ScenarioReport::not_started(scenario, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StabilizationConfig;
    use crate::runner::FailureKind;
    use crate::scenario::{catalog, find};
    use crate::simulated::{Faults, SimulatedFactory};
    use crate::ConformanceError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn config(jobs: usize) -> RunnerConfig {
        RunnerConfig::default()
            .with_base_url("http://todo.test/")
            .with_jobs(jobs)
            .with_stabilization(
                StabilizationConfig::new(Duration::from_millis(100))
                    .with_poll_interval(Duration::from_millis(5)),
            )
    }

    struct FailingFactory;

    #[async_trait]
    impl AdapterFactory for FailingFactory {
        type Adapter = crate::simulated::SimulatedApp;

        async fn create(&self) -> ConformanceResult<Self::Adapter> {
            Err(ConformanceError::BrowserLaunchError {
                message: "no chromium".to_string(),
            })
        }
    }

    /// Panics on its first `create`, then behaves like the simulated factory
    struct CrashOnceFactory {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AdapterFactory for CrashOnceFactory {
        type Adapter = crate::simulated::SimulatedApp;

        async fn create(&self) -> ConformanceResult<Self::Adapter> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("adapter crashed");
            }
            SimulatedFactory::default().create().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_catalog_concurrently_in_order() {
        let scenarios = catalog();
        let names: Vec<_> = scenarios.iter().map(|s| s.name.clone()).collect();
        let suite = SuiteRunner::new(SimulatedFactory::default(), config(4));
        let report = suite.run(scenarios).await;
        let got: Vec<_> = report.scenarios.iter().map(|s| s.name.clone()).collect();
        assert_eq!(got, names);
        assert_eq!(report.failed_count(), 0);
        assert!(report.all_passed());
    }

    #[tokio::test]
    async fn test_faulty_app_fails_some() {
        let factory = SimulatedFactory::new(Faults {
            untrimmed_edits: true,
            ..Faults::default()
        });
        let suite = SuiteRunner::new(factory, config(2));
        let report = suite
            .run(vec![find("trim-edit").unwrap(), find("counter").unwrap()])
            .await;
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.scenarios[0].passed());
    }

    #[tokio::test]
    async fn test_progress_called_per_scenario() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let suite = SuiteRunner::new(SimulatedFactory::default(), config(3)).with_progress(
            Arc::new(move |_report: &ScenarioReport| {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let report = suite.run(catalog().into_iter().take(5).collect()).await;
        assert_eq!(report.scenarios.len(), 5);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_factory_failure_reported() {
        let suite = SuiteRunner::new(FailingFactory, config(1));
        let report = suite.run(vec![find("counter").unwrap()]).await;
        let failure = report.scenarios[0].failure.clone().unwrap();
        assert_eq!(failure.kind, FailureKind::DriverError);
        assert!(failure.message.contains("no chromium"));
    }

    #[tokio::test]
    async fn test_worker_panic_is_reported_as_failure() {
        let factory = CrashOnceFactory {
            calls: AtomicUsize::new(0),
        };
        let suite = SuiteRunner::new(factory, config(2));
        let scenarios: Vec<_> = catalog().into_iter().take(3).collect();
        let report = suite.run(scenarios).await;
        assert_eq!(report.scenarios.len(), 3);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.all_passed());
        let failure = report.failures()[0].failure.clone().unwrap();
        assert_eq!(failure.kind, FailureKind::DriverError);
        assert!(failure.message.contains("worker panicked"));
    }

    #[tokio::test]
    async fn test_every_worker_panicking_fails_every_scenario() {
        struct AlwaysCrash;

        #[async_trait]
        impl AdapterFactory for AlwaysCrash {
            type Adapter = crate::simulated::SimulatedApp;

            async fn create(&self) -> ConformanceResult<Self::Adapter> {
                panic!("adapter crashed");
            }
        }

        let report = SuiteRunner::new(AlwaysCrash, config(2)).run(catalog()).await;
        assert_eq!(report.scenarios.len(), catalog().len());
        assert_eq!(report.passed_count(), 0);
        assert!(!report.all_passed());
    }

    #[tokio::test]
    async fn test_abort_before_start() {
        let suite = SuiteRunner::new(SimulatedFactory::default(), config(2));
        suite.abort_handle().store(true, Ordering::SeqCst);
        let report = suite.run(catalog()).await;
        assert!(report
            .scenarios
            .iter()
            .all(|s| s.failure.as_ref().map(|f| f.kind) == Some(FailureKind::Aborted)));
    }

    #[tokio::test]
    async fn test_empty_suite() {
        let suite = SuiteRunner::new(SimulatedFactory::default(), config(4));
        let report = suite.run(Vec::new()).await;
        assert!(report.scenarios.is_empty());
        assert!(report.all_passed());
    }
}
