//! Run command handler

use super::config::load_runner_config;
use super::list::in_group;
use crate::commands::FormatArg;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::RunArgs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use todoprobe::runner::ScenarioReport;
use todoprobe::scenario::{catalog, find};
use todoprobe::suite::ProgressFn;
use todoprobe::{ReportFormat, RunnerConfig, Scenario, SimulatedFactory, SuiteReport, SuiteRunner};
use tracing::{debug, info};

/// Runner configuration: file, then environment, then flags
pub fn resolve_runner_config(path: Option<&Path>, args: &RunArgs) -> CliResult<RunnerConfig> {
    let mut config = load_runner_config(path)?;
    if let Some(url) = &args.base_url {
        config = config.with_base_url(url.clone());
    }
    if args.headed {
        config = config.with_headless(false);
    }
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(CliError::invalid_argument("--jobs must be at least 1"));
        }
        config = config.with_jobs(jobs);
    }
    if let Some(ms) = args.timeout_ms {
        if ms == 0 {
            return Err(CliError::invalid_argument("--timeout-ms must be positive"));
        }
        config.stabilization.timeout_ms = ms;
    }
    if config.base_url.trim().is_empty() {
        return Err(CliError::config("base URL is empty"));
    }
    Ok(config)
}

/// Scenarios named, loaded and grouped on the command line, in that order;
/// the whole catalog when none are given
pub fn select_scenarios(args: &RunArgs) -> CliResult<Vec<Scenario>> {
    if args.scenarios.is_empty() && args.files.is_empty() && args.group.is_none() {
        return Ok(catalog());
    }
    let mut selected = Vec::new();
    for name in &args.scenarios {
        let scenario = find(name)
            .ok_or_else(|| CliError::invalid_argument(format!("unknown scenario: {name}")))?;
        selected.push(scenario);
    }
    for path in &args.files {
        let scenario = Scenario::load(path)
            .map_err(|e| CliError::invalid_argument(format!("{}: {e}", path.display())))?;
        selected.push(scenario);
    }
    if let Some(group) = &args.group {
        let before = selected.len();
        selected.extend(catalog().into_iter().filter(|s| in_group(s, group)));
        if selected.len() == before {
            return Err(CliError::invalid_argument(format!(
                "no scenarios in group '{group}'"
            )));
        }
    }

    let mut seen = std::collections::HashSet::new();
    selected.retain(|s| seen.insert(s.name.clone()));
    Ok(selected)
}

/// Execute the run command
pub fn execute_run(cli: &CliConfig, path: Option<&Path>, args: &RunArgs) -> CliResult<()> {
    let config = resolve_runner_config(path, args)?;
    let scenarios = select_scenarios(args)?;
    let total = scenarios.len();
    info!(base_url = %config.base_url, scenarios = total, simulate = args.simulate, "Run requested");

    let mut reporter = ProgressReporter::new(cli.color.should_color(), cli.verbosity.is_quiet());
    if args.simulate {
        reporter.info("Running against the in-memory TodoMVC");
    } else {
        reporter.info(&format!("Running against {}", config.base_url));
    }
    reporter.start_progress(total as u64, "scenarios");
    let progress = progress_callback(&reporter);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(run_suite(config, scenarios, args.simulate, progress))?;
    reporter.finish();

    let format = ReportFormat::from(args.format);
    let report_on_stdout = args.output.is_none() && args.format == FormatArg::Text;
    for scenario in &report.scenarios {
        let show = if scenario.passed() {
            cli.verbosity.is_verbose()
        } else {
            !report_on_stdout
        };
        if show {
            reporter.scenario(scenario);
        }
    }

    match &args.output {
        Some(output) => {
            report.write_to(output, format)?;
            reporter.info(&format!("Report written to {}", output.display()));
        }
        None => print!("{}", report.render(format)?),
    }
    reporter.summary(
        report.passed_count(),
        report.failed_count(),
        Duration::from_millis(report.duration_ms),
    );

    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: report.failed_count(),
            total: report.scenarios.len(),
        })
    }
}

fn progress_callback(reporter: &ProgressReporter) -> ProgressFn {
    let bar = reporter.progress_handle();
    Arc::new(move |report: &ScenarioReport| {
        debug!(scenario = %report.name, passed = report.passed(), "Scenario finished");
        if let Some(bar) = &bar {
            bar.inc(1);
            bar.set_message(report.name.clone());
        }
    })
}

async fn run_suite(
    config: RunnerConfig,
    scenarios: Vec<Scenario>,
    simulate: bool,
    progress: ProgressFn,
) -> CliResult<SuiteReport> {
    if simulate {
        let factory = SimulatedFactory::default().with_storage_key(config.storage_key.clone());
        let runner = SuiteRunner::new(factory, config).with_progress(progress);
        return Ok(runner.run(scenarios).await);
    }
    run_in_browser(config, scenarios, progress).await
}

#[cfg(feature = "browser")]
async fn run_in_browser(
    config: RunnerConfig,
    scenarios: Vec<Scenario>,
    progress: ProgressFn,
) -> CliResult<SuiteReport> {
    let factory = todoprobe::ChromiumFactory::launch(config.clone()).await?;
    let runner = SuiteRunner::new(factory, config).with_progress(progress);
    let report = runner.run(scenarios).await;
    if let Err(e) = runner.factory().close().await {
        tracing::warn!(error = %e, "Browser did not shut down cleanly");
    }
    Ok(report)
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn run_in_browser(
    _config: RunnerConfig,
    _scenarios: Vec<Scenario>,
    _progress: ProgressFn,
) -> CliResult<SuiteReport> {
    Err(CliError::config(
        "built without browser support; rebuild with `--features browser` or pass --simulate",
    ))
}
