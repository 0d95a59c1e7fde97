//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use todoprobe::runner::ScenarioReport;

/// Progress reporter for suite execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over the scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Handle to the running bar, for callbacks on worker tasks
    #[must_use]
    pub fn progress_handle(&self) -> Option<ProgressBar> {
        self.progress_bar.clone()
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Failures print even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print one finished scenario
    pub fn scenario(&self, report: &ScenarioReport) {
        let line = format!("{} ({}ms)", report.name, report.duration_ms);
        match &report.failure {
            None => self.success(&line),
            Some(failure) => {
                self.failure(&format!("{line}: {failure}"));
                for mismatch in &failure.mismatches {
                    let _ = self.term.write_line(&format!("    {mismatch}"));
                }
            }
        }
    }

    /// Print suite summary
    pub fn summary(&self, passed: usize, failed: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let _ = self.term.write_line("");
        let total = passed + failed;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoprobe::runner::RunState;

    fn report(name: &str) -> ScenarioReport {
        ScenarioReport {
            name: name.to_string(),
            group: "Counter".to_string(),
            state: RunState::Passed,
            steps: Vec::new(),
            failure: None,
            duration_ms: 3,
        }
    }

    #[test]
    fn test_quiet_reporter_has_no_bar() {
        let mut reporter = ProgressReporter::new(false, true);
        reporter.start_progress(5, "running");
        assert!(reporter.progress_handle().is_none());
        reporter.finish();
    }

    #[test]
    fn test_progress_bar_counts() {
        let mut reporter = ProgressReporter::new(false, false);
        reporter.start_progress(3, "running");
        let pb = reporter.progress_handle().unwrap();
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.length(), Some(3));
        reporter.finish();
    }

    #[test]
    fn test_messages_do_not_panic() {
        let reporter = ProgressReporter::new(false, false);
        reporter.info("info");
        reporter.scenario(&report("counter"));
        reporter.summary(1, 0, Duration::from_millis(5));
    }
}
