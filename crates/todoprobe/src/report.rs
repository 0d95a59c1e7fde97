//! Suite reports and their text, JSON and JUnit renderings.

use crate::result::ConformanceResult;
use crate::runner::ScenarioReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// Results of one suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Application under test
    pub base_url: String,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Scenario results in input order
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// Scenarios that passed
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    /// Scenarios that failed
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.scenarios.len() - self.passed_count()
    }

    /// Whether every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Failing scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios.iter().filter(|s| !s.passed()).collect()
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}/{} scenarios passed in {}ms",
            self.passed_count(),
            self.scenarios.len(),
            self.duration_ms
        )
    }

    /// Render in the given format
    pub fn render(&self, format: ReportFormat) -> ConformanceResult<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => self.render_json(),
            ReportFormat::Junit => Ok(self.render_junit()),
        }
    }

    /// Human-readable report with a diff per failure
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "TodoMVC conformance against {} ({})",
            self.base_url,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for scenario in &self.scenarios {
            let mark = if scenario.passed() { "PASS" } else { "FAIL" };
            let _ = writeln!(
                out,
                "  {mark} {} [{}] ({}ms)",
                scenario.name, scenario.group, scenario.duration_ms
            );
            if let Some(failure) = &scenario.failure {
                let _ = writeln!(out, "       {failure}");
                for mismatch in &failure.mismatches {
                    let _ = writeln!(out, "         {mismatch}");
                }
            }
        }
        let _ = writeln!(out, "{}", self.summary());
        out
    }

    /// Pretty-printed JSON
    pub fn render_json(&self) -> ConformanceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JUnit XML for CI systems
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuite name="todomvc-conformance" tests="{}" failures="{}" time="{:.3}" timestamp="{}">"#,
            self.scenarios.len(),
            self.failed_count(),
            ms_to_secs(self.duration_ms),
            self.started_at.to_rfc3339()
        );
        for scenario in &self.scenarios {
            let _ = writeln!(
                xml,
                r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
                escape_xml(&scenario.group),
                escape_xml(&scenario.name),
                ms_to_secs(scenario.duration_ms)
            );
            if let Some(failure) = &scenario.failure {
                let detail: Vec<String> = failure.mismatches.iter().map(ToString::to_string).collect();
                let _ = writeln!(
                    xml,
                    r#"    <failure type="{}" message="{}">{}</failure>"#,
                    failure.kind,
                    escape_xml(&failure.to_string()),
                    escape_xml(&detail.join("\n"))
                );
            }
            xml.push_str("  </testcase>\n");
        }
        xml.push_str("</testsuite>\n");
        xml
    }

    /// Write the rendering to a file
    pub fn write_to(&self, path: &Path, format: ReportFormat) -> ConformanceResult<()> {
        std::fs::write(path, self.render(format)?)?;
        Ok(())
    }
}

fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Plain text
    #[default]
    Text,
    /// JSON document
    Json,
    /// JUnit XML
    Junit,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "junit" => Ok(Self::Junit),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}
