//! Check command handler: the oracle's prediction for a scenario file,
//! without touching an application.

use crate::commands::FormatArg;
use crate::error::{CliError, CliResult};
use crate::CheckArgs;
use serde::Serialize;
use std::fmt::Write as _;
use todoprobe::{ConformanceError, Oracle, Projection, Scenario};

#[derive(Debug, Serialize)]
struct CheckStep {
    index: usize,
    action: String,
    expected: Projection,
}

fn expected_steps(scenario: &Scenario) -> CliResult<Vec<CheckStep>> {
    let mut oracle = Oracle::new();
    scenario
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            let expected = oracle.apply(action).map_err(|e| {
                ConformanceError::scenario(format!("action #{index} ({action}): {e}"))
            })?;
            Ok(CheckStep {
                index,
                action: action.to_string(),
                expected,
            })
        })
        .collect()
}

/// Expected state after every action, as text or JSON
pub fn render_check(scenario: &Scenario, format: FormatArg) -> CliResult<String> {
    let steps = expected_steps(scenario)?;
    match format {
        FormatArg::Json => serde_json::to_string_pretty(&steps)
            .map_err(|e| CliError::config(format!("cannot serialize projections: {e}"))),
        FormatArg::Text => Ok(render_text(scenario, &steps)),
        FormatArg::Junit => Err(CliError::invalid_argument(
            "check supports text and json output",
        )),
    }
}

fn render_text(scenario: &Scenario, steps: &[CheckStep]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", scenario.name, scenario.group);
    if !scenario.description.is_empty() {
        let _ = writeln!(out, "  {}", scenario.description);
    }
    for step in steps {
        let expected = &step.expected;
        let _ = writeln!(out, "#{} {}", step.index, step.action);
        let _ = writeln!(
            out,
            "    visible: {:?} (filter {})",
            expected.visible_texts(),
            expected.filter
        );
        if let Some(editing) = expected.editing {
            let _ = writeln!(out, "    editing: #{editing}");
        }
        if expected.footer_visible {
            let _ = writeln!(
                out,
                "    counter: {:?}  toggle-all: {}  clear-completed: {}",
                expected.counter_text,
                on_off(expected.toggle_all_checked),
                if expected.clear_completed_visible {
                    "shown"
                } else {
                    "hidden"
                }
            );
        } else {
            out.push_str("    footer hidden\n");
        }
    }
    out
}

const fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Execute the check command
pub fn execute_check(args: &CheckArgs) -> CliResult<()> {
    let scenario = Scenario::load(&args.file)?;
    print!("{}", render_check(&scenario, args.format)?);
    Ok(())
}
