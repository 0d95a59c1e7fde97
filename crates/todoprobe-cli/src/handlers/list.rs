//! List command handler

use crate::error::{CliError, CliResult};
use crate::ListArgs;
use std::fmt::Write as _;
use todoprobe::scenario::catalog;
use todoprobe::Scenario;

/// Whether a scenario belongs to a group; `new-todo` matches `New Todo`
#[must_use]
pub fn in_group(scenario: &Scenario, group: &str) -> bool {
    let wanted = group.replace('-', " ");
    scenario.group.eq_ignore_ascii_case(wanted.trim())
}

/// Catalog listing, one block per group in catalog order
pub fn render_list(group: Option<&str>) -> CliResult<String> {
    let scenarios: Vec<Scenario> = catalog()
        .into_iter()
        .filter(|s| group.map_or(true, |g| in_group(s, g)))
        .collect();
    if scenarios.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no scenarios in group '{}'",
            group.unwrap_or_default()
        )));
    }

    let width = scenarios.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    let mut current: Option<&str> = None;
    for scenario in &scenarios {
        if current != Some(scenario.group.as_str()) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "{}", scenario.group);
            current = Some(scenario.group.as_str());
        }
        let _ = writeln!(
            out,
            "  {:<width$}  {}",
            scenario.name, scenario.description
        );
    }
    Ok(out)
}

/// Execute the list command
pub fn execute_list(args: &ListArgs) -> CliResult<()> {
    print!("{}", render_list(args.group.as_deref())?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_full_listing() {
        let text = render_list(None).unwrap();
        assert!(text.starts_with("New Todo\n"));
        for scenario in catalog() {
            assert!(text.contains(&scenario.name), "{} missing", scenario.name);
        }
    }

    #[test]
    fn test_group_filter_accepts_slug() {
        let text = render_list(Some("new-todo")).unwrap();
        assert!(text.contains("add-items"));
        assert!(!text.contains("trim-edit"));
    }

    #[test]
    fn test_unknown_group() {
        let err = render_list(Some("nope")).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }
}
