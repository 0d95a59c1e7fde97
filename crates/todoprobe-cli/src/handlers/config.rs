//! Config command handler

use crate::error::{CliError, CliResult};
use crate::ConfigArgs;
use std::path::Path;
use todoprobe::RunnerConfig;

/// Load the runner configuration: file (or defaults), then environment
pub fn load_runner_config(path: Option<&Path>) -> CliResult<RunnerConfig> {
    let config = match path {
        Some(path) => RunnerConfig::load(path)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?,
        None => RunnerConfig::default(),
    };
    Ok(config.with_env())
}

/// Render a configuration as YAML or JSON
pub fn render_config(config: &RunnerConfig, json: bool) -> CliResult<String> {
    if json {
        serde_json::to_string_pretty(config)
            .map_err(|e| CliError::config(format!("cannot serialize configuration: {e}")))
    } else {
        Ok(config.to_yaml()?)
    }
}

/// Execute the config command
pub fn execute_config(path: Option<&Path>, args: &ConfigArgs) -> CliResult<()> {
    let config = if args.defaults {
        RunnerConfig::default()
    } else {
        load_runner_config(path)?
    };
    let rendered = render_config(&config, args.json)?;
    println!("{}", rendered.trim_end());
    Ok(())
}
