//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use todoprobe::ReportFormat;

/// Todoprobe: oracle-driven conformance checks for TodoMVC applications
#[derive(Parser, Debug)]
#[command(name = "todoprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Runner configuration file (YAML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run conformance scenarios against an application
    Run(RunArgs),

    /// List the built-in scenarios
    List(ListArgs),

    /// Print the expected state after every action of a scenario file
    Check(CheckArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Built-in scenario to run (repeatable)
    #[arg(short, long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// Scenario file to run, YAML or JSON (repeatable)
    #[arg(short, long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Run every built-in scenario of a feature group
    #[arg(short, long)]
    pub group: Option<String>,

    /// Scenarios run concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Application under test
    #[arg(long, env = "TODO_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Stabilization timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Run against the in-memory TodoMVC instead of a browser
    #[arg(long)]
    pub simulate: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Only list one feature group
    #[arg(short, long)]
    pub group: Option<String>,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Scenario file, YAML or JSON
    pub file: PathBuf,

    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the config command
#[derive(Parser, Debug, Default)]
pub struct ConfigArgs {
    /// Print built-in defaults, ignoring files and environment
    #[arg(long)]
    pub defaults: bool,

    /// Print as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Plain text
    #[default]
    Text,
    /// JSON
    Json,
    /// JUnit XML
    Junit,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
            FormatArg::Junit => Self::Junit,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "todoprobe",
            "-vv",
            "run",
            "--scenario",
            "trim-edit",
            "-s",
            "counter",
            "--jobs",
            "3",
            "--format",
            "json",
            "--simulate",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenarios, ["trim-edit", "counter"]);
        assert_eq!(args.jobs, Some(3));
        assert_eq!(args.format, FormatArg::Json);
        assert!(args.simulate);
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from(["todoprobe", "--config", "c.yaml", "check", "s.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        assert!(matches!(cli.command, Commands::Check(ref a) if a.file == PathBuf::from("s.yaml")));
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(ReportFormat::from(FormatArg::Junit), ReportFormat::Junit);
    }
}
