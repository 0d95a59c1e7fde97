//! Todoprobe: TodoMVC conformance runner
//!
//! ## Usage
//!
//! ```bash
//! todoprobe list                              # Built-in scenarios
//! todoprobe run                               # Whole catalog against TODO_BASE_URL
//! todoprobe run -s trim-edit -s counter -j 2  # Selected scenarios, two at a time
//! todoprobe run --simulate --format junit     # In-memory app, JUnit report
//! todoprobe check crates/todoprobe/scenarios/edit-then-filter.yaml
//! ```

use clap::Parser;
use std::process::ExitCode;
use todoprobe_cli::{handlers, logging, Cli, CliConfig, CliResult, Commands, Verbosity};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.clone().into());
    logging::init_tracing(config.verbosity, config.color);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, config_path, &args),
        Commands::List(args) => handlers::execute_list(&args),
        Commands::Check(args) => handlers::execute_check(&args),
        Commands::Config(args) => handlers::execute_config(config_path, &args),
    }
}
