//! Command handlers
//!
//! Each module holds the execution logic for one subcommand plus the pure
//! helpers it is built from, so the helpers can be tested without a process.

pub mod check;
pub mod config;
pub mod list;
pub mod run;

pub use check::{execute_check, render_check};
pub use config::{execute_config, load_runner_config, render_config};
pub use list::{execute_list, render_list};
pub use run::{execute_run, resolve_runner_config, select_scenarios};
