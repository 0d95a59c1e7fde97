//! Todoprobe: oracle-driven conformance checking for TodoMVC applications.
//!
//! A pure state machine predicts what a TodoMVC application must show after
//! every user action; a runner drives a real (or simulated) application
//! through the same actions and compares the page against the prediction.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Scenario │──►│   Oracle   │──►│ Conformance  │◄─►│ Harness      │
//! │ (actions)│   │ (expected  │   │ Runner       │   │ Adapter      │
//! │          │   │  state)    │   │ (poll, diff) │   │ (Chromium or │
//! └──────────┘   └────────────┘   └──────────────┘   │  simulated)  │
//!                                         │          └──────────────┘
//!                                         ▼
//!                               SuiteReport (text / json / junit)
//! ```
//!
//! # Example
//!
//! ```
//! use todoprobe::prelude::*;
//!
//! let mut oracle = Oracle::new();
//! oracle.apply(&Action::add("buy some cheese")).unwrap();
//! let projection = oracle.apply(&Action::add("feed the cat")).unwrap();
//! assert_eq!(projection.counter_text, "2 items left");
//! assert!(!projection.toggle_all_checked);
//! ```

#![warn(missing_docs)]

pub mod action;
pub mod adapter;
#[cfg(feature = "browser")]
pub mod chromium;
pub mod config;
pub mod model;
pub mod oracle;
pub mod report;
mod result;
pub mod runner;
pub mod scenario;
pub mod simulated;
pub mod suite;

pub use action::Action;
pub use adapter::{FieldMismatch, HarnessAdapter, Key, Observation, Target};
#[cfg(feature = "browser")]
pub use chromium::{ChromiumAdapter, ChromiumFactory};
pub use config::{RunnerConfig, Selectors, StabilizationConfig};
pub use model::{counter_text, pluralize, Filter, PersistedRecord, TodoItem, TodoList};
pub use oracle::{Oracle, Projection};
pub use report::{ReportFormat, SuiteReport};
pub use result::{ConformanceError, ConformanceResult};
pub use runner::{ConformanceRunner, FailureKind, RunState, ScenarioFailure, ScenarioReport};
pub use scenario::Scenario;
pub use simulated::{Faults, SimulatedApp, SimulatedFactory};
pub use suite::{AdapterFactory, SuiteRunner};

/// Commonly used types
pub mod prelude {
    pub use crate::{
        Action, AdapterFactory, ConformanceError, ConformanceResult, ConformanceRunner, Filter,
        HarnessAdapter, Oracle, Projection, ReportFormat, RunnerConfig, Scenario, SuiteReport,
        SuiteRunner, TodoList,
    };
}
