//! Scenario catalog and runner
//!
//! A scenario is one invocation of the executable under test plus the
//! observable results it must produce. Scenarios come from the built-in
//! catalog or from a YAML file and are judged by the comparators.

pub mod catalog;
mod config;
mod runner;

pub use config::*;
pub use runner::{print_outcome, print_summary, run_all, run_scenario, RunSummary, ScenarioOutcome};
