//! transformix conformance harness
//!
//! Black-box verification of the transformix command-line executable:
//! builds invocations per scenario, isolates each scenario's output
//! directory, captures the process result and compares produced artifacts
//! (text, files, images) against expected ones.

pub mod cli;
pub mod commands;
pub mod common;
pub mod compare;
pub mod fixture;
pub mod image;
pub mod process;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, HarnessConfig, Result};
pub use scenario::{RunSummary, Scenario, ScenarioOutcome};
