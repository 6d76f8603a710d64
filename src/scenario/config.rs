//! Scenario definition types
//!
//! Defines the data structures for the built-in catalog and for
//! deserializing YAML scenario files.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::common::{Error, Result};
use crate::compare::StreamExpectation;

/// A complete test scenario
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Unique name, also the name of the scenario's output directory
    pub name: String,
    /// Optional description of what the scenario verifies
    #[serde(default)]
    pub description: Option<String>,
    /// Argument templates; `{out}`, `{data}`, `{params}`, `{expected}` are expanded
    #[serde(default)]
    pub args: Vec<String>,
    /// Directories to create below `{out}` before the invocation
    #[serde(default)]
    pub output_subdirs: Vec<String>,
    /// Expected exit class
    pub exit: ExitExpectation,
    /// Expectation on standard output
    #[serde(default)]
    pub stdout: StreamExpectation,
    /// Expectation on standard error
    #[serde(default)]
    pub stderr: StreamExpectation,
    /// Files to check after the process exits
    #[serde(default)]
    pub artifacts: Vec<ExpectedArtifact>,
}

impl Scenario {
    /// Success-path scenarios treat a non-zero exit as harness-fatal
    pub fn must_succeed(&self) -> bool {
        self.exit == ExitExpectation::Success
    }
}

/// Expected exit class; only zero versus non-zero is ever checked
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitExpectation {
    Success,
    Failure,
}

/// A produced file and the comparator that judges it
///
/// `produced` is relative to `{out}`, `expected` relative to `{expected}`,
/// unless either starts with a placeholder or is absolute.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedArtifact {
    /// File content equals `text` after trimming outer whitespace
    ExactText { produced: String, text: String },
    /// File is byte-for-byte identical to the reference file
    ExactFile { produced: String, expected: String },
    /// Image equals the reference image (exact metadata, tolerant pixels)
    Image {
        produced: String,
        expected: String,
        /// Overrides the configured tolerance
        #[serde(default)]
        tolerance: Option<f64>,
    },
}

impl ExpectedArtifact {
    /// Template of the produced file
    pub fn produced(&self) -> &str {
        match self {
            Self::ExactText { produced, .. }
            | Self::ExactFile { produced, .. }
            | Self::Image { produced, .. } => produced,
        }
    }
}

/// Top level of a YAML scenario file
#[derive(Deserialize, Debug)]
pub struct ScenarioFile {
    pub scenarios: Vec<Scenario>,
}

/// Load scenarios from a YAML file
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read scenario file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let file: ScenarioFile = serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse scenario file: {}", e)))?;

    validate_catalog(&file.scenarios)?;
    Ok(file.scenarios)
}

/// Check catalog-wide invariants
///
/// Names must be unique so that no two scenarios share an output directory.
pub fn validate_catalog(scenarios: &[Scenario]) -> Result<()> {
    let mut seen = HashSet::new();
    for scenario in scenarios {
        if !seen.insert(scenario.name.as_str()) {
            return Err(Error::DuplicateScenario(scenario.name.clone()));
        }
        if scenario.exit == ExitExpectation::Failure && !scenario.artifacts.is_empty() {
            return Err(Error::invalid_scenario(
                &scenario.name,
                "failure scenarios cannot check produced artifacts",
            ));
        }
        for artifact in &scenario.artifacts {
            if let ExpectedArtifact::Image {
                tolerance: Some(t), ..
            } = artifact
            {
                if !crate::compare::is_valid_tolerance(*t) {
                    return Err(Error::invalid_scenario(
                        &scenario.name,
                        format!("invalid image tolerance {}", t),
                    ));
                }
            }
        }
    }
    Ok(())
}
