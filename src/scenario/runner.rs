//! Scenario runner
//!
//! Executes scenarios against the executable under test and judges the
//! observed results with the comparators. Scenario failures are collected
//! into outcomes; harness errors abort the whole run.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::common::{Error, HarnessConfig, Result};
use crate::compare::{self, Mismatch};
use crate::fixture::Fixture;
use crate::process::{self, Invocation};

use super::config::{ExitExpectation, ExpectedArtifact, Scenario};

/// Result of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub command: String,
    pub exit_code: Option<i32>,
    pub output_dir: PathBuf,
    pub mismatches: Vec<Mismatch>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Result of a whole run; passes only if every scenario passed
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl RunSummary {
    fn from_outcomes(outcomes: Vec<ScenarioOutcome>) -> Self {
        let passed = outcomes.iter().filter(|o| o.passed()).count();
        Self {
            passed,
            failed: outcomes.len() - passed,
            outcomes,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Run one scenario
pub async fn run_scenario(config: &HarnessConfig, scenario: &Scenario) -> Result<ScenarioOutcome> {
    let fixture = Fixture::new(config, &scenario.name)?;
    for dir in &scenario.output_subdirs {
        fixture.output_subdir(dir)?;
    }

    let invocation = Invocation::new(
        config.executable.clone(),
        scenario.args.iter().map(|a| fixture.expand(a)).collect(),
    );

    let result = process::run(&invocation, scenario.must_succeed()).await?;
    let mut mismatches = Vec::new();

    match scenario.exit {
        ExitExpectation::Success if !result.success() => mismatches.push(Mismatch::new(
            "exit code",
            format!("expected 0, got {}", result.describe_exit()),
        )),
        ExitExpectation::Failure if result.success() => mismatches.push(Mismatch::new(
            "exit code",
            "expected a non-zero exit code, got 0",
        )),
        _ => {}
    }

    if let Err(m) = scenario.stdout.check("stdout", &result.stdout) {
        mismatches.push(m);
    }
    if let Err(m) = scenario.stderr.check("stderr", &result.stderr) {
        mismatches.push(m);
    }

    for artifact in &scenario.artifacts {
        let pending = ArtifactCheck::resolve(config, &fixture, artifact);
        // File reads and image decoding stay off the async workers
        let verdict = tokio::task::spawn_blocking(move || pending.judge())
            .await
            .map_err(|e| Error::Internal(e.to_string()))??;
        if let Err(m) = verdict {
            mismatches.push(m);
        }
    }

    if mismatches.is_empty() {
        tracing::debug!(scenario = %scenario.name, "Scenario passed");
    } else {
        tracing::debug!(
            scenario = %scenario.name,
            mismatches = mismatches.len(),
            "Scenario failed"
        );
    }

    Ok(ScenarioOutcome {
        name: scenario.name.clone(),
        command: invocation.display(),
        exit_code: result.exit_code,
        output_dir: fixture.output_dir().to_path_buf(),
        mismatches,
    })
}

/// A produced artifact with every path expanded
#[derive(Debug)]
struct ArtifactCheck {
    check: String,
    produced: PathBuf,
    reference: Reference,
}

#[derive(Debug)]
enum Reference {
    Text(String),
    File(PathBuf),
    Image { expected: PathBuf, tolerance: f64 },
}

impl ArtifactCheck {
    fn resolve(config: &HarnessConfig, fixture: &Fixture<'_>, artifact: &ExpectedArtifact) -> Self {
        let reference = match artifact {
            ExpectedArtifact::ExactText { text, .. } => Reference::Text(text.clone()),
            ExpectedArtifact::ExactFile { expected, .. } => {
                Reference::File(fixture.expand_expected_path(expected))
            }
            ExpectedArtifact::Image {
                expected,
                tolerance,
                ..
            } => Reference::Image {
                expected: fixture.expand_expected_path(expected),
                tolerance: tolerance.unwrap_or(config.image_tolerance),
            },
        };
        Self {
            check: artifact.produced().to_string(),
            produced: fixture.expand_output_path(artifact.produced()),
            reference,
        }
    }

    /// Blocking: reads both files from disk
    fn judge(self) -> Result<compare::Verdict> {
        let Self {
            check,
            produced,
            reference,
        } = self;

        match reference {
            Reference::Text(text) => match std::fs::read(&produced) {
                Ok(bytes) => Ok(compare::exact_text(&check, &bytes, &text)),
                Err(e) => Ok(Err(Mismatch::new(
                    check,
                    format!("cannot read produced file '{}': {}", produced.display(), e),
                ))),
            },
            Reference::File(expected) => compare::compare_files(&produced, &expected)
                .map(|v| v.map_err(|m| Mismatch::new(check, m.detail))),
            Reference::Image {
                expected,
                tolerance,
            } => compare::compare_image_files(&produced, &expected, tolerance)
                .map(|v| v.map_err(|m| Mismatch::new(check, m.detail))),
        }
    }
}

/// Run scenarios concurrently, at most `jobs` at a time
///
/// Outcomes are reported in catalog order. The first harness error aborts
/// the remaining scenarios.
pub async fn run_all(
    config: Arc<HarnessConfig>,
    scenarios: Vec<Scenario>,
    jobs: usize,
) -> Result<RunSummary> {
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut set = JoinSet::new();

    for (index, scenario) in scenarios.into_iter().enumerate() {
        let config = Arc::clone(&config);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| Error::Internal(e.to_string()))?;
            run_scenario(&config, &scenario)
                .await
                .map(|outcome| (index, outcome))
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (index, outcome) = joined.map_err(|e| Error::Internal(e.to_string()))??;
        outcomes.push((index, outcome));
    }
    outcomes.sort_by_key(|(index, _)| *index);

    Ok(RunSummary::from_outcomes(
        outcomes.into_iter().map(|(_, o)| o).collect(),
    ))
}

/// Print one outcome in the runner's report format
pub fn print_outcome(outcome: &ScenarioOutcome, verbose: bool) {
    if outcome.passed() {
        println!("  {} {}", "✓".green(), outcome.name);
    } else {
        println!("  {} {}", "✗".red(), outcome.name.white().bold());
        for m in &outcome.mismatches {
            println!("      {} {}", format!("{}:", m.check).yellow(), m.detail);
        }
    }

    if verbose || !outcome.passed() {
        println!("      $ {}", outcome.command.dimmed());
        println!(
            "      output: {}",
            outcome.output_dir.display().to_string().dimmed()
        );
    }
}

/// Print a whole run
pub fn print_summary(summary: &RunSummary, verbose: bool) {
    println!("\n{}", "Scenarios:".cyan());
    for outcome in &summary.outcomes {
        print_outcome(outcome, verbose);
    }

    if summary.all_passed() {
        println!(
            "\n{} {}\n",
            "✓".green().bold(),
            format!("{} scenarios passed", summary.passed).green().bold()
        );
    } else {
        println!(
            "\n{} {}\n",
            "✗".red().bold(),
            format!(
                "{} of {} scenarios failed",
                summary.failed,
                summary.passed + summary.failed
            )
            .red()
            .bold()
        );
    }
}
