//! CLI command handling
//!
//! Dispatches CLI commands to the harness and formats output.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::commands::{Commands, PathArgs};
use crate::common::config::{ConfigFile, Overrides, DEFAULT_PROGRAM_NAME, DEFAULT_VERSION};
use crate::common::{Error, HarnessConfig, Result};
use crate::compare;
use crate::image::read_image;
use crate::scenario::{self, catalog, Scenario};

/// What a command concluded, mapped to the process exit code by `main`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conclusion {
    Passed,
    Failed,
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, verbose: bool) -> Result<Conclusion> {
    match command {
        Commands::Run {
            paths,
            scenarios,
            filter,
            jobs,
            json,
        } => {
            let config = HarnessConfig::resolve(&overrides(paths))?;
            tracing::info!(
                executable = %config.executable.display(),
                output_root = %config.output_root.display(),
                "Resolved harness configuration"
            );

            let selected = catalog::filter(
                load(scenarios.as_deref(), &config.program_name, &config.version)?,
                filter.as_deref(),
            );
            if selected.is_empty() {
                return Err(Error::NoScenarios(filter.unwrap_or_default()));
            }

            let jobs = jobs.unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });

            let summary = scenario::run_all(Arc::new(config), selected, jobs).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                scenario::print_summary(&summary, verbose);
            }

            Ok(if summary.all_passed() {
                Conclusion::Passed
            } else {
                Conclusion::Failed
            })
        }

        Commands::List { scenarios, config } => {
            let file = ConfigFile::load(config.as_deref())?;
            let program = file.program_name.as_deref().unwrap_or(DEFAULT_PROGRAM_NAME);
            let version = file.version.as_deref().unwrap_or(DEFAULT_VERSION);

            for s in load(scenarios.as_deref(), program, version)? {
                match &s.description {
                    Some(desc) => println!("{}  {}", s.name.white().bold(), desc.dimmed()),
                    None => println!("{}", s.name.white().bold()),
                }
            }
            Ok(Conclusion::Passed)
        }

        Commands::CompareImages {
            actual,
            expected,
            tolerance,
        } => {
            let tolerance = match tolerance {
                Some(t) => t,
                None => ConfigFile::load(None)?.comparison.image_tolerance,
            };
            let tolerance = checked_tolerance(tolerance)?;
            let verdict = compare::compare_image_files(&actual, &expected, tolerance)?;
            Ok(report_verdict(verdict))
        }

        Commands::CompareFiles { actual, expected } => {
            let verdict = compare::compare_files(&actual, &expected)?;
            Ok(report_verdict(verdict))
        }

        Commands::Inspect { image } => {
            let img = read_image(&image)?;
            let d = &img.descriptor;
            println!("Image: {}", image.display());
            println!("  Dimension:  {}", d.dimension);
            println!("  Size:       {:?}", d.size);
            println!("  Spacing:    {:?}", d.spacing);
            println!("  Origin:     {:?}", d.origin);
            println!("  Direction:  {:?}", d.direction);
            println!("  Pixel type: {}", d.element_type);
            if d.components != 1 {
                println!("  Components: {}", d.components);
            }
            let (min, max) = img
                .pixels
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            if !img.pixels.is_empty() {
                println!("  Range:      [{}, {}]", min, max);
            }
            Ok(Conclusion::Passed)
        }
    }
}

fn overrides(paths: PathArgs) -> Overrides {
    Overrides {
        executable: paths.exe,
        output_root: paths.output_root,
        data_dir: paths.data_dir,
        parameter_dir: paths.parameter_dir,
        expected_dir: paths.expected_dir,
        config: paths.config,
    }
}

fn load(file: Option<&Path>, program: &str, version: &str) -> Result<Vec<Scenario>> {
    match file {
        Some(path) => scenario::load_scenarios(path),
        None => Ok(catalog::builtin(program, version)),
    }
}

fn checked_tolerance(tolerance: f64) -> Result<f64> {
    if compare::is_valid_tolerance(tolerance) {
        Ok(tolerance)
    } else {
        Err(Error::Config(format!(
            "tolerance must be a finite non-negative number, got {}",
            tolerance
        )))
    }
}

fn report_verdict(verdict: compare::Verdict) -> Conclusion {
    match verdict {
        Ok(()) => {
            println!("{} {}", "✓".green(), "Equal".green().bold());
            Conclusion::Passed
        }
        Err(m) => {
            println!("{} {}", "✗".red(), m);
            Conclusion::Failed
        }
    }
}
