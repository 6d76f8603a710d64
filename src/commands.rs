//! CLI command definitions
//!
//! Defines the clap commands for the conformance harness.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the conformance scenarios against the executable
    Run {
        #[command(flatten)]
        paths: PathArgs,

        /// Load scenarios from a YAML file instead of the built-in catalog
        #[arg(long)]
        scenarios: Option<PathBuf>,

        /// Only run scenarios whose name contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Maximum number of scenarios running at once (default: CPU count)
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the scenarios that would run
    List {
        /// Load scenarios from a YAML file instead of the built-in catalog
        #[arg(long)]
        scenarios: Option<PathBuf>,

        /// Config file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two images: exact metadata, pixels within a tolerance
    CompareImages {
        /// Produced image (.mhd or .mha)
        actual: PathBuf,

        /// Reference image (.mhd or .mha)
        expected: PathBuf,

        /// Maximum absolute pixel difference
        #[arg(long, allow_negative_numbers = true)]
        tolerance: Option<f64>,
    },

    /// Compare two files byte for byte
    CompareFiles {
        /// Produced file
        actual: PathBuf,

        /// Reference file
        expected: PathBuf,
    },

    /// Print the geometry and pixel type of an image
    Inspect {
        /// Image to inspect (.mhd or .mha)
        image: PathBuf,
    },
}

/// Locations of the executable and the data it is tested with
#[derive(Args, Debug, Default)]
pub struct PathArgs {
    /// Executable under test (default: $TRANSFORMIX_EXE)
    #[arg(long)]
    pub exe: Option<PathBuf>,

    /// Root for per-scenario output directories (default: $TRANSFORMIX_TEST_TEMP_DIR)
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Canonical input data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Transform parameter directory
    #[arg(long)]
    pub parameter_dir: Option<PathBuf>,

    /// Expected output directory
    #[arg(long)]
    pub expected_dir: Option<PathBuf>,

    /// Config file (default: platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
