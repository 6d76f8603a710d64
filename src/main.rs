//! transformix conformance harness
//!
//! Runs the transformix command-line contract against an executable and
//! reports which scenarios pass.

use clap::Parser;
use commands::Commands;
use transformix_conformance::cli::{self, Conclusion};
use transformix_conformance::common::logging;
use transformix_conformance::commands;

#[derive(Parser)]
#[command(name = "transformix-conformance", about = "Conformance harness for transformix")]
#[command(version, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Exit code for a run with failing scenarios
const EXIT_FAILED: i32 = 1;
/// Exit code for a harness error
const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command, cli.verbose).await {
        Ok(Conclusion::Passed) => {}
        Ok(Conclusion::Failed) => std::process::exit(EXIT_FAILED),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_FATAL);
        }
    }
}
