//! End-to-end integration tests for the conformance harness
//!
//! These tests run the built-in scenario catalog against the
//! `mock_transformix` binary, both through the library and through the
//! `transformix-conformance` CLI, and check that injected defects in the
//! mock are reported as failures.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::Arc;

use transformix_conformance::common::config::{DEFAULT_IMAGE_TOLERANCE, DEFAULT_PROGRAM_NAME, DEFAULT_VERSION};
use transformix_conformance::compare::{compare_files, compare_image_files};
use transformix_conformance::scenario::{self, catalog};
use transformix_conformance::HarnessConfig;

/// Test context with paths and cleanup
struct TestContext {
    /// Temporary directory for this test
    temp_dir: PathBuf,
    /// Path to the harness binary
    harness_bin: PathBuf,
    /// Path to the mock executable under test
    mock_bin: PathBuf,
    /// Path to fixtures directory
    fixtures_dir: PathBuf,
}

impl TestContext {
    /// Create a new test context
    fn new(test_name: &str) -> Self {
        let temp_dir = std::env::temp_dir()
            .join("transformix-conformance-tests")
            .join(test_name);

        // Clean up any previous test artifacts
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(temp_dir.join("config")).expect("Failed to create temp dir");

        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self {
            temp_dir,
            harness_bin: PathBuf::from(env!("CARGO_BIN_EXE_transformix-conformance")),
            mock_bin: PathBuf::from(env!("CARGO_BIN_EXE_mock_transformix")),
            fixtures_dir,
        }
    }

    fn output_root(&self) -> PathBuf {
        self.temp_dir.join("out")
    }

    fn data(&self, name: &str) -> PathBuf {
        self.fixtures_dir.join("Data").join(name)
    }

    fn config(&self) -> HarnessConfig {
        HarnessConfig {
            executable: self.mock_bin.clone(),
            output_root: self.output_root(),
            data_dir: self.fixtures_dir.join("Data"),
            parameter_dir: self.fixtures_dir.join("TransformParameters"),
            expected_dir: self.fixtures_dir.join("ExpectedOutput"),
            program_name: DEFAULT_PROGRAM_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
            image_tolerance: DEFAULT_IMAGE_TOLERANCE,
        }
    }

    /// Run the harness binary with an isolated config directory
    fn harness(&self, args: &[&str], env: &[(&str, &str)]) -> Output {
        let mut cmd = Command::new(&self.harness_bin);
        cmd.args(args)
            .env("XDG_CONFIG_HOME", self.temp_dir.join("config"))
            .env("NO_COLOR", "1")
            .env_remove("TRANSFORMIX_EXE")
            .env_remove("TRANSFORMIX_TEST_TEMP_DIR")
            .env_remove("MOCK_TRANSFORMIX_FAULT");
        for (k, v) in env {
            cmd.env(k, v);
        }
        cmd.output().expect("Failed to run harness")
    }

    /// `run` against the mock with every path given on the command line
    fn run_against_mock(&self, extra: &[&str], env: &[(&str, &str)]) -> Output {
        let exe = self.mock_bin.display().to_string();
        let out = self.output_root().display().to_string();
        let data = self.fixtures_dir.join("Data").display().to_string();
        let params = self
            .fixtures_dir
            .join("TransformParameters")
            .display()
            .to_string();
        let expected = self
            .fixtures_dir
            .join("ExpectedOutput")
            .display()
            .to_string();

        let mut args = vec![
            "run",
            "--exe",
            &exe,
            "--output-root",
            &out,
            "--data-dir",
            &data,
            "--parameter-dir",
            &params,
            "--expected-dir",
            &expected,
        ];
        args.extend_from_slice(extra);
        self.harness(&args, env)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_summary(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}):\n{}\nstderr:\n{}",
            stdout(output),
            stderr(output)
        )
    })
}

fn failed_names(summary: &serde_json::Value) -> Vec<String> {
    summary["outcomes"]
        .as_array()
        .expect("outcomes array")
        .iter()
        .filter(|o| !o["mismatches"].as_array().map(Vec::is_empty).unwrap_or(true))
        .map(|o| o["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

// ============== Library ==============

#[tokio::test]
async fn test_catalog_passes_against_mock() {
    let ctx = TestContext::new("catalog_passes_against_mock");
    let config = Arc::new(ctx.config());
    let scenarios = catalog::builtin(&config.program_name, &config.version);

    let summary = scenario::run_all(config, scenarios, 4)
        .await
        .expect("harness error");

    for outcome in &summary.outcomes {
        assert!(outcome.passed(), "{} failed: {:?}", outcome.name, outcome.mismatches);
    }
    assert_eq!(summary.passed, 10);
    assert_eq!(summary.failed, 0);

    // Outcomes come back in catalog order
    assert_eq!(summary.outcomes[0].name, "without_arguments");
    assert_eq!(
        summary.outcomes.last().map(|o| o.name.as_str()),
        Some("translation_of_images_and_points")
    );
}

#[tokio::test]
async fn test_scenarios_use_isolated_output_directories() {
    let ctx = TestContext::new("isolated_output_directories");
    let config = ctx.config();
    let scenarios = catalog::filter(
        catalog::builtin(&config.program_name, &config.version),
        Some("translation_of"),
    );
    assert_eq!(scenarios.len(), 3);

    for s in &scenarios {
        let outcome = scenario::run_scenario(&config, s).await.expect("harness error");
        assert!(outcome.passed(), "{}: {:?}", s.name, outcome.mismatches);
    }

    let root = ctx.output_root();
    assert!(root.join("translation_of_images").join("result.mhd").is_file());
    assert!(!root.join("translation_of_images").join("outputpoints.txt").exists());
    assert!(root
        .join("translation_of_points")
        .join("out")
        .join("outputpoints.txt")
        .is_file());
    assert!(root
        .join("translation_of_images_and_points")
        .join("result.mhd")
        .is_file());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let ctx = TestContext::new("rerun_is_idempotent");
    let config = ctx.config();
    let points = catalog::filter(
        catalog::builtin(&config.program_name, &config.version),
        Some("translation_of_points"),
    );

    for _ in 0..2 {
        let outcome = scenario::run_scenario(&config, &points[0])
            .await
            .expect("harness error");
        assert!(outcome.passed(), "{:?}", outcome.mismatches);
    }
}

#[test]
fn test_mock_result_matches_reference_image() {
    let ctx = TestContext::new("mock_result_matches_reference");
    let out = ctx.temp_dir.join("result");
    fs::create_dir_all(&out).unwrap();

    let status = Command::new(&ctx.mock_bin)
        .arg("-in")
        .arg(ctx.data("2D_2x2_square_object_at_(2,1).mhd"))
        .arg("-tp")
        .arg(ctx.fixtures_dir.join("TransformParameters").join("Translation(1,-2).txt"))
        .arg("-out")
        .arg(&out)
        .env_remove("MOCK_TRANSFORMIX_FAULT")
        .status()
        .unwrap();
    assert!(status.success());

    let verdict = compare_image_files(
        &out.join("result.mhd"),
        &ctx.data("2D_2x2_square_object_at_(1,3).mhd"),
        DEFAULT_IMAGE_TOLERANCE,
    )
    .unwrap();
    assert!(verdict.is_ok(), "{:?}", verdict);
}

// ============== CLI ==============

#[test]
fn test_cli_run_passes_and_reports_json() {
    let ctx = TestContext::new("cli_run_passes");
    let output = ctx.run_against_mock(&["--json"], &[]);

    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));
    let summary = parse_summary(&output);
    assert_eq!(summary["passed"], 10);
    assert_eq!(summary["failed"], 0);
}

#[test]
fn test_cli_run_reads_environment() {
    let ctx = TestContext::new("cli_run_reads_environment");
    let exe = ctx.mock_bin.display().to_string();
    let out = ctx.output_root().display().to_string();
    let data = ctx.fixtures_dir.join("Data").display().to_string();

    // The banner scenarios need no data beyond the executable
    let output = ctx.harness(
        &["run", "--data-dir", &data, "--filter", "version", "--json"],
        &[("TRANSFORMIX_EXE", &exe), ("TRANSFORMIX_TEST_TEMP_DIR", &out)],
    );

    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));
    let summary = parse_summary(&output);
    assert_eq!(summary["passed"], 2);
}

#[test]
fn test_cli_wrong_version_fails() {
    let ctx = TestContext::new("cli_wrong_version_fails");
    let output = ctx.run_against_mock(&["--json"], &[("MOCK_TRANSFORMIX_FAULT", "version")]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(failed_names(&parse_summary(&output)), vec!["version"]);
}

#[test]
fn test_cli_shifted_image_fails_only_image_scenarios() {
    let ctx = TestContext::new("cli_shifted_image_fails");
    let output = ctx.run_against_mock(
        &["--json", "--filter", "translation_of"],
        &[("MOCK_TRANSFORMIX_FAULT", "shift")],
    );

    assert_eq!(output.status.code(), Some(1));
    let summary = parse_summary(&output);
    let failed = failed_names(&summary);
    assert!(failed.contains(&"translation_of_images".to_string()));
    assert!(failed.contains(&"translation_of_images_and_points".to_string()));
}

#[test]
fn test_cli_changed_points_format_fails() {
    let ctx = TestContext::new("cli_changed_points_format_fails");
    let output = ctx.run_against_mock(
        &["--json", "--filter", "points"],
        &[("MOCK_TRANSFORMIX_FAULT", "points")],
    );

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        failed_names(&parse_summary(&output)),
        vec!["translation_of_points", "translation_of_images_and_points"]
    );
}

#[test]
fn test_cli_stderr_noise_fails_banners() {
    let ctx = TestContext::new("cli_stderr_noise_fails_banners");
    let output = ctx.run_against_mock(
        &["--json", "--filter", "help"],
        &[("MOCK_TRANSFORMIX_FAULT", "stderr")],
    );

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(failed_names(&parse_summary(&output)), vec!["help"]);
}

#[test]
fn test_cli_crashing_translation_is_fatal() {
    let ctx = TestContext::new("cli_crashing_translation_is_fatal");
    let output = ctx.run_against_mock(
        &["--filter", "translation_of_images"],
        &[("MOCK_TRANSFORMIX_FAULT", "crash")],
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Segmentation fault"), "{}", stderr(&output));
}

#[test]
fn test_cli_missing_executable_is_fatal() {
    let ctx = TestContext::new("cli_missing_executable_is_fatal");
    let missing = ctx.temp_dir.join("no-such-transformix");
    let missing = missing.display().to_string();
    let out = ctx.output_root().display().to_string();

    let output = ctx.harness(&["run", "--exe", &missing, "--output-root", &out], &[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("no-such-transformix"));
}

#[test]
fn test_cli_missing_environment_is_fatal() {
    let ctx = TestContext::new("cli_missing_environment_is_fatal");
    let exe = ctx.mock_bin.display().to_string();

    let output = ctx.harness(&["run", "--exe", &exe], &[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("TRANSFORMIX_TEST_TEMP_DIR"));
}

#[test]
fn test_cli_list_prints_catalog() {
    let ctx = TestContext::new("cli_list_prints_catalog");
    let output = ctx.harness(&["list"], &[]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 10);
    assert!(text.contains("missing_tp_commandline_option"));
}

#[test]
fn test_cli_scenario_file() {
    let ctx = TestContext::new("cli_scenario_file");
    let file = ctx.temp_dir.join("scenarios.yaml");
    fs::write(
        &file,
        r#"
scenarios:
  - name: points_only
    args: ["-def", "{data}/2D_unit_square_corner_points.txt", "-tp", "{params}/Translation(1,-2).txt", "-out", "{out}"]
    exit: success
    artifacts:
      - kind: exact_file
        produced: outputpoints.txt
        expected: outputpoints.txt
"#,
    )
    .unwrap();
    let file = file.display().to_string();

    let output = ctx.run_against_mock(&["--scenarios", &file, "--json"], &[]);

    assert_eq!(output.status.code(), Some(0), "stderr:\n{}", stderr(&output));
    assert_eq!(parse_summary(&output)["passed"], 1);
}

#[test]
fn test_cli_compare_commands() {
    let ctx = TestContext::new("cli_compare_commands");
    let a = ctx.data("2D_2x2_square_object_at_(2,1).mhd").display().to_string();
    let b = ctx.data("2D_2x2_square_object_at_(1,3).mhd").display().to_string();

    assert_eq!(ctx.harness(&["compare-images", &a, &a], &[]).status.code(), Some(0));
    let moved = ctx.harness(&["compare-images", &a, &b], &[]);
    assert_eq!(moved.status.code(), Some(1));
    assert!(stdout(&moved).contains("8 of 30"), "{}", stdout(&moved));

    let points = ctx
        .fixtures_dir
        .join("ExpectedOutput")
        .join("outputpoints.txt");
    let combined = ctx
        .fixtures_dir
        .join("ExpectedOutput")
        .join("translation_of_images_and_points")
        .join("outputpoints.txt");
    let points_s = points.display().to_string();
    let combined_s = combined.display().to_string();
    assert_eq!(
        ctx.harness(&["compare-files", &points_s, &combined_s], &[])
            .status
            .code(),
        Some(0)
    );
    assert!(compare_files(&points, &combined).unwrap().is_ok());
}

#[test]
fn test_cli_compare_images_rejects_invalid_tolerance() {
    let ctx = TestContext::new("cli_compare_images_invalid_tolerance");
    let a = ctx.data("2D_2x2_square_object_at_(2,1).mhd").display().to_string();

    for tolerance in ["-1", "NaN"] {
        let output = ctx.harness(&["compare-images", &a, &a, "--tolerance", tolerance], &[]);
        assert_eq!(output.status.code(), Some(2), "tolerance {tolerance}");
        assert!(stderr(&output).contains("tolerance"), "{}", stderr(&output));
    }
}

#[test]
fn test_cli_inspect() {
    let ctx = TestContext::new("cli_inspect");
    let image = ctx.data("2D_2x2_square_object_at_(2,1).mhd").display().to_string();

    let output = ctx.harness(&["inspect", &image], &[]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("Size:       [5, 6]"), "{}", text);
    assert!(text.contains("MET_FLOAT"), "{}", text);
    assert!(text.contains("Range:      [0, 1]"), "{}", text);
}
