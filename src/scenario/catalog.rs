//! Built-in scenario catalog: the transformix command-line contract
//!
//! Every entry pairs an invocation shape with the exact observable result
//! the executable must produce for it.

use crate::compare::StreamExpectation;

use super::config::{ExitExpectation, ExpectedArtifact, Scenario};

/// Input image: a 2x2 square object at grid position (2,1)
pub const INPUT_IMAGE: &str = "2D_2x2_square_object_at_(2,1).mhd";
/// Reference image: the same object at (1,3) after `Translation(1,-2)`
pub const EXPECTED_IMAGE: &str = "2D_2x2_square_object_at_(1,3).mhd";
/// Four corner points of the unit square
pub const INPUT_POINTS: &str = "2D_unit_square_corner_points.txt";
/// Transform parameters of a (1,-2) translation
pub const TRANSLATION_PARAMETERS: &str = "Translation(1,-2).txt";
/// Image written by the executable
pub const RESULT_IMAGE: &str = "result.mhd";
/// Points written by the executable
pub const OUTPUT_POINTS: &str = "outputpoints.txt";

/// Labels that `--extended-version` must print, besides the program's own
pub const EXTENDED_VERSION_LABELS: [&str; 5] = [
    "Git revision SHA: ",
    "Git revision date: ",
    "Memory address size: ",
    "CMake version: ",
    "ITK version: ",
];

/// Usage hint printed when no arguments are given
pub fn usage_hint(program: &str) -> String {
    format!(
        "Use \"{} --help\" for information about {}-usage.",
        program, program
    )
}

/// Phrase that `--help` output must contain
pub fn help_phrase(program: &str) -> String {
    format!("{} applies a transform on an input image and/or", program)
}

/// Exact `--version` output
pub fn version_line(program: &str, version: &str) -> String {
    format!("{} version: {}", program, version)
}

/// Error printed for a missing mandatory option
pub fn missing_option_error(option: &str) -> String {
    format!("ERROR: No CommandLine option \"{}\" given!", option)
}

/// Error printed when none of the input options is given
pub const MISSING_INPUT_ERROR: &str = "ERROR: At least one of the CommandLine options \"-in\", \"-def\", \"-jac\", or \"-jacmat\" should be given!";

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn banner(name: &str, description: &str, flag: Option<&str>, stdout: StreamExpectation) -> Scenario {
    Scenario {
        name: name.to_string(),
        description: Some(description.to_string()),
        args: flag.map(|f| vec![f.to_string()]).unwrap_or_default(),
        output_subdirs: Vec::new(),
        exit: ExitExpectation::Success,
        stdout,
        stderr: StreamExpectation::Empty,
        artifacts: Vec::new(),
    }
}

fn rejected(name: &str, description: &str, argv: &[&str], error: String) -> Scenario {
    Scenario {
        name: name.to_string(),
        description: Some(description.to_string()),
        args: args(argv),
        output_subdirs: Vec::new(),
        exit: ExitExpectation::Failure,
        stdout: StreamExpectation::Any,
        stderr: StreamExpectation::Exact(error),
        artifacts: Vec::new(),
    }
}

fn image_artifact() -> ExpectedArtifact {
    ExpectedArtifact::Image {
        produced: RESULT_IMAGE.to_string(),
        expected: format!("{{data}}/{}", EXPECTED_IMAGE),
        tolerance: None,
    }
}

/// The full built-in catalog for `program` reporting `version`
pub fn builtin(program: &str, version: &str) -> Vec<Scenario> {
    let input_image = format!("{{data}}/{}", INPUT_IMAGE);
    let input_points = format!("{{data}}/{}", INPUT_POINTS);
    let parameters = format!("{{params}}/{}", TRANSLATION_PARAMETERS);

    let mut extended_labels = vec![format!("{} version: ", program)];
    extended_labels.extend(EXTENDED_VERSION_LABELS.iter().map(|s| s.to_string()));

    vec![
        banner(
            "without_arguments",
            "Tests executing transformix without arguments",
            None,
            StreamExpectation::Exact(usage_hint(program)),
        ),
        banner(
            "help",
            "Tests --help",
            Some("--help"),
            StreamExpectation::Contains(help_phrase(program)),
        ),
        banner(
            "version",
            "Tests --version",
            Some("--version"),
            StreamExpectation::Exact(version_line(program, version)),
        ),
        banner(
            "extended_version",
            "Tests --extended-version",
            Some("--extended-version"),
            StreamExpectation::ContainsAll(extended_labels),
        ),
        rejected(
            "missing_tp_commandline_option",
            "Tests missing -tp commandline option",
            &["-in", "InputImageFile.ext", "-out", "{out}"],
            missing_option_error("-tp"),
        ),
        rejected(
            "missing_out_commandline_option",
            "Tests missing -out commandline option",
            &["-in", "InputImageFile.ext", "-tp", "TransformParameters.txt"],
            missing_option_error("-out"),
        ),
        rejected(
            "missing_input_commandline_option",
            "Tests missing input commandline option",
            &["-tp", "TransformParameters.txt", "-out", "{out}"],
            MISSING_INPUT_ERROR.to_string(),
        ),
        Scenario {
            name: "translation_of_images".to_string(),
            description: Some("Tests translation of images".to_string()),
            args: vec![
                "-in".to_string(),
                input_image.clone(),
                "-tp".to_string(),
                parameters.clone(),
                "-out".to_string(),
                "{out}".to_string(),
            ],
            output_subdirs: Vec::new(),
            exit: ExitExpectation::Success,
            stdout: StreamExpectation::Any,
            stderr: StreamExpectation::Any,
            artifacts: vec![image_artifact()],
        },
        Scenario {
            name: "translation_of_points".to_string(),
            description: Some("Tests translation of points".to_string()),
            args: vec![
                "-def".to_string(),
                input_points.clone(),
                "-tp".to_string(),
                parameters.clone(),
                "-out".to_string(),
                "{out}/out".to_string(),
            ],
            output_subdirs: vec!["out".to_string()],
            exit: ExitExpectation::Success,
            stdout: StreamExpectation::Any,
            stderr: StreamExpectation::Any,
            artifacts: vec![ExpectedArtifact::ExactFile {
                produced: format!("out/{}", OUTPUT_POINTS),
                expected: OUTPUT_POINTS.to_string(),
            }],
        },
        Scenario {
            name: "translation_of_images_and_points".to_string(),
            description: Some("Tests translation of images and points together".to_string()),
            args: vec![
                "-in".to_string(),
                input_image,
                "-def".to_string(),
                input_points,
                "-tp".to_string(),
                parameters,
                "-out".to_string(),
                "{out}".to_string(),
            ],
            output_subdirs: Vec::new(),
            exit: ExitExpectation::Success,
            stdout: StreamExpectation::Any,
            stderr: StreamExpectation::Any,
            artifacts: vec![
                image_artifact(),
                ExpectedArtifact::ExactFile {
                    produced: OUTPUT_POINTS.to_string(),
                    expected: format!("translation_of_images_and_points/{}", OUTPUT_POINTS),
                },
            ],
        },
    ]
}

/// Keep only scenarios whose name contains `filter`
pub fn filter(scenarios: Vec<Scenario>, filter: Option<&str>) -> Vec<Scenario> {
    match filter {
        Some(f) => scenarios.into_iter().filter(|s| s.name.contains(f)).collect(),
        None => scenarios,
    }
}
