//! Error types for the conformance harness
//!
//! Everything in here is harness-fatal: a broken environment, a missing
//! executable, an unwritable output root. Assertion failures inside a
//! scenario are not errors, they are [`crate::compare::Mismatch`] values
//! carried by the scenario outcome.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Environment Errors ===
    #[error("Environment variable {0} is not set. Point it at {1} or pass the matching CLI flag")]
    MissingEnv(&'static str, &'static str),

    #[error("Executable '{}' not found or not executable: {reason}", path.display())]
    ExecutableNotFound { path: PathBuf, reason: String },

    // === Process Errors ===
    #[error("Failed to spawn '{}': {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' was required to succeed but exited with {code}\nstderr: {stderr}")]
    RequiredSuccess {
        command: String,
        code: String,
        stderr: String,
    },

    // === Filesystem Errors ===
    #[error("Cannot create output directory '{}': {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read file '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Image Errors ===
    #[error("Invalid MetaImage header '{}': {reason}", path.display())]
    ImageHeader { path: PathBuf, reason: String },

    #[error("Invalid MetaImage data for '{}': {reason}", path.display())]
    ImageData { path: PathBuf, reason: String },

    // === Scenario Errors ===
    #[error("Invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error("Duplicate scenario name '{0}'. Every scenario needs its own output directory")]
    DuplicateScenario(String),

    #[error("No scenario matches filter '{0}'")]
    NoScenarios(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file read error
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create an image header error
    pub fn image_header(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ImageHeader {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an image data error
    pub fn image_data(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ImageData {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid scenario error
    pub fn invalid_scenario(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidScenario {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_names_variable() {
        let e = Error::MissingEnv("TRANSFORMIX_EXE", "the transformix executable");
        let msg = e.to_string();
        assert!(msg.contains("TRANSFORMIX_EXE"));
        assert!(msg.contains("the transformix executable"));
    }

    #[test]
    fn test_required_success_includes_stderr() {
        let e = Error::RequiredSuccess {
            command: "transformix --version".to_string(),
            code: "exit status 3".to_string(),
            stderr: "boom".to_string(),
        };
        assert!(e.to_string().contains("boom"));
    }
}
