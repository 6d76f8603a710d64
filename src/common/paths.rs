//! Configuration and canonical data locations
//!
//! Default data locations follow the elastix source tree layout, relative to
//! the working directory the harness is started from:
//! - inputs: `Testing/Data`
//! - transform parameters: `Testing/PythonTests/TransformParameters`
//! - expected outputs: `Testing/PythonTests/ExpectedOutput`

use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "transformix-conformance";

/// Environment variable holding the path of the executable under test
pub const EXE_ENV: &str = "TRANSFORMIX_EXE";

/// Environment variable holding the writable root for scenario outputs
pub const TEMP_DIR_ENV: &str = "TRANSFORMIX_TEST_TEMP_DIR";

/// Default canonical input data directory
pub fn default_data_dir() -> PathBuf {
    PathBuf::from("Testing").join("Data")
}

/// Default transform parameter directory
pub fn default_parameter_dir() -> PathBuf {
    PathBuf::from("Testing")
        .join("PythonTests")
        .join("TransformParameters")
}

/// Default expected-output directory
pub fn default_expected_dir() -> PathBuf {
    PathBuf::from("Testing")
        .join("PythonTests")
        .join("ExpectedOutput")
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/transformix-conformance/`
/// - macOS: `~/Library/Application Support/transformix-conformance/`
/// - Windows: `%APPDATA%\transformix-conformance\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the default configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
