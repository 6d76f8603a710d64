//! Harness configuration
//!
//! The configuration is resolved exactly once per run and then passed by
//! reference to every scenario. Precedence, highest first: CLI flags,
//! environment variables, the TOML config file, built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::{self, config_path, EXE_ENV, TEMP_DIR_ENV};
use super::{Error, Result};

/// Maximum absolute pixel difference accepted by the image comparator
pub const DEFAULT_IMAGE_TOLERANCE: f64 = 3.0878078e-16;

/// Program name printed by the executable in its banners
pub const DEFAULT_PROGRAM_NAME: &str = "transformix";

/// Version the executable is expected to report
pub const DEFAULT_VERSION: &str = "5.0.1";

/// Contents of the optional TOML config file
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Path to the executable under test
    pub executable: Option<PathBuf>,

    /// Writable root for per-scenario output directories
    pub output_root: Option<PathBuf>,

    /// Canonical input data directory
    pub data_dir: Option<PathBuf>,

    /// Transform parameter directory
    pub parameter_dir: Option<PathBuf>,

    /// Expected output directory
    pub expected_dir: Option<PathBuf>,

    /// Program name used in banners and error text
    pub program_name: Option<String>,

    /// Expected `--version` string
    pub version: Option<String>,

    /// Comparator settings
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

/// Comparator settings
#[derive(Debug, Deserialize)]
pub struct ComparisonConfig {
    /// Absolute tolerance for pixel comparison
    #[serde(default = "default_image_tolerance")]
    pub image_tolerance: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            image_tolerance: default_image_tolerance(),
        }
    }
}

fn default_image_tolerance() -> f64 {
    DEFAULT_IMAGE_TOLERANCE
}

impl ConfigFile {
    /// Load the config file at `path`, or the default location when `None`
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicitly requested file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(Error::Config(format!(
                    "Config file '{}' does not exist",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, e))?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

/// Values supplied on the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub executable: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub parameter_dir: Option<PathBuf>,
    pub expected_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Read-only configuration shared by all scenarios of a run
#[derive(Debug, Clone, Serialize)]
pub struct HarnessConfig {
    /// Executable under test, validated to exist
    pub executable: PathBuf,
    /// Root below which every scenario gets its own directory
    pub output_root: PathBuf,
    /// Canonical input images and point lists
    pub data_dir: PathBuf,
    /// Transform parameter files
    pub parameter_dir: PathBuf,
    /// Expected output files
    pub expected_dir: PathBuf,
    /// Program name, e.g. `transformix`
    pub program_name: String,
    /// Expected version string, e.g. `5.0.1`
    pub version: String,
    /// Absolute pixel tolerance for image comparison
    pub image_tolerance: f64,
}

impl HarnessConfig {
    /// Resolve the configuration from flags, process environment and config file
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = ConfigFile::load(overrides.config.as_deref())?;
        Self::resolve_with(overrides, file, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with<F>(overrides: &Overrides, file: ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let executable = overrides
            .executable
            .clone()
            .or_else(|| env(EXE_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
            .or(file.executable)
            .ok_or(Error::MissingEnv(EXE_ENV, "the transformix executable"))?;

        let output_root = overrides
            .output_root
            .clone()
            .or_else(|| env(TEMP_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
            .or(file.output_root)
            .ok_or(Error::MissingEnv(
                TEMP_DIR_ENV,
                "a writable directory for scenario outputs",
            ))?;

        let image_tolerance = file.comparison.image_tolerance;
        if !crate::compare::is_valid_tolerance(image_tolerance) {
            return Err(Error::Config(format!(
                "image_tolerance must be a non-negative number, got {}",
                image_tolerance
            )));
        }

        Ok(Self {
            executable: resolve_executable(&executable)?,
            output_root,
            data_dir: overrides
                .data_dir
                .clone()
                .or(file.data_dir)
                .unwrap_or_else(paths::default_data_dir),
            parameter_dir: overrides
                .parameter_dir
                .clone()
                .or(file.parameter_dir)
                .unwrap_or_else(paths::default_parameter_dir),
            expected_dir: overrides
                .expected_dir
                .clone()
                .or(file.expected_dir)
                .unwrap_or_else(paths::default_expected_dir),
            program_name: file
                .program_name
                .unwrap_or_else(|| DEFAULT_PROGRAM_NAME.to_string()),
            version: file.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            image_tolerance,
        })
    }
}

/// Validate the executable path
///
/// Bare names (no directory component) are looked up in `PATH`.
pub fn resolve_executable(path: &Path) -> Result<PathBuf> {
    let is_bare = path.components().count() == 1 && !path.exists();
    if is_bare {
        return which::which(path).map_err(|e| Error::ExecutableNotFound {
            path: path.to_path_buf(),
            reason: e.to_string(),
        });
    }

    let metadata = std::fs::metadata(path).map_err(|e| Error::ExecutableNotFound {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !metadata.is_file() {
        return Err(Error::ExecutableNotFound {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(Error::ExecutableNotFound {
                path: path.to_path_buf(),
                reason: "missing execute permission".to_string(),
            });
        }
    }

    Ok(path.to_path_buf())
}
