//! Per-scenario filesystem fixture
//!
//! Every scenario writes into `<output root>/<scenario name>`. Inputs,
//! transform parameters and expected outputs live in shared directories
//! that the harness only ever reads.

use std::path::{Path, PathBuf};

use crate::common::{Error, HarnessConfig, Result};

/// Placeholder for the scenario's output directory
pub const OUT: &str = "{out}";
/// Placeholder for the canonical input data directory
pub const DATA: &str = "{data}";
/// Placeholder for the transform parameter directory
pub const PARAMS: &str = "{params}";
/// Placeholder for the expected output directory
pub const EXPECTED: &str = "{expected}";

/// Isolated output space for one scenario
#[derive(Debug)]
pub struct Fixture<'a> {
    config: &'a HarnessConfig,
    output_dir: PathBuf,
}

impl<'a> Fixture<'a> {
    /// Create (or reuse) the output directory for `name`
    pub fn new(config: &'a HarnessConfig, name: &str) -> Result<Self> {
        validate_name(name)?;
        let output_dir = config.output_root.join(name);
        create_dir(&output_dir)?;
        tracing::debug!(scenario = name, dir = %output_dir.display(), "Fixture ready");
        Ok(Self { config, output_dir })
    }

    /// Directory owned by this scenario
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create (or reuse) a directory below the scenario's output directory
    pub fn output_subdir(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(Error::Config(format!(
                "Output sub-directory '{}' must stay inside the scenario directory",
                relative
            )));
        }
        let dir = self.output_dir.join(rel);
        create_dir(&dir)?;
        Ok(dir)
    }

    /// Replace `{out}`, `{data}`, `{params}` and `{expected}` in a template
    pub fn expand(&self, template: &str) -> String {
        template
            .replace(OUT, &self.output_dir.display().to_string())
            .replace(DATA, &self.config.data_dir.display().to_string())
            .replace(PARAMS, &self.config.parameter_dir.display().to_string())
            .replace(EXPECTED, &self.config.expected_dir.display().to_string())
    }

    /// Expand a template that names a produced file, relative to `{out}`
    /// unless it carries its own placeholder or is absolute
    pub fn expand_output_path(&self, template: &str) -> PathBuf {
        self.expand_path(template, &self.output_dir)
    }

    /// Expand a template that names a reference file, relative to `{expected}`
    /// unless it carries its own placeholder or is absolute
    pub fn expand_expected_path(&self, template: &str) -> PathBuf {
        self.expand_path(template, &self.config.expected_dir)
    }

    fn expand_path(&self, template: &str, base: &Path) -> PathBuf {
        let expanded = PathBuf::from(self.expand(template));
        if expanded.is_absolute() || template.starts_with('{') {
            expanded
        } else {
            base.join(expanded)
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if bad {
        return Err(Error::invalid_scenario(
            name,
            "name must be a single path component",
        ));
    }
    Ok(())
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| Error::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{DEFAULT_IMAGE_TOLERANCE, DEFAULT_PROGRAM_NAME, DEFAULT_VERSION};

    fn config(root: &Path) -> HarnessConfig {
        HarnessConfig {
            executable: PathBuf::from("/bin/true"),
            output_root: root.join("outputs"),
            data_dir: PathBuf::from("/data"),
            parameter_dir: PathBuf::from("/params"),
            expected_dir: PathBuf::from("/expected"),
            program_name: DEFAULT_PROGRAM_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
            image_tolerance: DEFAULT_IMAGE_TOLERANCE,
        }
    }

    #[test]
    fn test_creates_directory_named_after_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let fixture = Fixture::new(&cfg, "translation_of_images").unwrap();
        assert_eq!(
            fixture.output_dir(),
            tmp.path().join("outputs").join("translation_of_images")
        );
        assert!(fixture.output_dir().is_dir());
    }

    #[test]
    fn test_existing_directory_is_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let first = Fixture::new(&cfg, "help").unwrap();
        std::fs::write(first.output_dir().join("left-over"), "x").unwrap();

        let second = Fixture::new(&cfg, "help").unwrap();
        assert!(second.output_dir().join("left-over").exists());
    }

    #[test]
    fn test_rejects_path_like_names() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        for name in ["", "..", "a/b"] {
            assert!(Fixture::new(&cfg, name).is_err(), "{name:?} accepted");
        }
    }

    #[test]
    fn test_expand_placeholders() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let fixture = Fixture::new(&cfg, "points").unwrap();

        assert_eq!(
            fixture.expand("{data}/2D_unit_square_corner_points.txt"),
            "/data/2D_unit_square_corner_points.txt"
        );
        assert_eq!(
            fixture.expand("{params}/Translation(1,-2).txt"),
            "/params/Translation(1,-2).txt"
        );
        assert_eq!(
            fixture.expand("{out}/out"),
            format!("{}/out", fixture.output_dir().display())
        );
        assert_eq!(fixture.expand("-tp"), "-tp");
    }

    #[test]
    fn test_relative_artifact_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let fixture = Fixture::new(&cfg, "images").unwrap();

        assert_eq!(
            fixture.expand_output_path("result.mhd"),
            fixture.output_dir().join("result.mhd")
        );
        assert_eq!(
            fixture.expand_expected_path("outputpoints.txt"),
            PathBuf::from("/expected/outputpoints.txt")
        );
        assert_eq!(
            fixture.expand_expected_path("{data}/2D_2x2_square_object_at_(1,3).mhd"),
            PathBuf::from("/data/2D_2x2_square_object_at_(1,3).mhd")
        );
    }

    #[test]
    fn test_subdir_must_stay_inside() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let fixture = Fixture::new(&cfg, "points").unwrap();
        assert!(fixture.output_subdir("out").unwrap().is_dir());
        assert!(fixture.output_subdir("../escape").is_err());
    }
}
