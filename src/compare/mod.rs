//! Artifact comparators
//!
//! Each comparator is total and deterministic. A comparator never returns
//! `Err` for "the artifacts differ"; that is a [`Mismatch`]. `Err` is kept
//! for problems with the expected side (unreadable reference data), which
//! are harness-fatal.

pub mod file;
pub mod image;
pub mod text;

use serde::Serialize;
use std::fmt;

pub use file::{compare_bytes, compare_files};
pub use image::{compare_image_files, compare_images, is_valid_tolerance};
pub use text::{contains_all, exact_text, StreamExpectation};

/// A failed check inside a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// What was checked, e.g. `stderr` or `result.mhd`
    pub check: String,
    /// Human readable description of the difference
    pub detail: String,
}

impl Mismatch {
    pub fn new(check: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.check, self.detail)
    }
}

/// Outcome of a single comparison
pub type Verdict = std::result::Result<(), Mismatch>;

/// Shorten long text for a report line
pub(crate) fn excerpt(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() > LIMIT {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_display() {
        let m = Mismatch::new("stdout", "expected 'a', got 'b'");
        assert_eq!(m.to_string(), "stdout: expected 'a', got 'b'");
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        let short = excerpt(&long);
        assert_eq!(short.len(), 203);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }
}
