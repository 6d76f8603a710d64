//! Byte-for-byte file comparison
//!
//! No normalisation of line endings or whitespace.

use std::path::Path;

use super::{Mismatch, Verdict};
use crate::common::{Error, Result};

/// Compare two byte sequences exactly
pub fn compare_bytes(check: &str, actual: &[u8], expected: &[u8]) -> Verdict {
    if actual == expected {
        return Ok(());
    }

    let first_diff = actual
        .iter()
        .zip(expected)
        .position(|(a, e)| a != e)
        .unwrap_or_else(|| actual.len().min(expected.len()));

    Err(Mismatch::new(
        check,
        format!(
            "files differ at byte {} (actual {} bytes, expected {} bytes)",
            first_diff,
            actual.len(),
            expected.len()
        ),
    ))
}

/// Compare a produced file with a reference file
///
/// A missing or unreadable produced file is a mismatch. An unreadable
/// reference file is a harness error.
pub fn compare_files(actual: &Path, expected: &Path) -> Result<Verdict> {
    let check = actual
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| actual.display().to_string());

    let expected_bytes = std::fs::read(expected).map_err(|e| Error::file_read(expected, e))?;
    let actual_bytes = match std::fs::read(actual) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Ok(Err(Mismatch::new(
                check,
                format!("cannot read produced file '{}': {}", actual.display(), e),
            )))
        }
    };

    let verdict = compare_bytes(&check, &actual_bytes, &expected_bytes);
    tracing::debug!(
        actual = %actual.display(),
        expected = %expected.display(),
        equal = verdict.is_ok(),
        "Compared files"
    );
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bytes() {
        assert!(compare_bytes("points", b"1 2\n", b"1 2\n").is_ok());
    }

    #[test]
    fn test_line_endings_are_significant() {
        let m = compare_bytes("points", b"1 2\r\n", b"1 2\n").unwrap_err();
        assert!(m.detail.contains("byte 3"));
    }

    #[test]
    fn test_prefix_reports_length() {
        let m = compare_bytes("points", b"abc", b"abcd").unwrap_err();
        assert!(m.detail.contains("byte 3"));
        assert!(m.detail.contains("actual 3 bytes, expected 4 bytes"));
    }

    #[test]
    fn test_missing_actual_is_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let expected = tmp.path().join("expected.txt");
        std::fs::write(&expected, "x").unwrap();

        let verdict = compare_files(&tmp.path().join("outputpoints.txt"), &expected).unwrap();
        let m = verdict.unwrap_err();
        assert_eq!(m.check, "outputpoints.txt");
    }

    #[test]
    fn test_missing_expected_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let actual = tmp.path().join("actual.txt");
        std::fs::write(&actual, "x").unwrap();

        let err = compare_files(&actual, &tmp.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
