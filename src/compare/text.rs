//! Text comparison for standard streams and banners
//!
//! Exact comparison trims whitespace at the outer edges only, never per
//! line. Banners carry build-specific metadata, so they are checked by
//! substring containment instead.

use serde::{Deserialize, Serialize};

use super::{excerpt, Mismatch, Verdict};

/// Expectation on one standard stream
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum StreamExpectation {
    /// Not checked
    #[default]
    Any,
    /// No bytes at all
    Empty,
    /// Equal after trimming outer whitespace
    Exact(String),
    /// Contains the substring
    Contains(String),
    /// Contains every substring, in any order
    ContainsAll(Vec<String>),
}

impl StreamExpectation {
    /// Check captured stream bytes against this expectation
    pub fn check(&self, stream: &str, actual: &[u8]) -> Verdict {
        match self {
            Self::Any => Ok(()),
            Self::Empty => {
                if actual.is_empty() {
                    Ok(())
                } else {
                    Err(Mismatch::new(
                        stream,
                        format!(
                            "expected no output, got '{}'",
                            excerpt(&String::from_utf8_lossy(actual))
                        ),
                    ))
                }
            }
            Self::Exact(expected) => exact_text(stream, actual, expected),
            Self::Contains(needle) => contains_all(stream, actual, std::slice::from_ref(needle)),
            Self::ContainsAll(needles) => contains_all(stream, actual, needles),
        }
    }
}

/// Equal iff identical after trimming leading and trailing whitespace
pub fn exact_text(check: &str, actual: &[u8], expected: &str) -> Verdict {
    let actual = String::from_utf8_lossy(actual);
    if actual.trim() == expected.trim() {
        Ok(())
    } else {
        Err(Mismatch::new(
            check,
            format!(
                "expected '{}', got '{}'",
                expected.trim(),
                excerpt(actual.trim())
            ),
        ))
    }
}

/// Every needle must occur verbatim somewhere in `actual`
pub fn contains_all(check: &str, actual: &[u8], needles: &[String]) -> Verdict {
    let actual = String::from_utf8_lossy(actual);
    let missing: Vec<&str> = needles
        .iter()
        .filter(|n| !actual.contains(n.as_str()))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Mismatch::new(
            check,
            format!(
                "missing {:?} in '{}'",
                missing,
                excerpt(actual.trim())
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_trims_outer_whitespace_only() {
        assert!(exact_text("stdout", b"\n  hello world \r\n", "hello world").is_ok());
        assert!(exact_text("stdout", b"a\n b", "a\nb").is_err());
    }

    #[test]
    fn test_exact_reports_both_sides() {
        let m = exact_text("stderr", b"nope", "ERROR: x").unwrap_err();
        assert_eq!(m.check, "stderr");
        assert!(m.detail.contains("ERROR: x"));
        assert!(m.detail.contains("nope"));
    }

    #[test]
    fn test_empty_is_strict() {
        assert!(StreamExpectation::Empty.check("stderr", b"").is_ok());
        assert!(StreamExpectation::Empty.check("stderr", b"\n").is_err());
    }

    #[test]
    fn test_contains_all_any_order() {
        let banner = b"ITK version: 5.1\ntransformix version: 5.0.1\nGit revision SHA: abc\n";
        let labels = vec![
            "transformix version: ".to_string(),
            "Git revision SHA: ".to_string(),
            "ITK version: ".to_string(),
        ];
        assert!(contains_all("stdout", banner, &labels).is_ok());
    }

    #[test]
    fn test_contains_all_lists_missing_labels() {
        let labels = vec!["CMake version: ".to_string(), "ITK version: ".to_string()];
        let m = contains_all("stdout", b"ITK version: 5", &labels).unwrap_err();
        assert!(m.detail.contains("CMake version: "));
        assert!(m.detail.starts_with("missing [\"CMake version: \"] in"));
    }

    #[test]
    fn test_any_accepts_everything() {
        assert!(StreamExpectation::Any.check("stdout", b"whatever").is_ok());
    }

    #[test]
    fn test_yaml_shape() {
        let e: StreamExpectation =
            serde_yaml::from_str("kind: exact\ntext: \"transformix version: 5.0.1\"").unwrap();
        assert_eq!(e, StreamExpectation::Exact("transformix version: 5.0.1".to_string()));

        let e: StreamExpectation = serde_yaml::from_str("kind: empty").unwrap();
        assert_eq!(e, StreamExpectation::Empty);
    }
}
