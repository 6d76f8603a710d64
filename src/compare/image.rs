//! Image equivalence
//!
//! Descriptors must match exactly; pixels must match within an absolute
//! tolerance with no relative term. The descriptor check runs first and a
//! descriptor mismatch skips the pixel pass entirely.

use std::path::Path;

use super::{Mismatch, Verdict};
use crate::common::{Error, Result};
use crate::image::{read_image, Image};

/// Whether two samples agree within `tolerance`
///
/// Symmetric in `a` and `b`. NaN never agrees; equal infinities do.
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a - b).abs() <= tolerance
}

/// Tolerances must be finite and non-negative
pub fn is_valid_tolerance(tolerance: f64) -> bool {
    tolerance.is_finite() && tolerance >= 0.0
}

/// Compare two decoded images
pub fn compare_images(check: &str, actual: &Image, expected: &Image, tolerance: f64) -> Verdict {
    let diffs = actual.descriptor.differences(&expected.descriptor);
    if !diffs.is_empty() {
        return Err(Mismatch::new(
            check,
            format!("image information differs: {}", diffs.join("; ")),
        ));
    }

    if actual.pixels.len() != expected.pixels.len() {
        return Err(Mismatch::new(
            check,
            format!(
                "pixel buffers differ in length: {} vs {}",
                actual.pixels.len(),
                expected.pixels.len()
            ),
        ));
    }

    let mut differing = 0usize;
    let mut max_diff = 0.0f64;
    let mut first: Option<usize> = None;

    for (i, (&a, &e)) in actual.pixels.iter().zip(&expected.pixels).enumerate() {
        if !within_tolerance(a, e, tolerance) {
            differing += 1;
            first.get_or_insert(i);
            let d = (a - e).abs();
            if d.is_nan() || d > max_diff {
                max_diff = d;
            }
        }
    }

    match first {
        None => Ok(()),
        Some(i) => {
            let components = actual.descriptor.components.max(1);
            let index = actual.descriptor.grid_index(i / components);
            Err(Mismatch::new(
                check,
                format!(
                    "{} of {} samples exceed tolerance {:e} (max abs difference {:e}); first at index {:?}: {} vs {}",
                    differing,
                    actual.pixels.len(),
                    tolerance,
                    max_diff,
                    index,
                    actual.pixels[i],
                    expected.pixels[i]
                ),
            ))
        }
    }
}

/// Read and compare a produced image with a reference image
///
/// An unreadable produced image is a mismatch. An unreadable reference
/// image is a harness error.
pub fn compare_image_files(actual: &Path, expected: &Path, tolerance: f64) -> Result<Verdict> {
    let check = actual
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| actual.display().to_string());

    let expected_image = read_image(expected)?;
    let actual_image = match read_image(actual) {
        Ok(img) => img,
        Err(Error::FileRead { path, source }) => {
            return Ok(Err(Mismatch::new(
                check,
                format!("cannot read produced image '{}': {}", path.display(), source),
            )))
        }
        Err(e) => return Ok(Err(Mismatch::new(check, e.to_string()))),
    };

    let verdict = compare_images(&check, &actual_image, &expected_image, tolerance);
    tracing::debug!(
        actual = %actual.display(),
        expected = %expected.display(),
        equal = verdict.is_ok(),
        "Compared images"
    );
    Ok(verdict)
}
