//! Tolerance-based image comparison.
//!
//! A result image matches its baseline when the root-mean-square difference
//! of their 8-bit RGB samples is at most the tolerance. Mismatches produce a
//! [`ComparisonError`] diagnostic annotated with SSIM and a diff image; they
//! are values, not errors, so a caller can collect several per script.
//!
//! - RMS over all channel samples, 0..255 scale
//! - SSIM over 8x8 luminance windows (reported, not gated)
//! - Diff image: absolute difference scaled x10

mod diff;
mod rms;
mod ssim;

#[cfg(test)]
mod tests;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FigcheckError, FigcheckResult};

pub use diff::{diff_path_for, write_diff_image};
pub use rms::calculate_rms;
pub use ssim::calculate_ssim;

/// Precision for floating point values in diagnostics.
const FLOAT_PRECISION: i32 = 6;

/// Round a float to the specified number of decimal places.
fn round_f64(value: f64, decimals: i32) -> f64 {
    let multiplier = 10_f64.powi(decimals);
    (value * multiplier).round() / multiplier
}

/// Why a result image was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// RMS difference exceeded the tolerance.
    Rms,
    /// Images have different dimensions.
    SizeMismatch,
}

/// Diagnostic for one figure that does not match its baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonError {
    /// Figure number within the script, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figure: Option<u32>,
    /// Kind of mismatch.
    pub kind: MismatchKind,
    /// Baseline image path.
    pub expected: PathBuf,
    /// Result image path.
    pub actual: PathBuf,
    /// RMS difference (absent for size mismatches).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms: Option<f64>,
    /// Tolerance the RMS was checked against.
    pub tolerance: f64,
    /// Structural similarity, 1.0 = identical.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssim: Option<f64>,
    /// Diff image written next to the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<PathBuf>,
}

impl ComparisonError {
    /// Attaches the figure number this diagnostic belongs to.
    pub fn for_figure(mut self, number: u32) -> Self {
        self.figure = Some(number);
        self
    }
}

impl fmt::Display for ComparisonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MismatchKind::Rms => write!(
                f,
                "images not close (RMS {:.3} > tol {}): {} vs {}",
                self.rms.unwrap_or(f64::NAN),
                self.tolerance,
                self.expected.display(),
                self.actual.display()
            ),
            MismatchKind::SizeMismatch => write!(
                f,
                "image sizes do not match: {} vs {}",
                self.expected.display(),
                self.actual.display()
            ),
        }
    }
}

/// Full set of metrics for one image pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetrics {
    /// Width of both images.
    pub width: u32,
    /// Height of both images.
    pub height: u32,
    /// RMS difference on the 0..255 scale.
    pub rms: f64,
    /// Structural similarity.
    pub ssim: f64,
    /// Whether the files are byte-identical.
    pub identical: bool,
    /// BLAKE3 hash of the baseline file.
    pub hash_expected: String,
    /// BLAKE3 hash of the result file.
    pub hash_actual: String,
}

/// Compare a result image against its baseline.
///
/// Returns `Ok(None)` when the images match within `tolerance`, and
/// `Ok(Some(diagnostic))` when they do not. A missing baseline or an
/// undecodable file is an error rather than a diagnostic.
pub fn compare_images(
    baseline: &Path,
    result: &Path,
    tolerance: f64,
) -> FigcheckResult<Option<ComparisonError>> {
    if !baseline.exists() {
        return Err(FigcheckError::BaselineNotFound {
            path: baseline.to_path_buf(),
        });
    }

    let expected_bytes = fs::read(baseline)?;
    let actual_bytes = fs::read(result)?;
    if expected_bytes == actual_bytes {
        return Ok(None);
    }

    let expected = decode_rgb(&expected_bytes, baseline)?;
    let actual = decode_rgb(&actual_bytes, result)?;

    if expected.dimensions() != actual.dimensions() {
        return Ok(Some(ComparisonError {
            figure: None,
            kind: MismatchKind::SizeMismatch,
            expected: baseline.to_path_buf(),
            actual: result.to_path_buf(),
            rms: None,
            tolerance,
            ssim: None,
            diff: None,
        }));
    }

    let rms = calculate_rms(&expected, &actual);
    if rms <= tolerance {
        return Ok(None);
    }

    let diff_path = diff_path_for(result);
    write_diff_image(&expected, &actual, &diff_path)?;

    Ok(Some(ComparisonError {
        figure: None,
        kind: MismatchKind::Rms,
        expected: baseline.to_path_buf(),
        actual: result.to_path_buf(),
        rms: Some(rms),
        tolerance,
        ssim: Some(calculate_ssim(&expected, &actual)),
        diff: Some(diff_path),
    }))
}

/// Compute every metric for two images without applying a tolerance.
///
/// Fails when the images cannot be read or have different dimensions.
pub fn measure_images(baseline: &Path, result: &Path) -> FigcheckResult<ImageMetrics> {
    let expected_bytes = fs::read(baseline)?;
    let actual_bytes = fs::read(result)?;
    let identical = expected_bytes == actual_bytes;

    let expected = decode_rgb(&expected_bytes, baseline)?;
    let actual = decode_rgb(&actual_bytes, result)?;

    if expected.dimensions() != actual.dimensions() {
        return Err(FigcheckError::SizeMismatch {
            expected: expected.dimensions(),
            actual: actual.dimensions(),
        });
    }

    let (width, height) = expected.dimensions();
    Ok(ImageMetrics {
        width,
        height,
        rms: calculate_rms(&expected, &actual),
        ssim: calculate_ssim(&expected, &actual),
        identical,
        hash_expected: blake3::hash(&expected_bytes).to_hex().to_string(),
        hash_actual: blake3::hash(&actual_bytes).to_hex().to_string(),
    })
}

fn decode_rgb(bytes: &[u8], path: &Path) -> FigcheckResult<RgbImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|source| FigcheckError::ImageRead {
            path: path.to_path_buf(),
            source,
        })
}
