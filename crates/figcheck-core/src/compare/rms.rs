//! Root-mean-square pixel difference.

use image::RgbImage;

use super::{round_f64, FLOAT_PRECISION};

/// Calculate the RMS difference between two equally sized RGB images.
///
/// Every channel sample counts once, so a single pixel off by 255 in one
/// channel of an `n`-pixel image yields `255 / sqrt(3n)`.
pub fn calculate_rms(expected: &RgbImage, actual: &RgbImage) -> f64 {
    let a = expected.as_raw();
    let b = actual.as_raw();
    if a.is_empty() || a.len() != b.len() {
        return f64::INFINITY;
    }

    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();

    round_f64((sum_sq / a.len() as f64).sqrt(), FLOAT_PRECISION)
}
