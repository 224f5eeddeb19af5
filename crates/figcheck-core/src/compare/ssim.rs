//! SSIM (Structural Similarity Index) computation.

use image::RgbImage;

use super::{round_f64, FLOAT_PRECISION};

/// c1 = (K1 * L)^2 where K1 = 0.01, L = 255
const SSIM_C1: f64 = 6.5025;
/// c2 = (K2 * L)^2 where K2 = 0.03, L = 255
const SSIM_C2: f64 = 58.5225;

const SSIM_WINDOW_SIZE: usize = 8;

/// Calculate mean SSIM over non-overlapping 8x8 luminance windows.
///
/// Images smaller than one window are compared globally. Mismatched
/// dimensions yield 0.0.
pub fn calculate_ssim(expected: &RgbImage, actual: &RgbImage) -> f64 {
    if expected.dimensions() != actual.dimensions() {
        return 0.0;
    }

    let (width, height) = expected.dimensions();
    let w = width as usize;
    let h = height as usize;

    let lum_a = to_luminance(expected);
    let lum_b = to_luminance(actual);

    let win = SSIM_WINDOW_SIZE;
    let num_windows_x = w / win;
    let num_windows_y = h / win;

    if num_windows_x == 0 || num_windows_y == 0 {
        return round_f64(compute_ssim_window(&lum_a, &lum_b), FLOAT_PRECISION);
    }

    let mut ssim_sum = 0.0;
    let mut win_a = Vec::with_capacity(win * win);
    let mut win_b = Vec::with_capacity(win * win);

    for wy in 0..num_windows_y {
        for wx in 0..num_windows_x {
            win_a.clear();
            win_b.clear();
            for dy in 0..win {
                let row = (wy * win + dy) * w + wx * win;
                win_a.extend_from_slice(&lum_a[row..row + win]);
                win_b.extend_from_slice(&lum_b[row..row + win]);
            }
            ssim_sum += compute_ssim_window(&win_a, &win_b);
        }
    }

    round_f64(
        ssim_sum / (num_windows_x * num_windows_y) as f64,
        FLOAT_PRECISION,
    )
}

/// ITU-R BT.601 luminance, 0..255.
fn to_luminance(img: &RgbImage) -> Vec<f64> {
    img.pixels()
        .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
        .collect()
}

fn compute_ssim_window(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if n == 0.0 {
        return 0.0;
    }

    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut var_a = 0.0;
    let mut var_b = 0.0;
    let mut cov_ab = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        var_a += da * da;
        var_b += db * db;
        cov_ab += da * db;
    }
    var_a /= n;
    var_b /= n;
    cov_ab /= n;

    let numerator = (2.0 * mean_a * mean_b + SSIM_C1) * (2.0 * cov_ab + SSIM_C2);
    let denominator = (mean_a * mean_a + mean_b * mean_b + SSIM_C1) * (var_a + var_b + SSIM_C2);

    if denominator > 0.0 {
        numerator / denominator
    } else {
        1.0
    }
}
