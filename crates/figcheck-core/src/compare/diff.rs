//! Visual diff images for failed comparisons.

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

use crate::error::{FigcheckError, FigcheckResult};

/// Amplification applied to per-channel differences so faint changes show up.
const DIFF_GAIN: u16 = 10;

/// Path of the diff image for a result: `<stem>-failed-diff.png` beside it.
pub fn diff_path_for(result: &Path) -> PathBuf {
    let stem = result
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    result.with_file_name(format!("{stem}-failed-diff.png"))
}

/// Write the amplified absolute difference of two equally sized images.
pub fn write_diff_image(expected: &RgbImage, actual: &RgbImage, path: &Path) -> FigcheckResult<()> {
    let (width, height) = expected.dimensions();
    let diff = RgbImage::from_fn(width, height, |x, y| {
        let a = expected.get_pixel(x, y);
        let b = actual.get_pixel(x, y);
        Rgb(std::array::from_fn(|c| {
            let d = a[c].abs_diff(b[c]) as u16 * DIFF_GAIN;
            d.min(255) as u8
        }))
    });

    diff.save(path).map_err(|source| FigcheckError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}
