//! Unit tests for image comparison.

use super::*;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn write_png(dir: &TempDir, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.path().join(name);
    img.save(&path).unwrap();
    path
}

#[test]
fn test_rms_identical_is_zero() {
    let img = gradient(16, 16);
    assert_eq!(calculate_rms(&img, &img), 0.0);
}

#[test]
fn test_rms_single_channel_offset() {
    let a = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
    let b = RgbImage::from_pixel(4, 4, Rgb([30, 0, 0]));
    // 16 pixels * 3 samples, one third of which differ by 30
    let expected = (30.0f64 * 30.0 / 3.0).sqrt();
    assert!((calculate_rms(&a, &b) - expected).abs() < 1e-6);
}

#[test]
fn test_rms_mismatched_sizes_is_infinite() {
    let a = gradient(4, 4);
    let b = gradient(8, 8);
    assert!(calculate_rms(&a, &b).is_infinite());
}

#[test]
fn test_ssim_identical_images() {
    let img = gradient(64, 64);
    let ssim = calculate_ssim(&img, &img);
    assert!(
        (ssim - 1.0).abs() < 0.001,
        "SSIM for identical images should be 1.0, got {}",
        ssim
    );
}

#[test]
fn test_ssim_black_vs_white() {
    let a = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    let b = RgbImage::from_pixel(32, 32, Rgb([255, 255, 255]));
    let ssim = calculate_ssim(&a, &b);
    assert!(ssim < 0.1, "SSIM should be low, got {}", ssim);
}

#[test]
fn test_ssim_small_image_uses_global_window() {
    let img = gradient(3, 3);
    assert!((calculate_ssim(&img, &img) - 1.0).abs() < 0.001);
}

#[test]
fn test_compare_identical_files_match() {
    let tmp = TempDir::new().unwrap();
    let img = gradient(16, 16);
    let baseline = write_png(&tmp, "baseline.png", &img);
    let result = write_png(&tmp, "result.png", &img);

    assert_eq!(compare_images(&baseline, &result, 0.0).unwrap(), None);
}

#[test]
fn test_compare_within_tolerance_matches() {
    let tmp = TempDir::new().unwrap();
    let a = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
    let mut b = a.clone();
    b.put_pixel(0, 0, Rgb([101, 100, 100]));
    let baseline = write_png(&tmp, "baseline.png", &a);
    let result = write_png(&tmp, "result.png", &b);

    // RMS = sqrt(1 / 300) ~ 0.0577
    assert_eq!(compare_images(&baseline, &result, 0.1).unwrap(), None);
    assert!(compare_images(&baseline, &result, 0.01).unwrap().is_some());
}

#[test]
fn test_compare_mismatch_writes_diff_image() {
    let tmp = TempDir::new().unwrap();
    let a = RgbImage::from_pixel(16, 16, Rgb([0, 0, 0]));
    let b = RgbImage::from_pixel(16, 16, Rgb([20, 0, 0]));
    let baseline = write_png(&tmp, "fig_a_1.png", &a);
    let result_dir = tmp.path().join("results");
    std::fs::create_dir_all(&result_dir).unwrap();
    let result = result_dir.join("fig_a_1.png");
    b.save(&result).unwrap();

    let err = compare_images(&baseline, &result, 0.1).unwrap().unwrap();
    assert_eq!(err.kind, MismatchKind::Rms);
    assert!(err.rms.unwrap() > 0.1);
    assert_eq!(err.tolerance, 0.1);
    assert!(err.ssim.is_some());

    let diff = err.diff.clone().unwrap();
    assert_eq!(diff, result_dir.join("fig_a_1-failed-diff.png"));
    let diff_img = image::open(&diff).unwrap().to_rgb8();
    assert_eq!(diff_img.get_pixel(3, 3), &Rgb([200, 0, 0]));

    assert!(err.to_string().starts_with("images not close (RMS"));
}

#[test]
fn test_compare_size_mismatch_is_diagnostic() {
    let tmp = TempDir::new().unwrap();
    let baseline = write_png(&tmp, "baseline.png", &gradient(8, 8));
    let result = write_png(&tmp, "result.png", &gradient(16, 8));

    let err = compare_images(&baseline, &result, 10.0).unwrap().unwrap();
    assert_eq!(err.kind, MismatchKind::SizeMismatch);
    assert_eq!(err.rms, None);
    assert!(err.to_string().contains("sizes do not match"));
}

#[test]
fn test_compare_missing_baseline_is_error() {
    let tmp = TempDir::new().unwrap();
    let result = write_png(&tmp, "result.png", &gradient(8, 8));
    let missing = tmp.path().join("nope.png");

    let err = compare_images(&missing, &result, 0.1).unwrap_err();
    assert!(matches!(err, FigcheckError::BaselineNotFound { .. }));
}

#[test]
fn test_compare_ignores_alpha_channel() {
    let tmp = TempDir::new().unwrap();
    let opaque = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
    let translucent = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 128]));
    let baseline = tmp.path().join("a.png");
    let result = tmp.path().join("b.png");
    opaque.save(&baseline).unwrap();
    translucent.save(&result).unwrap();

    assert_eq!(compare_images(&baseline, &result, 0.0).unwrap(), None);
}

#[test]
fn test_compare_undecodable_result_is_error() {
    let tmp = TempDir::new().unwrap();
    let baseline = write_png(&tmp, "baseline.png", &gradient(8, 8));
    let result = tmp.path().join("result.png");
    std::fs::write(&result, b"not a png").unwrap();

    let err = compare_images(&baseline, &result, 0.1).unwrap_err();
    assert!(matches!(err, FigcheckError::ImageRead { .. }));
}

#[test]
fn test_measure_images_reports_hashes() {
    let tmp = TempDir::new().unwrap();
    let img = gradient(16, 16);
    let a = write_png(&tmp, "a.png", &img);
    let b = write_png(&tmp, "b.png", &img);

    let metrics = measure_images(&a, &b).unwrap();
    assert!(metrics.identical);
    assert_eq!(metrics.rms, 0.0);
    assert_eq!(metrics.hash_expected, metrics.hash_actual);
    assert_eq!((metrics.width, metrics.height), (16, 16));
}

#[test]
fn test_measure_images_rejects_size_mismatch() {
    let tmp = TempDir::new().unwrap();
    let a = write_png(&tmp, "a.png", &gradient(8, 8));
    let b = write_png(&tmp, "b.png", &gradient(4, 4));

    let err = measure_images(&a, &b).unwrap_err();
    assert!(err.to_string().contains("8x8 vs 4x4"));
}

#[test]
fn test_diff_path_for() {
    assert_eq!(
        diff_path_for(Path::new("/r/book_figures/ch1/fig_a_2.png")),
        PathBuf::from("/r/book_figures/ch1/fig_a_2-failed-diff.png")
    );
}
