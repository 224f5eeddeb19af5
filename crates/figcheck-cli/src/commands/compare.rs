//! Compare command implementation
//!
//! Compares one result image against a baseline with the same tolerance rule
//! `run` applies to every figure.

use anyhow::{Context, Result};
use colored::Colorize;
use figcheck_core::{compare_images, measure_images, ComparisonError, ImageMetrics};
use std::path::Path;
use std::process::ExitCode;

use super::json_output::{error_codes, CompareOutput, JsonError};

/// Run the compare command
///
/// # Arguments
/// * `baseline` - Path to the reference image
/// * `result` - Path to the image under test
/// * `tolerance` - Maximum RMS difference
/// * `json_output` - Whether to output machine-readable JSON
///
/// # Returns
/// Exit code: 0 if the images match within tolerance, 1 otherwise
pub fn run(baseline: &str, result: &str, tolerance: f64, json_output: bool) -> Result<ExitCode> {
    if json_output {
        run_json(baseline, result, tolerance)
    } else {
        run_human(baseline, result, tolerance)
    }
}

fn check(
    baseline: &Path,
    result: &Path,
    tolerance: f64,
) -> figcheck_core::FigcheckResult<(Option<ComparisonError>, Option<ImageMetrics>)> {
    let mismatch = compare_images(baseline, result, tolerance)?;
    // Dimension mismatches have no pixel metrics.
    let metrics = measure_images(baseline, result).ok();
    Ok((mismatch, metrics))
}

fn run_human(baseline: &str, result: &str, tolerance: f64) -> Result<ExitCode> {
    let baseline_path = Path::new(baseline);
    let result_path = Path::new(result);
    if !result_path.exists() {
        anyhow::bail!("Result image does not exist: {}", result);
    }

    println!("{}", "Comparing images:".cyan().bold());
    println!("  {} {}", "Baseline:".dimmed(), baseline);
    println!("  {} {}", "Result:".dimmed(), result);
    println!("  {} {}", "Tolerance:".dimmed(), tolerance);

    let (mismatch, metrics) = check(baseline_path, result_path, tolerance)
        .with_context(|| format!("Failed to compare {} with {}", result, baseline))?;

    if let Some(metrics) = &metrics {
        println!("\n{}", "Metrics:".cyan().bold());
        println!("  {} {}x{}", "Size:".cyan(), metrics.width, metrics.height);
        println!("  {} {:.6}", "RMS:".cyan(), metrics.rms);
        println!("  {} {:.6}", "SSIM:".cyan(), metrics.ssim);
        println!("  {} {}", "Hash baseline:".dimmed(), &metrics.hash_expected[..16]);
        println!("  {} {}", "Hash result:".dimmed(), &metrics.hash_actual[..16]);
        if metrics.identical {
            println!("\n{}", "Files are byte-identical!".green().bold());
        }
    }

    match mismatch {
        None => {
            println!("\n{} within tolerance", "MATCH".green().bold());
            Ok(ExitCode::SUCCESS)
        }
        Some(error) => {
            println!("\n{} {}", "MISMATCH".red().bold(), error);
            if let Some(diff) = &error.diff {
                println!("  {} {}", "Diff image:".dimmed(), diff.display());
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn run_json(baseline: &str, result: &str, tolerance: f64) -> Result<ExitCode> {
    let mut output = CompareOutput {
        success: false,
        baseline: baseline.to_string(),
        result: result.to_string(),
        tolerance,
        metrics: None,
        mismatch: None,
        errors: vec![],
    };

    if !Path::new(result).exists() {
        output.errors.push(
            JsonError::new(
                error_codes::FILE_READ,
                format!("Result image does not exist: {}", result),
            )
            .with_file(result),
        );
    } else {
        match check(Path::new(baseline), Path::new(result), tolerance) {
            Ok((mismatch, metrics)) => {
                output.success = mismatch.is_none();
                output.mismatch = mismatch;
                output.metrics = metrics;
            }
            Err(e) => output.errors.push(JsonError::from(&e)),
        }
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_png(path: &Path, color: [u8; 3]) {
        RgbImage::from_pixel(8, 8, Rgb(color)).save(path).unwrap();
    }

    #[test]
    fn test_compare_identical_images() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        write_png(&a, [10, 20, 30]);
        write_png(&b, [10, 20, 30]);

        let code = run(a.to_str().unwrap(), b.to_str().unwrap(), 0.1, false).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn test_compare_different_images_json() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        write_png(&a, [0, 0, 0]);
        write_png(&b, [255, 255, 255]);

        let code = run(a.to_str().unwrap(), b.to_str().unwrap(), 0.1, true).unwrap();
        assert_eq!(code, ExitCode::from(1));
        assert!(tmp.path().join("b-failed-diff.png").is_file());
    }

    #[test]
    fn test_compare_large_tolerance_accepts_difference() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        write_png(&a, [100, 100, 100]);
        write_png(&b, [102, 102, 102]);

        let code = run(a.to_str().unwrap(), b.to_str().unwrap(), 5.0, true).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn test_compare_missing_baseline() {
        let tmp = TempDir::new().unwrap();
        let b = tmp.path().join("b.png");
        write_png(&b, [0, 0, 0]);
        let missing = tmp.path().join("missing.png");

        let code = run(missing.to_str().unwrap(), b.to_str().unwrap(), 0.1, true).unwrap();
        assert_eq!(code, ExitCode::from(1));
        assert!(run(missing.to_str().unwrap(), b.to_str().unwrap(), 0.1, false).is_err());
    }
}
