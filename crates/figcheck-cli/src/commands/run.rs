//! Run command implementation
//!
//! Discovers figure scripts, executes each in a Python session, and checks
//! every figure against its baseline image.

use anyhow::Result;
use colored::Colorize;
use figcheck_core::{
    CaseRecord, CaseStatus, Discovery, FigureStatus, Harness, HarnessOptions, PythonSessionConfig,
    PythonSessionFactory, RunSummary,
};
use std::process::ExitCode;

use super::json_output::{error_codes, JsonError, RunOutput};
use super::project::{discovery_source, Project};

/// Flags of the run command.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Harness root (default: current directory)
    pub root: Option<String>,
    /// Config file (default: `<root>/figcheck.json`)
    pub config: Option<String>,
    /// Glob pattern overriding `FIGURES_TO_TEST`
    pub pattern: Option<String>,
    /// Tolerance override
    pub tolerance: Option<f64>,
    /// Interpreter override
    pub python: Option<String>,
    /// Copy results over baselines
    pub update_baselines: bool,
    /// Stop at the first failure
    pub fail_fast: bool,
    /// Print per-figure details and tracebacks
    pub verbose: bool,
    /// Output machine-readable JSON
    pub json: bool,
}

/// Run the run command
///
/// # Returns
/// Exit code: 0 if no script failed or errored, 1 otherwise
pub fn run(args: &RunArgs) -> Result<ExitCode> {
    let project = match Project::load(args.root.as_deref(), args.config.as_deref()) {
        Ok(project) => project
            .with_tolerance(args.tolerance)
            .with_python(args.python.as_deref()),
        Err(e) if args.json => {
            let error = JsonError::from_anyhow(&e, error_codes::INVALID_ROOT);
            let output = RunOutput::failed(error, args.tolerance.unwrap_or_default());
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e),
    };
    let tolerance = project.config.tolerance;

    let summary = match execute(&project, args) {
        Ok(summary) => summary,
        Err(e) if args.json => {
            let output = setup_failure(&e, tolerance);
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e),
    };

    if args.json {
        let output = RunOutput::completed(summary, tolerance);
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(exit_code(output.success));
    }

    print_summary(&summary);
    Ok(exit_code(summary.success))
}

/// JSON output for a run whose discovery or session setup failed.
fn setup_failure(err: &anyhow::Error, tolerance: f64) -> RunOutput {
    RunOutput::failed(JsonError::from_anyhow(err, error_codes::RUN_SETUP), tolerance)
}

fn execute(project: &Project, args: &RunArgs) -> Result<RunSummary> {
    let cases = Discovery::new(&project.root, &project.config)?
        .discover(&discovery_source(args.pattern.as_deref()))?;

    let factory = PythonSessionFactory::new(PythonSessionConfig::from(&project.config))?;
    let harness = Harness::from_config(&project.root, &project.config, factory)?.with_options(
        HarnessOptions {
            update_baselines: args.update_baselines,
            fail_fast: args.fail_fast,
        },
    );

    if !args.json {
        println!("{}", "Figure Regression Run".cyan().bold());
        println!("{}", "=====================".dimmed());
        println!(
            "{} {} script(s), tolerance {}",
            "Checking".dimmed(),
            cases.len(),
            project.config.tolerance
        );
        if args.update_baselines {
            println!("{} Baselines will be overwritten with results", "NOTE:".yellow());
        }
        println!();
    }

    let verbose = args.verbose;
    let json = args.json;
    Ok(harness.run_with(&cases, |record| {
        if !json {
            print_record(record, verbose);
        }
    }))
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn print_record(record: &CaseRecord, verbose: bool) {
    let elapsed = format!("({} figure(s), {} ms)", record.figures.len(), record.duration_ms);
    let label = record.status.label();

    match record.status {
        CaseStatus::Passed => {
            println!("{} {} {}", label.green(), record.script, elapsed.dimmed());
        }
        CaseStatus::Skipped => {
            println!("{} {} {}", label.yellow(), record.script, elapsed.dimmed());
            if let Some(message) = &record.message {
                println!("  {} {}", "-".yellow(), message);
            }
        }
        CaseStatus::Failed => {
            println!("{} {} {}", label.red().bold(), record.script, elapsed.dimmed());
            for error in record.figures.iter().filter_map(|f| f.error.as_ref()) {
                println!("  {} {}", "-".red(), error);
            }
        }
        CaseStatus::Errored => {
            let category = record
                .error_category
                .as_deref()
                .map(|c| format!("[{c}]"))
                .unwrap_or_default();
            println!("{} {} {}", label.red(), record.script, category.dimmed());
            if let Some(message) = &record.message {
                println!("  {} {}", "-".red(), message);
            }
            if verbose {
                if let Some(traceback) = &record.traceback {
                    for line in traceback.lines() {
                        println!("    {}", line.dimmed());
                    }
                }
            }
        }
    }

    if verbose {
        for figure in &record.figures {
            let status = match figure.status {
                FigureStatus::Matched => "matched".green(),
                FigureStatus::Mismatched => "mismatched".red(),
                FigureStatus::Updated => "updated".yellow(),
            };
            let style = if figure.black_background {
                " [black background]"
            } else {
                ""
            };
            println!(
                "    {} {} {}{}",
                format!("#{}", figure.number).dimmed(),
                status,
                figure.result.display(),
                style.dimmed()
            );
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n{}", "Summary".cyan().bold());
    println!("{}", "-------".dimmed());
    println!("Total:   {}", summary.total);
    println!("Passed:  {}", format!("{}", summary.passed).green());
    if summary.skipped > 0 {
        println!("Skipped: {}", format!("{}", summary.skipped).yellow());
    } else {
        println!("Skipped: 0");
    }
    if summary.failed > 0 {
        println!("Failed:  {}", format!("{}", summary.failed).red());
    } else {
        println!("Failed:  0");
    }
    if summary.errored > 0 {
        println!("Errors:  {}", format!("{}", summary.errored).red());
    } else {
        println!("Errors:  0");
    }
    println!(
        "Figures: {} in {:.1}s",
        summary.figure_count(),
        summary.runtime_ms as f64 / 1000.0
    );

    if summary.success {
        println!("\n{}", "All figures match their baselines!".green().bold());
    } else {
        println!("\n{}", "Some figures did not match.".red().bold());
    }
}
