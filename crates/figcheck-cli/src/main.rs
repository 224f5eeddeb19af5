//! Figcheck CLI - Baseline image regression for matplotlib figure scripts
//!
//! This binary runs every figure script of a corpus, saves the figures it
//! produces, and compares them against stored baseline images.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use figcheck_cli::commands;

/// Figcheck - Figure regression harness
#[derive(Parser)]
#[command(name = "figcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute figure scripts and compare their figures against baselines
    Run {
        /// Harness root containing book_figures/, baseline/ and results/ (default: cwd)
        #[arg(long)]
        root: Option<String>,

        /// Config file (default: <root>/figcheck.json)
        #[arg(short, long)]
        config: Option<String>,

        /// Glob selecting scripts, relative to the root (overrides FIGURES_TO_TEST)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Maximum RMS difference per figure
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Python interpreter (overrides FIGCHECK_PYTHON)
        #[arg(long)]
        python: Option<String>,

        /// Overwrite baselines with the freshly rendered figures
        #[arg(long)]
        update_baselines: bool,

        /// Stop after the first failed or errored script
        #[arg(long)]
        fail_fast: bool,

        /// Print per-figure details and Python tracebacks
        #[arg(short, long)]
        verbose: bool,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// List the scripts a run would check
    List {
        /// Harness root (default: cwd)
        #[arg(long)]
        root: Option<String>,

        /// Config file (default: <root>/figcheck.json)
        #[arg(short, long)]
        config: Option<String>,

        /// Glob selecting scripts, relative to the root (overrides FIGURES_TO_TEST)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Compare a result image against a baseline image
    Compare {
        /// Path to the baseline image
        #[arg(short, long)]
        baseline: String,

        /// Path to the result image
        #[arg(short, long)]
        result: String,

        /// Maximum RMS difference
        #[arg(short, long, default_value_t = figcheck_core::DEFAULT_TOLERANCE)]
        tolerance: f64,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Check the Python environment and harness layout
    Doctor {
        /// Harness root (default: cwd)
        #[arg(long)]
        root: Option<String>,

        /// Config file (default: <root>/figcheck.json)
        #[arg(short, long)]
        config: Option<String>,

        /// Python interpreter (overrides FIGCHECK_PYTHON)
        #[arg(long)]
        python: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            root,
            config,
            pattern,
            tolerance,
            python,
            update_baselines,
            fail_fast,
            verbose,
            json,
        } => commands::run::run(&commands::run::RunArgs {
            root,
            config,
            pattern,
            tolerance,
            python,
            update_baselines,
            fail_fast,
            verbose,
            json,
        }),
        Commands::List {
            root,
            config,
            pattern,
            json,
        } => commands::list::run(
            root.as_deref(),
            config.as_deref(),
            pattern.as_deref(),
            json,
        ),
        Commands::Compare {
            baseline,
            result,
            tolerance,
            json,
        } => commands::compare::run(&baseline, &result, tolerance, json),
        Commands::Doctor {
            root,
            config,
            python,
        } => commands::doctor::run(root.as_deref(), config.as_deref(), python.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
