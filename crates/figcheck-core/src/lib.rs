//! Figcheck core: baseline image regression for matplotlib figure scripts.
//!
//! Every `fig_*.py` script under the scripts directory is executed in its own
//! directory by a Python session. The figures it leaves open are saved under
//! `results/` and compared against the image at the same path under
//! `baseline/`. A script passes when every figure is within tolerance, is
//! skipped when it mismatches but is on the known-failures list, and fails
//! otherwise.
//!
//! # Example
//!
//! ```no_run
//! use figcheck_core::{
//!     Discovery, DiscoverySource, Harness, HarnessConfig, PythonSessionConfig,
//!     PythonSessionFactory,
//! };
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let config = HarnessConfig::load(root, None)?;
//! let cases = Discovery::new(root, &config)?.discover(&DiscoverySource::from_env())?;
//!
//! let factory = PythonSessionFactory::new(PythonSessionConfig::from(&config))?;
//! let summary = Harness::from_config(root, &config, factory)?.run(&cases);
//! assert!(summary.success);
//! # Ok::<(), figcheck_core::FigcheckError>(())
//! ```

pub mod compare;
pub mod config;
pub mod cwd;
pub mod discovery;
pub mod disposition;
pub mod error;
pub mod figures;
pub mod harness;
pub mod known_failures;
pub mod paths;
pub mod report;
pub mod sandbox;

pub use compare::{compare_images, measure_images, ComparisonError, ImageMetrics, MismatchKind};
pub use config::{HarnessConfig, CONFIG_FILE_NAME, DEFAULT_TIMEOUT_SECS, DEFAULT_TOLERANCE};
pub use cwd::{with_cwd, DirGuard};
pub use discovery::{Discovery, DiscoverySource, TestCase, FIGURES_TO_TEST_ENV};
pub use disposition::Outcome;
pub use error::{FigcheckError, FigcheckResult, ImageComparisonFailure};
pub use figures::{FigureRegistry, OpenFigure, SaveOptions};
pub use harness::{Harness, HarnessOptions};
pub use known_failures::{KnownFailures, DEFAULT_KNOWN_FAILURES};
pub use paths::{ArtifactLayout, FigurePaths, ScriptRef};
pub use report::{CaseRecord, CaseReport, CaseStatus, FigureReport, FigureStatus, RunSummary};
pub use sandbox::{
    find_python, probe_interpreter, strip_interactive_calls, ExecutionUnit, InterpreterInfo,
    PlotSession, PythonSession, PythonSessionConfig, PythonSessionFactory, ScriptSandbox,
    SessionFactory,
};
