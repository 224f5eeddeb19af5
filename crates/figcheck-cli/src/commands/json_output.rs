//! JSON output types for machine-readable CLI output.
//!
//! Every command accepting `--json` prints exactly one pretty-printed object
//! to stdout. Errors carry a stable code: library errors keep their `FIG_xxx`
//! code, CLI-level errors use `CLI_xxx`.

use figcheck_core::{ComparisonError, FigcheckError, ImageMetrics, RunSummary, ScriptRef};
use serde::{Deserialize, Serialize};

/// Error codes for CLI operations.
pub mod error_codes {
    /// Harness root missing or not a directory
    pub const INVALID_ROOT: &str = "CLI_001";
    /// Input file could not be read
    pub const FILE_READ: &str = "CLI_002";
    /// Run could not be set up (discovery, interpreter, harness root)
    pub const RUN_SETUP: &str = "CLI_003";
}

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code (e.g., "CLI_001", "FIG_010")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Related file path (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Suggestion for fixing the error (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl JsonError {
    /// Creates a new error with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            file: None,
            suggestion: None,
        }
    }

    /// Sets the file path for this error.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl From<&FigcheckError> for JsonError {
    fn from(err: &FigcheckError) -> Self {
        let json = JsonError::new(err.code(), err.to_string());
        match err {
            FigcheckError::PythonNotFound => {
                json.with_suggestion("Install Python 3 with matplotlib or pass --python")
            }
            FigcheckError::BaselineNotFound { path } => json
                .with_file(path.display().to_string())
                .with_suggestion("Run with --update-baselines to create missing baselines"),
            FigcheckError::ConfigRead { path, .. } | FigcheckError::ConfigParse { path, .. } => {
                json.with_file(path.display().to_string())
            }
            _ => json,
        }
    }
}

impl JsonError {
    /// Converts an anyhow error, keeping the library code when there is one.
    pub fn from_anyhow(err: &anyhow::Error, fallback_code: &str) -> Self {
        match err.downcast_ref::<FigcheckError>() {
            Some(inner) => JsonError::from(inner),
            None => JsonError::new(fallback_code, format!("{:#}", err)),
        }
    }
}

/// JSON output for the `run` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Whether no script failed or errored
    pub success: bool,
    /// Tolerance scripts were checked with
    pub tolerance: f64,
    /// Run summary (absent when the run could not start)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    /// Errors that prevented the run
    pub errors: Vec<JsonError>,
}

impl RunOutput {
    /// Output for a completed run.
    pub fn completed(summary: RunSummary, tolerance: f64) -> Self {
        Self {
            success: summary.success,
            tolerance,
            summary: Some(summary),
            errors: Vec::new(),
        }
    }

    /// Output for a run that could not start.
    pub fn failed(error: JsonError, tolerance: f64) -> Self {
        Self {
            success: false,
            tolerance,
            summary: None,
            errors: vec![error],
        }
    }
}

/// One discovered script in `list` output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListedCase {
    /// Script path relative to the root
    pub script: ScriptRef,
    /// Comparison tolerance
    pub tolerance: f64,
    /// Whether the script is on the known-failures list
    pub known_failure: bool,
}

/// JSON output for the `list` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOutput {
    /// Whether discovery succeeded
    pub success: bool,
    /// Number of scripts found
    pub count: usize,
    /// Discovered scripts in run order
    pub cases: Vec<ListedCase>,
    /// Errors encountered
    pub errors: Vec<JsonError>,
}

/// JSON output for the `compare` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareOutput {
    /// Whether the result matched the baseline within tolerance
    pub success: bool,
    /// Baseline path
    pub baseline: String,
    /// Result path
    pub result: String,
    /// Tolerance applied
    pub tolerance: f64,
    /// Full metrics (absent when dimensions differ)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ImageMetrics>,
    /// Mismatch diagnostic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<ComparisonError>,
    /// Errors encountered
    pub errors: Vec<JsonError>,
}
