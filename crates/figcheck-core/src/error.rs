//! Error types for the figure regression harness.

use std::path::PathBuf;
use thiserror::Error;

use crate::compare::ComparisonError;

/// Result type for harness operations.
pub type FigcheckResult<T> = Result<T, FigcheckError>;

/// Errors that can occur while discovering, executing, or checking scripts.
#[derive(Debug, Error)]
pub enum FigcheckError {
    /// Python interpreter not found.
    #[error("Python interpreter not found. Install Python 3 with matplotlib, or set the FIGCHECK_PYTHON environment variable")]
    PythonNotFound,

    /// Failed to spawn the interpreter process.
    #[error("Failed to spawn Python process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// A session request did not complete in time.
    #[error("Python session timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The interpreter exited while a request was outstanding.
    #[error("Python session exited unexpectedly (status {exit_code}): {stderr}")]
    SessionExited { exit_code: i32, stderr: String },

    /// The interpreter sent something that is not a protocol response.
    #[error("Malformed session response: {0}")]
    Protocol(String),

    /// Failed to encode a request or decode a response.
    #[error("Failed to encode or decode session message: {0}")]
    Json(#[source] serde_json::Error),

    /// The session rejected a request (configure, save, ...).
    #[error("Session request '{op}' failed: {message}")]
    RequestFailed { op: &'static str, message: String },

    /// The script itself raised.
    #[error("Script {script} raised: {message}")]
    ScriptFailed {
        script: String,
        message: String,
        traceback: Option<String>,
    },

    /// Python entrypoint script not found.
    #[error("Python entrypoint script not found at: {path}")]
    EntrypointNotFound { path: PathBuf },

    /// Baseline image for a figure is missing.
    #[error("Baseline image does not exist: {path}")]
    BaselineNotFound { path: PathBuf },

    /// Failed to decode an image.
    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to encode an image.
    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Images that must be measured together have different dimensions.
    #[error("Image dimensions do not match: {}x{} vs {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Failed to read the configuration file.
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid glob pattern.
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A discovered script does not live under the harness root.
    #[error("Script {path} is outside the harness root {root}")]
    ScriptOutsideRoot { path: PathBuf, root: PathBuf },

    /// Failed to change the working directory.
    #[error("Failed to change directory to {path}: {source}")]
    ChangeDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FigcheckError {
    /// Creates a new request failed error.
    pub fn request_failed(op: &'static str, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            op,
            message: message.into(),
        }
    }

    /// Stable error code for machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            FigcheckError::PythonNotFound => "FIG_001",
            FigcheckError::SpawnFailed(_) => "FIG_002",
            FigcheckError::Timeout { .. } => "FIG_003",
            FigcheckError::SessionExited { .. } => "FIG_004",
            FigcheckError::Protocol(_) => "FIG_005",
            FigcheckError::Json(_) => "FIG_006",
            FigcheckError::RequestFailed { .. } => "FIG_007",
            FigcheckError::ScriptFailed { .. } => "FIG_008",
            FigcheckError::EntrypointNotFound { .. } => "FIG_009",
            FigcheckError::BaselineNotFound { .. } => "FIG_010",
            FigcheckError::ImageRead { .. } => "FIG_011",
            FigcheckError::ImageWrite { .. } => "FIG_012",
            FigcheckError::SizeMismatch { .. } => "FIG_013",
            FigcheckError::ConfigRead { .. } => "FIG_014",
            FigcheckError::ConfigParse { .. } => "FIG_015",
            FigcheckError::InvalidPattern { .. } => "FIG_016",
            FigcheckError::ScriptOutsideRoot { .. } => "FIG_017",
            FigcheckError::ChangeDirectory { .. } => "FIG_018",
            FigcheckError::Io(_) => "FIG_019",
        }
    }

    /// Coarse category, used to group errors in reports.
    pub fn category(&self) -> &'static str {
        match self {
            FigcheckError::PythonNotFound
            | FigcheckError::SpawnFailed(_)
            | FigcheckError::Timeout { .. }
            | FigcheckError::SessionExited { .. }
            | FigcheckError::Protocol(_)
            | FigcheckError::Json(_)
            | FigcheckError::RequestFailed { .. }
            | FigcheckError::EntrypointNotFound { .. } => "session",
            FigcheckError::ScriptFailed { .. } => "script",
            FigcheckError::BaselineNotFound { .. }
            | FigcheckError::ImageRead { .. }
            | FigcheckError::ImageWrite { .. }
            | FigcheckError::SizeMismatch { .. } => "image",
            FigcheckError::ConfigRead { .. } | FigcheckError::ConfigParse { .. } => "config",
            FigcheckError::InvalidPattern { .. } | FigcheckError::ScriptOutsideRoot { .. } => {
                "discovery"
            }
            FigcheckError::ChangeDirectory { .. } | FigcheckError::Io(_) => "io",
        }
    }
}

/// Aggregated comparison failure for one script.
///
/// Raised when a script that is not on the known-failures list produced at
/// least one figure that does not match its baseline.
#[derive(Debug, Clone, Error)]
#[error("{} figure(s) of {script} differ from baseline:\n{}", .errors.len(), render_errors(.errors))]
pub struct ImageComparisonFailure {
    /// Script the figures belong to.
    pub script: String,
    /// One diagnostic per mismatching figure, in figure order.
    pub errors: Vec<ComparisonError>,
}

fn render_errors(errors: &[ComparisonError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::MismatchKind;

    #[test]
    fn test_error_display() {
        let err = FigcheckError::PythonNotFound;
        assert!(err.to_string().contains("FIGCHECK_PYTHON"));

        let err = FigcheckError::Timeout { timeout_secs: 600 };
        assert!(err.to_string().contains("600 seconds"));

        let err = FigcheckError::request_failed("save", "no such figure 3");
        assert!(err.to_string().contains("'save'"));
        assert!(err.to_string().contains("no such figure 3"));
    }

    #[test]
    fn test_codes_and_categories() {
        assert_eq!(FigcheckError::PythonNotFound.code(), "FIG_001");
        assert_eq!(FigcheckError::PythonNotFound.category(), "session");

        let err = FigcheckError::BaselineNotFound {
            path: PathBuf::from("baseline/x_1.png"),
        };
        assert_eq!(err.code(), "FIG_010");
        assert_eq!(err.category(), "image");

        let err = FigcheckError::ScriptFailed {
            script: "book_figures/chapter1/fig_a.py".into(),
            message: "ZeroDivisionError".into(),
            traceback: None,
        };
        assert_eq!(err.category(), "script");
    }

    #[test]
    fn test_comparison_failure_lists_every_error() {
        let failure = ImageComparisonFailure {
            script: "book_figures/chapter1/fig_a.py".into(),
            errors: vec![ComparisonError {
                figure: Some(2),
                kind: MismatchKind::Rms,
                expected: PathBuf::from("baseline/fig_a_2.png"),
                actual: PathBuf::from("results/fig_a_2.png"),
                rms: Some(12.5),
                tolerance: 0.1,
                ssim: Some(0.8),
                diff: None,
            }],
        };

        let message = failure.to_string();
        assert!(message.starts_with("1 figure(s) of book_figures/chapter1/fig_a.py"));
        assert!(message.contains("RMS 12.500"));
    }
}
