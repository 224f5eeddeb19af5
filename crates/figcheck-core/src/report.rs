//! Per-script and per-run reports.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::compare::ComparisonError;
use crate::disposition::Outcome;
use crate::error::FigcheckError;
use crate::paths::ScriptRef;

/// What happened to one saved figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureStatus {
    /// Within tolerance of the baseline.
    Matched,
    /// Differs from the baseline.
    Mismatched,
    /// Copied over the baseline.
    Updated,
}

/// One figure of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureReport {
    /// Figure number.
    pub number: u32,
    /// Saved result image.
    pub result: PathBuf,
    /// Baseline image it was compared with.
    pub baseline: PathBuf,
    /// Saved with the black face color override.
    pub black_background: bool,
    /// Comparison status.
    pub status: FigureStatus,
    /// Diagnostic, when mismatched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ComparisonError>,
}

/// Everything `Harness::check` learned about one script.
#[derive(Debug)]
pub struct CaseReport {
    /// The script.
    pub script: ScriptRef,
    /// Tolerance its figures were compared with.
    pub tolerance: f64,
    /// Figures in ascending number order.
    pub figures: Vec<FigureReport>,
    /// Disposition.
    pub outcome: Outcome,
}

impl CaseReport {
    /// Diagnostics of mismatching figures, in figure order.
    pub fn errors(&self) -> Vec<&ComparisonError> {
        self.figures.iter().filter_map(|f| f.error.as_ref()).collect()
    }
}

/// Final status of a script in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// All figures matched.
    Passed,
    /// Mismatches on an allow-listed script.
    Skipped,
    /// Mismatches on any other script.
    Failed,
    /// The script could not be executed or checked.
    Errored,
}

impl CaseStatus {
    /// Label used in human output.
    pub fn label(&self) -> &'static str {
        match self {
            CaseStatus::Passed => "PASS",
            CaseStatus::Skipped => "SKIP",
            CaseStatus::Failed => "FAIL",
            CaseStatus::Errored => "ERROR",
        }
    }
}

/// Serializable record of one script's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// The script.
    pub script: ScriptRef,
    /// Final status.
    pub status: CaseStatus,
    /// Skip reason, failure summary, or error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error code for errored cases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Coarse error category (`session`, `script`, `image`, ...) for errored cases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
    /// Python traceback when the script raised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    /// Per-figure details.
    pub figures: Vec<FigureReport>,
    /// Wall time in milliseconds.
    pub duration_ms: u64,
}

impl CaseRecord {
    /// Record for a script that was checked to completion.
    pub fn from_report(report: CaseReport, duration: Duration) -> Self {
        let (status, message) = match &report.outcome {
            Outcome::Pass => (CaseStatus::Passed, None),
            Outcome::Skip { message, .. } => (CaseStatus::Skipped, Some(message.clone())),
            Outcome::Fail(failure) => (CaseStatus::Failed, Some(failure.to_string())),
        };

        Self {
            script: report.script,
            status,
            message,
            error_code: None,
            error_category: None,
            traceback: None,
            figures: report.figures,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Record for a script whose check returned an error.
    pub fn errored(script: ScriptRef, error: &FigcheckError, duration: Duration) -> Self {
        let traceback = match error {
            FigcheckError::ScriptFailed { traceback, .. } => traceback.clone(),
            _ => None,
        };

        Self {
            script,
            status: CaseStatus::Errored,
            message: Some(error.to_string()),
            error_code: Some(error.code().to_string()),
            error_category: Some(error.category().to_string()),
            traceback,
            figures: Vec::new(),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Aggregate result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// No script failed or errored.
    pub success: bool,
    /// Scripts checked.
    pub total: usize,
    /// Scripts that passed.
    pub passed: usize,
    /// Scripts skipped as known failures.
    pub skipped: usize,
    /// Scripts that failed comparison.
    pub failed: usize,
    /// Scripts that errored.
    pub errored: usize,
    /// Baselines were overwritten with results.
    pub updated_baselines: bool,
    /// Total wall time in milliseconds.
    pub runtime_ms: u64,
    /// Per-script records in run order.
    pub cases: Vec<CaseRecord>,
}

impl RunSummary {
    /// Builds a summary from records.
    pub fn from_records(cases: Vec<CaseRecord>, runtime: Duration, updated_baselines: bool) -> Self {
        let count = |status: CaseStatus| cases.iter().filter(|c| c.status == status).count();
        let passed = count(CaseStatus::Passed);
        let skipped = count(CaseStatus::Skipped);
        let failed = count(CaseStatus::Failed);
        let errored = count(CaseStatus::Errored);

        Self {
            success: failed == 0 && errored == 0,
            total: cases.len(),
            passed,
            skipped,
            failed,
            errored,
            updated_baselines,
            runtime_ms: runtime.as_millis() as u64,
            cases,
        }
    }

    /// Figures saved across the run.
    pub fn figure_count(&self) -> usize {
        self.cases.iter().map(|c| c.figures.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::known_failures::KnownFailures;
    use pretty_assertions::assert_eq;

    fn record(script: &str, status: CaseStatus) -> CaseRecord {
        CaseRecord {
            script: ScriptRef::new(script),
            status,
            message: None,
            error_code: None,
            error_category: None,
            traceback: None,
            figures: Vec::new(),
            duration_ms: 5,
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary::from_records(
            vec![
                record("a/fig_1.py", CaseStatus::Passed),
                record("a/fig_2.py", CaseStatus::Passed),
                record("a/fig_3.py", CaseStatus::Skipped),
                record("a/fig_4.py", CaseStatus::Failed),
                record("a/fig_5.py", CaseStatus::Errored),
            ],
            Duration::from_millis(1500),
            false,
        );

        assert_eq!(summary.total, 5);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.runtime_ms, 1500);
        assert!(!summary.success);
    }

    #[test]
    fn test_skips_do_not_fail_the_run() {
        let summary = RunSummary::from_records(
            vec![
                record("a/fig_1.py", CaseStatus::Passed),
                record("a/fig_2.py", CaseStatus::Skipped),
            ],
            Duration::ZERO,
            false,
        );
        assert!(summary.success);
    }

    #[test]
    fn test_empty_run_succeeds() {
        let summary = RunSummary::from_records(vec![], Duration::ZERO, false);
        assert!(summary.success);
        assert_eq!(summary.figure_count(), 0);
    }

    #[test]
    fn test_errored_record_keeps_traceback_and_code() {
        let err = FigcheckError::ScriptFailed {
            script: "a/fig_1.py".to_string(),
            message: "ValueError: bad".to_string(),
            traceback: Some("Traceback (most recent call last): ...".to_string()),
        };
        let rec = CaseRecord::errored(ScriptRef::new("a/fig_1.py"), &err, Duration::ZERO);

        assert_eq!(rec.status, CaseStatus::Errored);
        assert_eq!(rec.error_code.as_deref(), Some("FIG_008"));
        assert_eq!(rec.error_category.as_deref(), Some("script"));
        assert!(rec.traceback.unwrap().starts_with("Traceback"));
    }

    #[test]
    fn test_record_from_passing_report() {
        let report = CaseReport {
            script: ScriptRef::new("a/fig_1.py"),
            tolerance: 0.1,
            figures: vec![],
            outcome: Outcome::decide(&ScriptRef::new("a/fig_1.py"), vec![], &KnownFailures::new()),
        };
        let rec = CaseRecord::from_report(report, Duration::from_millis(7));
        assert_eq!(rec.status, CaseStatus::Passed);
        assert_eq!(rec.message, None);
        assert_eq!(rec.error_category, None);
        assert_eq!(rec.duration_ms, 7);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(record("a/fig_1.py", CaseStatus::Skipped)).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["script"], "a/fig_1.py");
        assert!(json.get("message").is_none());
        assert!(json.get("error_category").is_none());
        assert_eq!(CaseStatus::Errored.label(), "ERROR");
    }
}
