//! Pass / skip / fail policy for one script.

use crate::compare::ComparisonError;
use crate::error::ImageComparisonFailure;
use crate::known_failures::KnownFailures;
use crate::paths::ScriptRef;

/// Result of checking one script's figures.
#[derive(Debug)]
pub enum Outcome {
    /// Every figure matched its baseline.
    Pass,
    /// Mismatches on an allow-listed script.
    Skip {
        /// `known errors in <script>`.
        message: String,
        /// The mismatches that were tolerated.
        errors: Vec<ComparisonError>,
    },
    /// Mismatches on a script expected to reproduce exactly.
    Fail(ImageComparisonFailure),
}

impl Outcome {
    /// Decide the outcome for a script from its collected diagnostics.
    pub fn decide(script: &ScriptRef, errors: Vec<ComparisonError>, known: &KnownFailures) -> Self {
        if errors.is_empty() {
            Outcome::Pass
        } else if known.contains(script) {
            Outcome::Skip {
                message: format!("known errors in {}", script),
                errors,
            }
        } else {
            Outcome::Fail(ImageComparisonFailure {
                script: script.to_string(),
                errors,
            })
        }
    }

    /// Whether this outcome counts against the run.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }

    /// Diagnostics behind a skip or failure.
    pub fn errors(&self) -> &[ComparisonError] {
        match self {
            Outcome::Pass => &[],
            Outcome::Skip { errors, .. } => errors,
            Outcome::Fail(failure) => &failure.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::MismatchKind;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn mismatch(figure: u32) -> ComparisonError {
        ComparisonError {
            figure: Some(figure),
            kind: MismatchKind::Rms,
            expected: PathBuf::from(format!("baseline/fig_a_{}.png", figure)),
            actual: PathBuf::from(format!("results/fig_a_{}.png", figure)),
            rms: Some(12.5),
            tolerance: 0.1,
            ssim: Some(0.9),
            diff: None,
        }
    }

    fn known() -> KnownFailures {
        ["book_figures/chapter5/fig_cauchy_mcmc.py"].into_iter().collect()
    }

    #[test]
    fn test_no_errors_is_pass_even_when_known() {
        let script = ScriptRef::new("book_figures/chapter5/fig_cauchy_mcmc.py");
        assert!(matches!(Outcome::decide(&script, vec![], &known()), Outcome::Pass));
    }

    #[test]
    fn test_known_script_with_errors_is_skip() {
        let script = ScriptRef::new("book_figures/chapter5/fig_cauchy_mcmc.py");
        let outcome = Outcome::decide(&script, vec![mismatch(1), mismatch(2)], &known());

        match &outcome {
            Outcome::Skip { message, errors } => {
                assert_eq!(message, "known errors in book_figures/chapter5/fig_cauchy_mcmc.py");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected skip, got {:?}", other),
        }
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_unknown_script_with_errors_is_fail() {
        let script = ScriptRef::new("book_figures/chapter1/fig_a.py");
        let outcome = Outcome::decide(&script, vec![mismatch(2)], &known());

        assert!(outcome.is_failure());
        assert_eq!(outcome.errors().len(), 1);
        match outcome {
            Outcome::Fail(failure) => {
                assert_eq!(failure.script, "book_figures/chapter1/fig_a.py");
                assert_eq!(failure.errors[0].figure, Some(2));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
