//! Scripts whose baseline mismatches are expected.

use std::collections::BTreeSet;

use crate::paths::ScriptRef;

/// Allow-list shipped with the book figure corpus.
pub const DEFAULT_KNOWN_FAILURES: &[&str] = &[
    // System-dependent benchmarks
    "book_figures/chapter2/fig_sort_scaling.py",
    "book_figures/chapter2/fig_search_scaling.py",
    // MCMC and other sampling whose output is not seed-stable
    "book_figures/chapter5/fig_cauchy_mcmc.py",
    "book_figures/chapter5/fig_signal_background.py",
    "book_figures/chapter5/fig_model_comparison_mcmc.py",
    "book_figures/chapter5/fig_gaussgauss_mcmc.py",
    "book_figures/chapter8/fig_outlier_rejection.py",
    "book_figures/chapter10/fig_arrival_time.py",
    "book_figures/chapter10/fig_matchedfilt_burst.py",
    "book_figures/chapter10/fig_matchedfilt_chirp.py",
    "book_figures/chapter10/fig_matchedfilt_chirp2.py",
];

/// Read-only set of script paths exempt from comparison failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownFailures {
    scripts: BTreeSet<String>,
}

impl KnownFailures {
    /// Creates an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The allow-list shipped with the corpus.
    pub fn builtin() -> Self {
        Self::from_iter(DEFAULT_KNOWN_FAILURES.iter().copied())
    }

    /// Whether a script is allow-listed.
    pub fn contains(&self, script: &ScriptRef) -> bool {
        self.scripts.contains(script.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scripts.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for KnownFailures {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            // Normalized so `./`-prefixed entries still match.
            scripts: iter
                .into_iter()
                .map(|s| ScriptRef::new(s.as_ref()).as_str().to_string())
                .collect(),
        }
    }
}
