//! Harness configuration.
//!
//! Configuration is read from an optional JSON file (`figcheck.json` in the
//! harness root by default). Every field has a default, so an empty object or
//! a missing file yields the settings the book figure corpus was built with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FigcheckError, FigcheckResult};
use crate::known_failures::{KnownFailures, DEFAULT_KNOWN_FAILURES};
use crate::paths::ArtifactLayout;

/// File name looked up in the harness root when no config path is given.
pub const CONFIG_FILE_NAME: &str = "figcheck.json";

/// Default RMS tolerance for every discovered script.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Default per-request timeout for the Python session (10 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Harness settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory (relative to the root) whose subdirectories hold scripts.
    pub scripts_dir: PathBuf,
    /// Directory holding baseline images.
    pub baseline_dir: PathBuf,
    /// Directory receiving result images.
    pub results_dir: PathBuf,
    /// File name pattern scripts must match.
    pub script_pattern: String,
    /// RMS tolerance for comparisons.
    pub tolerance: f64,
    /// Scripts whose mismatches are reported as skips.
    pub known_failures: Vec<String>,
    /// Names `matplotlib.pyplot` is bound to inside each script.
    pub aliases: Vec<String>,
    /// Python interpreter; looked up when unset.
    pub python: Option<PathBuf>,
    /// Session entrypoint; the embedded one is used when unset.
    pub entrypoint: Option<PathBuf>,
    /// Matplotlib backend.
    pub backend: String,
    /// Matplotlib rc parameters applied before any script runs.
    pub rc: BTreeMap<String, serde_json::Value>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("book_figures"),
            baseline_dir: PathBuf::from("baseline"),
            results_dir: PathBuf::from("results"),
            script_pattern: "fig_*.py".to_string(),
            tolerance: DEFAULT_TOLERANCE,
            known_failures: DEFAULT_KNOWN_FAILURES.iter().map(|s| s.to_string()).collect(),
            aliases: ["pl", "plt", "pylab"].iter().map(|s| s.to_string()).collect(),
            python: None,
            entrypoint: None,
            backend: "Agg".to_string(),
            rc: default_rc(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_rc() -> BTreeMap<String, serde_json::Value> {
    use serde_json::Value;

    [
        ("text.usetex", Value::Bool(true)),
        ("font.family", Value::from("serif")),
        ("font.style", Value::from("normal")),
        ("font.variant", Value::from("normal")),
        ("font.stretch", Value::from("normal")),
        ("font.weight", Value::from("normal")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl HarnessConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> FigcheckResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| FigcheckError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| FigcheckError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, else `<root>/figcheck.json` if present, else defaults.
    pub fn load(root: &Path, path: Option<&Path>) -> FigcheckResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The allow-list as a lookup set.
    pub fn known_failures(&self) -> KnownFailures {
        self.known_failures.iter().collect()
    }

    /// Artifact layout rooted at `root`.
    pub fn layout(&self, root: &Path) -> ArtifactLayout {
        ArtifactLayout::new(root, &self.baseline_dir, &self.results_dir)
    }

    /// Session request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sets the tolerance.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the Python interpreter.
    pub fn python(mut self, path: impl Into<PathBuf>) -> Self {
        self.python = Some(path.into());
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
