//! Test case discovery.
//!
//! Two sources are supported:
//!
//! - **Tree walk** (default): every top-level subdirectory ("chapter") of the
//!   scripts directory is listed, and files matching the naming pattern
//!   become test cases.
//! - **Glob override**: when `FIGURES_TO_TEST` is set (or a pattern is passed
//!   explicitly), it is expanded instead and matches are filtered by the same
//!   naming pattern.
//!
//! Cases are returned sorted so runs are reproducible. Discovery never
//! changes the working directory.

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::error::{FigcheckError, FigcheckResult};
use crate::paths::ScriptRef;

/// Environment variable selecting a subset of scripts by glob pattern.
pub const FIGURES_TO_TEST_ENV: &str = "FIGURES_TO_TEST";

/// One script to execute and the tolerance to compare its figures with.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Script to run.
    pub script: ScriptRef,
    /// RMS tolerance.
    pub tolerance: f64,
}

impl TestCase {
    /// Creates a test case.
    pub fn new(script: ScriptRef, tolerance: f64) -> Self {
        Self { script, tolerance }
    }
}

/// Where scripts are discovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverySource {
    /// Walk the chapters of the scripts directory.
    Tree,
    /// Expand a glob pattern (relative patterns are resolved against the root).
    Pattern(String),
}

impl DiscoverySource {
    /// `Pattern` if `FIGURES_TO_TEST` is set and non-empty, else `Tree`.
    pub fn from_env() -> Self {
        Self::from_override(std::env::var(FIGURES_TO_TEST_ENV).ok())
    }

    /// `Pattern` for a non-empty override, else `Tree`.
    pub fn from_override(pattern: Option<String>) -> Self {
        match pattern {
            Some(p) if !p.trim().is_empty() => DiscoverySource::Pattern(p),
            _ => DiscoverySource::Tree,
        }
    }
}

/// Finds test cases under a harness root.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    scripts_dir: PathBuf,
    name_pattern: Pattern,
    tolerance: f64,
}

impl Discovery {
    /// Creates a discovery driver from the harness config.
    pub fn new(root: impl Into<PathBuf>, config: &HarnessConfig) -> FigcheckResult<Self> {
        let name_pattern =
            Pattern::new(&config.script_pattern).map_err(|source| FigcheckError::InvalidPattern {
                pattern: config.script_pattern.clone(),
                source,
            })?;

        Ok(Self {
            root: root.into(),
            scripts_dir: config.scripts_dir.clone(),
            name_pattern,
            tolerance: config.tolerance,
        })
    }

    /// Whether a file name follows the script naming convention.
    pub fn matches_name(&self, file_name: &str) -> bool {
        self.name_pattern.matches(file_name)
    }

    /// Discover cases from the given source.
    pub fn discover(&self, source: &DiscoverySource) -> FigcheckResult<Vec<TestCase>> {
        let mut scripts = match source {
            DiscoverySource::Tree => self.walk_tree()?,
            DiscoverySource::Pattern(pattern) => self.expand_pattern(pattern)?,
        };

        scripts.sort();
        scripts.dedup();

        Ok(scripts
            .into_iter()
            .map(|script| TestCase::new(script, self.tolerance))
            .collect())
    }

    fn walk_tree(&self) -> FigcheckResult<Vec<ScriptRef>> {
        let scripts_root = self.root.join(&self.scripts_dir);
        let mut scripts = Vec::new();

        for chapter in WalkDir::new(&scripts_root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let chapter = chapter.map_err(walk_error)?;
            if !chapter.file_type().is_dir() {
                continue;
            }

            for entry in WalkDir::new(chapter.path())
                .min_depth(1)
                .max_depth(1)
                .follow_links(true)
                .sort_by_file_name()
            {
                let entry = entry.map_err(walk_error)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if self.matches_name(&name) {
                    scripts.push(ScriptRef::under_root(&self.root, entry.path())?);
                }
            }
        }

        Ok(scripts)
    }

    fn expand_pattern(&self, pattern: &str) -> FigcheckResult<Vec<ScriptRef>> {
        let absolute = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            let root = Pattern::escape(&self.root.to_string_lossy());
            format!("{}/{}", root.trim_end_matches('/'), pattern)
        };

        let paths = glob::glob(&absolute).map_err(|source| FigcheckError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let mut scripts = Vec::new();
        for path in paths {
            let path = path.map_err(|e| FigcheckError::Io(e.into_error()))?;
            if !path.is_file() {
                continue;
            }
            let matches = path
                .file_name()
                .map(|name| self.matches_name(&name.to_string_lossy()))
                .unwrap_or(false);
            if matches {
                scripts.push(ScriptRef::under_root(&self.root, &path)?);
            }
        }

        Ok(scripts)
    }
}

fn walk_error(err: walkdir::Error) -> FigcheckError {
    FigcheckError::Io(err.into())
}
