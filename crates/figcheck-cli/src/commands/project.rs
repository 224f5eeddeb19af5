//! Harness root and configuration shared by `run`, `list` and `doctor`.

use anyhow::{Context, Result};
use figcheck_core::{DiscoverySource, HarnessConfig};
use std::path::{Path, PathBuf};

/// A harness root with its loaded configuration.
#[derive(Debug, Clone)]
pub struct Project {
    /// Canonical harness root.
    pub root: PathBuf,
    /// Loaded configuration with CLI overrides applied.
    pub config: HarnessConfig,
}

impl Project {
    /// Resolves the root (default: current directory) and loads its config.
    pub fn load(root: Option<&str>, config: Option<&str>) -> Result<Self> {
        let root = match root {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        if !root.is_dir() {
            anyhow::bail!("Harness root is not a directory: {}", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve harness root {}", root.display()))?;

        let config = HarnessConfig::load(&root, config.map(Path::new))?;
        Ok(Self { root, config })
    }

    /// Applies a tolerance override.
    pub fn with_tolerance(mut self, tolerance: Option<f64>) -> Self {
        if let Some(tolerance) = tolerance {
            self.config.tolerance = tolerance;
        }
        self
    }

    /// Applies an interpreter override.
    pub fn with_python(mut self, python: Option<&str>) -> Self {
        if let Some(python) = python {
            self.config.python = Some(PathBuf::from(python));
        }
        self
    }
}

/// `--pattern` if given, else `FIGURES_TO_TEST`, else a tree walk.
pub fn discovery_source(pattern: Option<&str>) -> DiscoverySource {
    match pattern {
        Some(pattern) => DiscoverySource::from_override(Some(pattern.to_string())),
        None => DiscoverySource::from_env(),
    }
}
