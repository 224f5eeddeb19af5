//! Script references and the result/baseline path layout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{FigcheckError, FigcheckResult};

/// A plotting script, identified by its path relative to the harness root.
///
/// The identity string always uses `/` separators so it can be matched
/// against the known-failures list on every platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptRef(String);

impl ScriptRef {
    /// Creates a reference from a root-relative path.
    pub fn new(relative: impl AsRef<Path>) -> Self {
        let key = relative
            .as_ref()
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        Self(key)
    }

    /// Creates a reference for `path`, which may be absolute or relative to `root`.
    ///
    /// Paths that escape the root, either by prefix or through a `..`
    /// component, are rejected.
    pub fn under_root(root: &Path, path: &Path) -> FigcheckResult<Self> {
        let outside = || FigcheckError::ScriptOutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        };

        let relative = if path.is_relative() {
            path
        } else {
            path.strip_prefix(root).map_err(|_| outside())?
        };

        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(outside());
        }
        Ok(Self::new(relative))
    }

    /// The `/`-separated identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Root-relative path.
    pub fn relative_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }

    /// Directory containing the script, relative to the root.
    pub fn parent(&self) -> PathBuf {
        self.relative_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// File name of the script.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Path without its extension, the stem of every derived image name.
    pub fn stem_path(&self) -> PathBuf {
        self.relative_path().with_extension("")
    }
}

impl fmt::Display for ScriptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result and baseline image for one figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigurePaths {
    /// Freshly rendered image.
    pub result: PathBuf,
    /// Stored reference image.
    pub baseline: PathBuf,
}

/// Where scripts, baselines and results live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
    baseline_dir: PathBuf,
    results_dir: PathBuf,
}

impl ArtifactLayout {
    /// Creates a layout; relative directories are resolved against `root`.
    pub fn new(root: impl Into<PathBuf>, baseline_dir: &Path, results_dir: &Path) -> Self {
        let root = root.into();
        Self {
            baseline_dir: root.join(baseline_dir),
            results_dir: root.join(results_dir),
            root,
        }
    }

    /// The harness root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding baseline images.
    pub fn baseline_dir(&self) -> &Path {
        &self.baseline_dir
    }

    /// Directory holding result images.
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Absolute path of a script.
    pub fn script_path(&self, script: &ScriptRef) -> PathBuf {
        self.root.join(script.relative_path())
    }

    /// Absolute directory a script is executed from.
    pub fn script_dir(&self, script: &ScriptRef) -> PathBuf {
        self.root.join(script.parent())
    }

    /// `<dir>/<script path without extension>_<number>.png` for both trees.
    pub fn figure_paths(&self, script: &ScriptRef, number: u32) -> FigurePaths {
        let name = image_name(script, number);
        FigurePaths {
            result: self.results_dir.join(&name),
            baseline: self.baseline_dir.join(&name),
        }
    }

    /// Result directory for a script, created if missing.
    pub fn ensure_result_dir(&self, script: &ScriptRef) -> FigcheckResult<PathBuf> {
        let dir = self.results_dir.join(script.parent());
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

fn image_name(script: &ScriptRef, number: u32) -> PathBuf {
    let stem = script.stem_path();
    let file = format!(
        "{}_{}.png",
        stem.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        number
    );
    stem.with_file_name(file)
}
