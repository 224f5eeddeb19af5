//! Scoped working-directory changes.
//!
//! Scripts expect to run from their own directory (they load data files with
//! relative paths), but the working directory is process-global. [`DirGuard`]
//! changes into a directory and changes back when dropped, so the previous
//! directory is restored on every exit path including early returns and
//! panics.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{FigcheckError, FigcheckResult};

/// Restores the previous working directory on drop.
#[derive(Debug)]
#[must_use = "the previous directory is restored as soon as the guard is dropped"]
pub struct DirGuard {
    previous: Option<PathBuf>,
}

impl DirGuard {
    /// Change into `dir`, remembering the current directory.
    ///
    /// An empty path means "stay where we are"; the guard is then a no-op.
    pub fn enter(dir: &Path) -> FigcheckResult<Self> {
        if dir.as_os_str().is_empty() {
            return Ok(Self { previous: None });
        }

        let previous = env::current_dir()?;
        env::set_current_dir(dir).map_err(|source| FigcheckError::ChangeDirectory {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            previous: Some(previous),
        })
    }

    /// The directory that will be restored, if any.
    pub fn previous(&self) -> Option<&Path> {
        self.previous.as_deref()
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            // Nothing useful can be done with an error here; the directory we
            // came from was valid a moment ago.
            let _ = env::set_current_dir(previous);
        }
    }
}

/// Run `f` with the working directory set to `dir`, restoring it afterwards.
pub fn with_cwd<T>(dir: &Path, f: impl FnOnce() -> T) -> FigcheckResult<T> {
    let _guard = DirGuard::enter(dir)?;
    Ok(f())
}
