//! Script execution.
//!
//! A [`PlotSession`] is one interpreter that can execute a script and then
//! hand out the figures it left open. [`python`] implements it on top of a
//! Python subprocess; tests substitute in-memory fakes through
//! [`SessionFactory`].

pub mod python;

use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::{FigcheckError, FigcheckResult};
use crate::figures::FigureRegistry;
use crate::paths::ScriptRef;

pub use python::{
    find_python, probe_interpreter, InterpreterInfo, PythonSession, PythonSessionConfig,
    PythonSessionFactory,
};

/// A script prepared for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    /// Script identity, used in error messages.
    pub script: ScriptRef,
    /// File name the source is compiled under (shows up in tracebacks).
    pub filename: PathBuf,
    /// Source with interactive display calls removed.
    pub source: String,
    /// Names `matplotlib.pyplot` is bound to in the script namespace.
    pub aliases: Vec<String>,
}

impl ExecutionUnit {
    /// Prepares source text for execution.
    pub fn new(
        script: ScriptRef,
        filename: impl Into<PathBuf>,
        source: &str,
        aliases: &[String],
    ) -> Self {
        Self {
            script,
            filename: filename.into(),
            source: strip_interactive_calls(source, aliases),
            aliases: aliases.to_vec(),
        }
    }

    /// Reads and prepares a script file.
    pub fn from_file(script: ScriptRef, path: &Path, aliases: &[String]) -> FigcheckResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(Self::new(script, path, &source, aliases))
    }
}

/// Removes every `<alias>.show()` call for the given aliases.
///
/// Only argument-less calls are removed, and an alias must not be the tail of
/// a longer name (`fig.show()` and `myplt.show()` are kept).
pub fn strip_interactive_calls(source: &str, aliases: &[String]) -> String {
    let names: Vec<String> = aliases
        .iter()
        .filter(|a| !a.is_empty())
        .map(|a| regex::escape(a))
        .collect();
    if names.is_empty() {
        return source.to_string();
    }

    let pattern = format!(r"(^|[^\w.])(?:{})\.show\(\s*\)", names.join("|"));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(source, "$1").into_owned(),
        Err(_) => source.to_string(),
    }
}

/// Executes prepared scripts.
pub trait ScriptSandbox {
    /// Run a script to completion in a fresh namespace.
    ///
    /// Exceptions raised by the script come back as
    /// [`FigcheckError::ScriptFailed`].
    fn execute(&mut self, unit: &ExecutionUnit) -> FigcheckResult<()>;
}

/// An interpreter that executes scripts and exposes the figures they create.
pub trait PlotSession: ScriptSandbox + FigureRegistry {}

impl<T: ScriptSandbox + FigureRegistry> PlotSession for T {}

/// Opens one session per script.
///
/// Sessions are opened after the working directory has been switched to the
/// script's directory, so a subprocess-backed session inherits it.
pub trait SessionFactory {
    /// Session type produced.
    type Session: PlotSession;

    /// Start a fresh session.
    fn open(&self) -> FigcheckResult<Self::Session>;
}

/// Builds a [`FigcheckError::ScriptFailed`] for `unit`.
pub(crate) fn script_failed(
    unit: &ExecutionUnit,
    message: impl Into<String>,
    traceback: Option<String>,
) -> FigcheckError {
    FigcheckError::ScriptFailed {
        script: unit.script.to_string(),
        message: message.into(),
        traceback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn aliases() -> Vec<String> {
        vec!["pl".to_string(), "plt".to_string(), "pylab".to_string()]
    }

    #[test]
    fn test_strip_removes_each_alias() {
        let source = "plt.plot(x)\nplt.show()\npl.show()\npylab.show( )\n";
        assert_eq!(
            strip_interactive_calls(source, &aliases()),
            "plt.plot(x)\n\n\n\n"
        );
    }

    #[test]
    fn test_strip_keeps_indentation_and_other_calls() {
        let source = "if True:\n    plt.show()\nfig.show()\nmyplt.show()\nax.pl.show()\n";
        assert_eq!(
            strip_interactive_calls(source, &aliases()),
            "if True:\n    \nfig.show()\nmyplt.show()\nax.pl.show()\n"
        );
    }

    #[test]
    fn test_strip_keeps_calls_with_arguments() {
        let source = "plt.show(block=False)\n";
        assert_eq!(strip_interactive_calls(source, &aliases()), source);
    }

    #[test]
    fn test_strip_inline_statement() {
        let source = "plt.plot(x); plt.show()\n";
        assert_eq!(
            strip_interactive_calls(source, &aliases()),
            "plt.plot(x); \n"
        );
    }

    #[test]
    fn test_strip_without_aliases_is_identity() {
        let source = "plt.show()\n";
        assert_eq!(strip_interactive_calls(source, &[]), source);
    }

    #[test]
    fn test_execution_unit_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fig_a.py");
        std::fs::write(&path, "import numpy as np\nplt.plot([1, 2])\nplt.show()\n").unwrap();

        let unit = ExecutionUnit::from_file(
            ScriptRef::new("book_figures/chapter1/fig_a.py"),
            &path,
            &aliases(),
        )
        .unwrap();

        assert_eq!(unit.source, "import numpy as np\nplt.plot([1, 2])\n\n");
        assert_eq!(unit.filename, path);
        assert_eq!(unit.aliases, aliases());
    }

    #[test]
    fn test_execution_unit_missing_file() {
        let err = ExecutionUnit::from_file(
            ScriptRef::new("fig_missing.py"),
            Path::new("/nonexistent/fig_missing.py"),
            &aliases(),
        )
        .unwrap_err();
        assert!(matches!(err, FigcheckError::Io(_)));
    }
}
