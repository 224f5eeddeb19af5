//! Python subprocess session.
//!
//! Each session is one interpreter running the embedded entrypoint. Requests
//! and responses are single JSON lines over stdin/stdout. A reader thread
//! forwards stdout lines over a channel so every request can be bounded by a
//! timeout, and a second thread drains stderr so the interpreter never blocks
//! on a full pipe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::{script_failed, ExecutionUnit, ScriptSandbox, SessionFactory};
use crate::config::HarnessConfig;
use crate::error::{FigcheckError, FigcheckResult};
use crate::figures::{FigureRegistry, OpenFigure, SaveOptions};

const EMBEDDED_ENTRYPOINT_PY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../python/figcheck_entrypoint.py"
));

/// Environment variable overriding the interpreter lookup.
pub const PYTHON_ENV: &str = "FIGCHECK_PYTHON";

/// Environment variable overriding the entrypoint script.
pub const ENTRYPOINT_ENV: &str = "FIGCHECK_ENTRYPOINT";

/// Grace period for an orderly shutdown before the interpreter is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Settings for starting sessions.
#[derive(Debug, Clone)]
pub struct PythonSessionConfig {
    /// Interpreter path; looked up when unset.
    pub python: Option<PathBuf>,
    /// Entrypoint path; the embedded one is used when unset.
    pub entrypoint: Option<PathBuf>,
    /// Matplotlib backend.
    pub backend: String,
    /// Matplotlib rc parameters.
    pub rc: BTreeMap<String, serde_json::Value>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for PythonSessionConfig {
    fn default() -> Self {
        Self::from(&HarnessConfig::default())
    }
}

impl From<&HarnessConfig> for PythonSessionConfig {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            python: config.python.clone(),
            entrypoint: config.entrypoint.clone(),
            backend: config.backend.clone(),
            rc: config.rc.clone(),
            timeout: config.timeout(),
        }
    }
}

impl PythonSessionConfig {
    /// Sets the interpreter path.
    pub fn python(mut self, path: impl Into<PathBuf>) -> Self {
        self.python = Some(path.into());
        self
    }

    /// Sets the timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Finds the Python interpreter.
///
/// Order: explicit path, `FIGCHECK_PYTHON`, then `python3` and `python` on
/// `PATH`.
pub fn find_python(explicit: Option<&Path>) -> FigcheckResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        if let Ok(found) = which::which(path) {
            return Ok(found);
        }
    }

    if let Ok(path) = std::env::var(PYTHON_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    let names = if cfg!(windows) {
        vec!["python.exe", "python3.exe", "python"]
    } else {
        vec!["python3", "python"]
    };

    for name in names {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    Err(FigcheckError::PythonNotFound)
}

struct ResolvedEntrypoint {
    path: PathBuf,
    _tempfile: Option<tempfile::NamedTempFile>,
}

fn resolve_entrypoint(explicit: Option<&Path>) -> FigcheckResult<ResolvedEntrypoint> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(ResolvedEntrypoint {
                path: path.to_path_buf(),
                _tempfile: None,
            });
        }
        return Err(FigcheckError::EntrypointNotFound {
            path: path.to_path_buf(),
        });
    }

    if let Ok(path) = std::env::var(ENTRYPOINT_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(ResolvedEntrypoint {
                path,
                _tempfile: None,
            });
        }
        return Err(FigcheckError::EntrypointNotFound { path });
    }

    let mut file = tempfile::Builder::new()
        .prefix("figcheck_entrypoint_")
        .suffix(".py")
        .tempfile()?;
    file.write_all(EMBEDDED_ENTRYPOINT_PY.as_bytes())?;
    file.flush()?;

    Ok(ResolvedEntrypoint {
        path: file.path().to_path_buf(),
        _tempfile: Some(file),
    })
}

/// Starts [`PythonSession`]s with a resolved interpreter and entrypoint.
pub struct PythonSessionFactory {
    config: PythonSessionConfig,
    python: PathBuf,
    entrypoint: ResolvedEntrypoint,
}

impl PythonSessionFactory {
    /// Resolves the interpreter and entrypoint once for all sessions.
    pub fn new(config: PythonSessionConfig) -> FigcheckResult<Self> {
        let python = find_python(config.python.as_deref())?;
        let entrypoint = resolve_entrypoint(config.entrypoint.as_deref())?;
        Ok(Self {
            config,
            python,
            entrypoint,
        })
    }

    /// Interpreter used for every session.
    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Entrypoint script used for every session.
    pub fn entrypoint(&self) -> &Path {
        &self.entrypoint.path
    }
}

impl SessionFactory for PythonSessionFactory {
    type Session = PythonSession;

    fn open(&self) -> FigcheckResult<PythonSession> {
        let mut session =
            PythonSession::spawn(&self.python, &self.entrypoint.path, self.config.timeout)?;
        session.configure(&self.config.backend, &self.config.rc)?;
        Ok(session)
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Configure {
        backend: &'a str,
        rc: &'a BTreeMap<String, serde_json::Value>,
    },
    CloseAll,
    Exec {
        filename: &'a Path,
        source: &'a str,
        aliases: &'a [String],
    },
    ListOpen,
    Save {
        number: u32,
        path: &'a Path,
        #[serde(flatten)]
        options: &'a SaveOptions,
    },
    Shutdown,
}

impl Request<'_> {
    fn op(&self) -> &'static str {
        match self {
            Request::Configure { .. } => "configure",
            Request::CloseAll => "close_all",
            Request::Exec { .. } => "exec",
            Request::ListOpen => "list_open",
            Request::Save { .. } => "save",
            Request::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    traceback: Option<String>,
    #[serde(default)]
    figures: Option<Vec<OpenFigure>>,
}

impl Response {
    fn error_message(&mut self) -> String {
        self.error
            .take()
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// One running interpreter.
pub struct PythonSession {
    child: Child,
    stdin: Option<ChildStdin>,
    responses: Receiver<std::io::Result<String>>,
    stderr: Arc<Mutex<String>>,
    timeout: Duration,
}

impl PythonSession {
    /// Spawns the interpreter in the current working directory.
    pub fn spawn(python: &Path, entrypoint: &Path, timeout: Duration) -> FigcheckResult<Self> {
        let mut child = Command::new(python)
            .arg("-u")
            .arg(entrypoint)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(FigcheckError::SpawnFailed)?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FigcheckError::Protocol("interpreter stdout not captured".to_string()))?;
        let stderr_pipe = child.stderr.take();

        let (tx, responses) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let stderr = Arc::new(Mutex::new(String::new()));
        if let Some(mut pipe) = stderr_pipe {
            let sink = Arc::clone(&stderr);
            thread::spawn(move || {
                let mut buf = [0u8; 4096];
                while let Ok(n) = pipe.read(&mut buf) {
                    if n == 0 {
                        break;
                    }
                    if let Ok(mut out) = sink.lock() {
                        out.push_str(&String::from_utf8_lossy(&buf[..n]));
                    }
                }
            });
        }

        Ok(Self {
            child,
            stdin,
            responses,
            stderr,
            timeout,
        })
    }

    /// Everything the interpreter wrote to stderr so far.
    pub fn stderr(&self) -> String {
        self.stderr
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Sets the backend and rc parameters.
    pub fn configure(
        &mut self,
        backend: &str,
        rc: &BTreeMap<String, serde_json::Value>,
    ) -> FigcheckResult<()> {
        let request = Request::Configure { backend, rc };
        let op = request.op();
        let mut response = self.request(&request)?;
        if !response.ok {
            return Err(FigcheckError::request_failed(op, response.error_message()));
        }
        Ok(())
    }

    fn request(&mut self, request: &Request<'_>) -> FigcheckResult<Response> {
        let mut line = serde_json::to_string(request).map_err(FigcheckError::Json)?;
        line.push('\n');

        let written = match self.stdin.as_mut() {
            Some(stdin) => stdin
                .write_all(line.as_bytes())
                .and_then(|_| stdin.flush()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "session stdin closed",
            )),
        };
        if written.is_err() {
            return Err(self.exited());
        }

        match self.responses.recv_timeout(self.timeout) {
            Ok(Ok(line)) => serde_json::from_str(&line).map_err(|e| {
                FigcheckError::Protocol(format!("{} (response to '{}': {})", e, request.op(), line))
            }),
            Ok(Err(e)) => Err(FigcheckError::Io(e)),
            Err(RecvTimeoutError::Timeout) => {
                let _ = self.child.kill();
                let _ = self.child.wait();
                Err(FigcheckError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(self.exited()),
        }
    }

    fn exited(&mut self) -> FigcheckError {
        let exit_code = wait_for_exit(&mut self.child, SHUTDOWN_GRACE)
            .and_then(|status| status.code())
            .unwrap_or(-1);
        FigcheckError::SessionExited {
            exit_code,
            stderr: self.stderr(),
        }
    }

    fn expect_ok(&mut self, request: &Request<'_>) -> FigcheckResult<Response> {
        let op = request.op();
        let mut response = self.request(request)?;
        if !response.ok {
            return Err(FigcheckError::request_failed(op, response.error_message()));
        }
        Ok(response)
    }
}

impl ScriptSandbox for PythonSession {
    fn execute(&mut self, unit: &ExecutionUnit) -> FigcheckResult<()> {
        let request = Request::Exec {
            filename: &unit.filename,
            source: &unit.source,
            aliases: &unit.aliases,
        };
        let mut response = self.request(&request)?;
        if !response.ok {
            let message = response.error_message();
            return Err(script_failed(unit, message, response.traceback.take()));
        }
        Ok(())
    }
}

impl FigureRegistry for PythonSession {
    fn close_all(&mut self) -> FigcheckResult<()> {
        self.expect_ok(&Request::CloseAll).map(|_| ())
    }

    fn list_open(&mut self) -> FigcheckResult<Vec<OpenFigure>> {
        let response = self.expect_ok(&Request::ListOpen)?;
        let mut figures = response.figures.unwrap_or_default();
        figures.sort_by_key(|f| f.number);
        Ok(figures)
    }

    fn save(&mut self, number: u32, path: &Path, options: &SaveOptions) -> FigcheckResult<()> {
        self.expect_ok(&Request::Save {
            number,
            path,
            options,
        })
        .map(|_| ())
    }
}

impl Drop for PythonSession {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            if let Some(mut stdin) = self.stdin.take() {
                if let Ok(line) = serde_json::to_string(&Request::Shutdown) {
                    let _ = writeln!(stdin, "{}", line);
                    let _ = stdin.flush();
                }
            }
            if wait_for_exit(&mut self.child, SHUTDOWN_GRACE).is_none() {
                let _ = self.child.kill();
                let _ = self.child.wait();
            }
        }
    }
}

fn wait_for_exit(child: &mut Child, grace: Duration) -> Option<std::process::ExitStatus> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if start.elapsed() < grace => thread::sleep(Duration::from_millis(20)),
            _ => return None,
        }
    }
}

/// Interpreter details reported by `doctor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterInfo {
    /// Interpreter path.
    pub path: PathBuf,
    /// `sys.version` first line.
    pub python_version: String,
    /// `matplotlib.__version__`, if importable.
    pub matplotlib_version: Option<String>,
}

const PROBE_SCRIPT: &str = r#"
import json, sys
try:
    import matplotlib
    mpl = matplotlib.__version__
except Exception:
    mpl = None
print(json.dumps({"python": sys.version.split()[0], "matplotlib": mpl}))
"#;

/// Runs the interpreter once to report its version and matplotlib's.
pub fn probe_interpreter(python: &Path) -> FigcheckResult<InterpreterInfo> {
    #[derive(Deserialize)]
    struct Probe {
        python: String,
        matplotlib: Option<String>,
    }

    let output = Command::new(python)
        .arg("-c")
        .arg(PROBE_SCRIPT)
        .stdin(Stdio::null())
        .output()
        .map_err(FigcheckError::SpawnFailed)?;

    if !output.status.success() {
        return Err(FigcheckError::SessionExited {
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let probe: Probe = serde_json::from_str(stdout.trim()).map_err(FigcheckError::Json)?;

    Ok(InterpreterInfo {
        path: python.to_path_buf(),
        python_version: probe.python,
        matplotlib_version: probe.matplotlib,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_wire_format() {
        let save = Request::Save {
            number: 2,
            path: Path::new("/out/fig_a_2.png"),
            options: &SaveOptions::black_background(),
        };
        let json: serde_json::Value = serde_json::to_value(&save).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "op": "save",
                "number": 2,
                "path": "/out/fig_a_2.png",
                "facecolor": "k",
                "edgecolor": "none",
            })
        );

        let plain = serde_json::to_value(&Request::Save {
            number: 1,
            path: Path::new("a.png"),
            options: &SaveOptions::default(),
        })
        .unwrap();
        assert!(plain.get("facecolor").is_none());

        assert_eq!(
            serde_json::to_value(&Request::CloseAll).unwrap(),
            serde_json::json!({ "op": "close_all" })
        );
    }

    #[test]
    fn test_exec_request_carries_aliases() {
        let aliases = vec!["plt".to_string()];
        let json = serde_json::to_value(&Request::Exec {
            filename: Path::new("fig_a.py"),
            source: "plt.plot([1])\n",
            aliases: &aliases,
        })
        .unwrap();
        assert_eq!(json["op"], "exec");
        assert_eq!(json["aliases"], serde_json::json!(["plt"]));
        assert_eq!(Request::ListOpen.op(), "list_open");
    }

    #[test]
    fn test_response_parsing() {
        let mut failed: Response = serde_json::from_str(
            r#"{"ok": false, "error": "NameError: name 'np' is not defined", "traceback": "Traceback ..."}"#,
        )
        .unwrap();
        assert!(!failed.ok);
        assert_eq!(failed.error_message(), "NameError: name 'np' is not defined");
        assert_eq!(failed.traceback.as_deref(), Some("Traceback ..."));

        let listed: Response = serde_json::from_str(
            r#"{"ok": true, "figures": [{"number": 1, "facecolor": [0, 0, 0, 1]}]}"#,
        )
        .unwrap();
        let figures = listed.figures.unwrap();
        assert_eq!(figures.len(), 1);
        assert!(figures[0].has_black_background());
    }

    #[test]
    fn test_explicit_missing_entrypoint_is_error() {
        let err = resolve_entrypoint(Some(Path::new("/nonexistent/entry.py")))
            .err()
            .unwrap();
        assert!(matches!(err, FigcheckError::EntrypointNotFound { .. }));
    }

    #[test]
    fn test_embedded_entrypoint_speaks_protocol() {
        for op in ["configure", "close_all", "exec", "list_open", "save", "shutdown"] {
            assert!(
                EMBEDDED_ENTRYPOINT_PY.contains(&format!("\"{}\"", op)),
                "entrypoint missing op {}",
                op
            );
        }
    }

    #[test]
    fn test_session_config_from_harness_config() {
        let harness = HarnessConfig::default().python("/opt/py/bin/python3").timeout_secs(5);
        let config = PythonSessionConfig::from(&harness);
        assert_eq!(config.python, Some(PathBuf::from("/opt/py/bin/python3")));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.backend, "Agg");
    }
}
