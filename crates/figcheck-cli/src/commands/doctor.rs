//! Doctor command implementation
//!
//! Checks the Python interpreter, matplotlib, LaTeX, and the harness layout.

use anyhow::Result;
use colored::Colorize;
use figcheck_core::{find_python, probe_interpreter, PythonSessionConfig, PythonSessionFactory};
use std::path::Path;
use std::process::ExitCode;

use super::project::Project;

/// Run the doctor command
///
/// Checks:
/// - Python interpreter and matplotlib version
/// - LaTeX availability when `text.usetex` is enabled
/// - Scripts and baseline directories under the harness root
///
/// # Returns
/// Exit code: 0 if all checks pass, 1 if any fail
pub fn run(root: Option<&str>, config: Option<&str>, python: Option<&str>) -> Result<ExitCode> {
    println!("{}", "Figcheck Doctor".cyan().bold());
    println!("{}", "===============".cyan());
    println!();

    let project = Project::load(root, config)?.with_python(python);
    let mut all_ok = true;

    println!("{}", "Versions:".bold());
    println!(
        "  {} figcheck-cli v{}",
        "->".green(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("{}", "Dependencies:".bold());
    match find_python(project.config.python.as_deref()) {
        Ok(path) => match probe_interpreter(&path) {
            Ok(info) => {
                println!(
                    "  {} Python {} ({})",
                    "ok".green(),
                    info.python_version,
                    info.path.display()
                );
                match info.matplotlib_version {
                    Some(version) => println!("  {} matplotlib {}", "ok".green(), version),
                    None => {
                        println!("  {} matplotlib is not importable", "!!".red());
                        all_ok = false;
                    }
                }
            }
            Err(e) => {
                println!("  {} Python check failed: {}", "!!".red(), e);
                all_ok = false;
            }
        },
        Err(e) => {
            println!("  {} {}", "!!".red(), e);
            all_ok = false;
        }
    }

    if uses_tex(&project) {
        if which::which("latex").is_ok() {
            println!("  {} latex (text.usetex is enabled)", "ok".green());
        } else {
            println!("  {} latex not found in PATH", "!!".yellow());
            println!(
                "     {}",
                "text.usetex is enabled; figures with text will fail to render.".dimmed()
            );
        }
    }

    match PythonSessionFactory::new(PythonSessionConfig::from(&project.config)) {
        Ok(factory) => println!(
            "  {} Session entrypoint ({})",
            "ok".green(),
            factory.entrypoint().display()
        ),
        Err(e) => {
            // Interpreter problems were already reported above.
            if project.config.entrypoint.is_some() {
                println!("  {} {}", "!!".red(), e);
                all_ok = false;
            }
        }
    }

    println!();

    println!("{}", "Layout:".bold());
    println!("  {} Root {}", "->".green(), project.root.display());
    all_ok &= check_dir("Scripts", &project.root.join(&project.config.scripts_dir), true);
    check_dir(
        "Baselines",
        &project.root.join(&project.config.baseline_dir),
        false,
    );
    println!(
        "  {} {} known failure(s), tolerance {}",
        "->".green(),
        project.config.known_failures().len(),
        project.config.tolerance
    );

    println!();

    if all_ok {
        println!("{} All checks passed!", "SUCCESS".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} Some checks failed. See above for details.",
            "WARNING".yellow().bold()
        );
        Ok(ExitCode::from(1))
    }
}

fn uses_tex(project: &Project) -> bool {
    project
        .config
        .rc
        .get("text.usetex")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn check_dir(label: &str, path: &Path, required: bool) -> bool {
    if path.is_dir() {
        println!("  {} {} {}", "ok".green(), label, path.display());
        true
    } else if required {
        println!("  {} {} missing: {}", "!!".red(), label, path.display());
        false
    } else {
        println!(
            "  {} {} missing: {} (create with run --update-baselines)",
            "!!".yellow(),
            label,
            path.display()
        );
        true
    }
}
