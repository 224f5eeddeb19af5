//! List command implementation
//!
//! Prints the scripts a `run` would check, in run order.

use anyhow::Result;
use colored::Colorize;
use figcheck_core::Discovery;
use std::process::ExitCode;

use super::json_output::{error_codes, JsonError, ListOutput, ListedCase};
use super::project::{discovery_source, Project};

/// Run the list command
///
/// # Returns
/// Exit code: 0 on success, 1 if discovery failed
pub fn run(
    root: Option<&str>,
    config: Option<&str>,
    pattern: Option<&str>,
    json_output: bool,
) -> Result<ExitCode> {
    let listed = Project::load(root, config).and_then(|project| collect(&project, pattern));

    if json_output {
        let output = match listed {
            Ok(cases) => ListOutput {
                success: true,
                count: cases.len(),
                cases,
                errors: vec![],
            },
            Err(e) => ListOutput {
                success: false,
                count: 0,
                cases: vec![],
                errors: vec![JsonError::from_anyhow(&e, error_codes::INVALID_ROOT)],
            },
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(if output.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        });
    }

    let cases = listed?;
    for case in &cases {
        if case.known_failure {
            println!("{} {}", case.script, "(known failure)".yellow());
        } else {
            println!("{}", case.script);
        }
    }
    println!("\n{} {} script(s)", "Found".cyan().bold(), cases.len());

    Ok(ExitCode::SUCCESS)
}

fn collect(project: &Project, pattern: Option<&str>) -> Result<Vec<ListedCase>> {
    let known = project.config.known_failures();
    let cases = Discovery::new(&project.root, &project.config)?
        .discover(&discovery_source(pattern))?;

    Ok(cases
        .into_iter()
        .map(|case| ListedCase {
            known_failure: known.contains(&case.script),
            script: case.script,
            tolerance: case.tolerance,
        })
        .collect())
}
