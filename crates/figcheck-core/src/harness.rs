//! The check pipeline: execute, save, compare, decide.

use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::compare::{compare_images, ComparisonError};
use crate::config::HarnessConfig;
use crate::cwd::DirGuard;
use crate::discovery::TestCase;
use crate::disposition::Outcome;
use crate::error::FigcheckResult;
use crate::figures::{FigureRegistry, SaveOptions};
use crate::known_failures::KnownFailures;
use crate::paths::{ArtifactLayout, FigurePaths};
use crate::report::{CaseRecord, CaseReport, CaseStatus, FigureReport, FigureStatus, RunSummary};
use crate::sandbox::{ExecutionUnit, ScriptSandbox, SessionFactory};

/// Run-wide switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarnessOptions {
    /// Copy every result over its baseline instead of comparing.
    pub update_baselines: bool,
    /// Stop after the first failed or errored script.
    pub fail_fast: bool,
}

/// Checks scripts against their baseline figures.
pub struct Harness<F> {
    layout: ArtifactLayout,
    known: KnownFailures,
    aliases: Vec<String>,
    factory: F,
    options: HarnessOptions,
}

impl<F: SessionFactory> Harness<F> {
    /// Creates a harness.
    ///
    /// The layout root must be absolute: scripts run from their own
    /// directory, so relative artifact paths would resolve against it.
    pub fn new(
        layout: ArtifactLayout,
        known: KnownFailures,
        aliases: Vec<String>,
        factory: F,
    ) -> Self {
        Self {
            layout,
            known,
            aliases,
            factory,
            options: HarnessOptions::default(),
        }
    }

    /// Creates a harness for `root` using the config's directories,
    /// allow-list and aliases.
    pub fn from_config(root: &Path, config: &HarnessConfig, factory: F) -> FigcheckResult<Self> {
        let root = root.canonicalize()?;
        Ok(Self::new(
            config.layout(&root),
            config.known_failures(),
            config.aliases.clone(),
            factory,
        ))
    }

    /// Sets run options.
    pub fn with_options(mut self, options: HarnessOptions) -> Self {
        self.options = options;
        self
    }

    /// The artifact layout in use.
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Run one script and check its figures.
    ///
    /// Errors (the script raising, a missing baseline, a broken session)
    /// abort the case; comparison mismatches are collected into the
    /// report's outcome.
    pub fn check(&self, case: &TestCase) -> FigcheckResult<CaseReport> {
        let script_path = self.layout.script_path(&case.script);
        let unit = ExecutionUnit::from_file(case.script.clone(), &script_path, &self.aliases)?;
        self.layout.ensure_result_dir(&case.script)?;

        let figures = {
            let _guard = DirGuard::enter(&self.layout.script_dir(&case.script))?;
            let mut session = self.factory.open()?;
            session.close_all()?;
            session.execute(&unit)?;
            self.capture(&mut session, case)?
        };

        let errors = figures.iter().filter_map(|f| f.error.clone()).collect();
        let outcome = Outcome::decide(&case.script, errors, &self.known);

        Ok(CaseReport {
            script: case.script.clone(),
            tolerance: case.tolerance,
            figures,
            outcome,
        })
    }

    fn capture(
        &self,
        session: &mut F::Session,
        case: &TestCase,
    ) -> FigcheckResult<Vec<FigureReport>> {
        let mut reports = Vec::new();

        for figure in session.list_open()? {
            let paths = self.layout.figure_paths(&case.script, figure.number);
            let options = SaveOptions::for_figure(&figure);
            session.save(figure.number, &paths.result, &options)?;

            let (status, error) = self.settle(figure.number, &paths, case.tolerance)?;
            reports.push(FigureReport {
                number: figure.number,
                result: paths.result,
                baseline: paths.baseline,
                black_background: !options.is_default(),
                status,
                error,
            });
        }

        Ok(reports)
    }

    fn settle(
        &self,
        number: u32,
        paths: &FigurePaths,
        tolerance: f64,
    ) -> FigcheckResult<(FigureStatus, Option<ComparisonError>)> {
        if self.options.update_baselines {
            if let Some(parent) = paths.baseline.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&paths.result, &paths.baseline)?;
            return Ok((FigureStatus::Updated, None));
        }

        match compare_images(&paths.baseline, &paths.result, tolerance)? {
            None => Ok((FigureStatus::Matched, None)),
            Some(error) => Ok((FigureStatus::Mismatched, Some(error.for_figure(number)))),
        }
    }

    /// Check every case in order.
    pub fn run(&self, cases: &[TestCase]) -> RunSummary {
        self.run_with(cases, |_| {})
    }

    /// Check every case in order, reporting each record as it completes.
    pub fn run_with(&self, cases: &[TestCase], mut on_case: impl FnMut(&CaseRecord)) -> RunSummary {
        let started = Instant::now();
        let mut records = Vec::with_capacity(cases.len());

        for case in cases {
            let case_started = Instant::now();
            let record = match self.check(case) {
                Ok(report) => CaseRecord::from_report(report, case_started.elapsed()),
                Err(err) => CaseRecord::errored(case.script.clone(), &err, case_started.elapsed()),
            };
            on_case(&record);

            let stop = self.options.fail_fast
                && matches!(record.status, CaseStatus::Failed | CaseStatus::Errored);
            records.push(record);
            if stop {
                break;
            }
        }

        RunSummary::from_records(records, started.elapsed(), self.options.update_baselines)
    }
}
