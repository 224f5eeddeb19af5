//! Shared fixtures for pipeline tests: an in-memory plot session and PNG helpers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};

use figcheck_core::{
    ExecutionUnit, FigcheckError, FigcheckResult, FigureRegistry, OpenFigure, SaveOptions,
    ScriptSandbox, SessionFactory,
};
use image::{Rgb, RgbImage};

static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that change the process working directory.
pub fn lock_cwd() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

pub const WHITE: [u8; 3] = [255, 255, 255];
pub const BLACK: [u8; 3] = [0, 0, 0];
pub const RED: [u8; 3] = [220, 30, 30];

/// Writes a solid-color PNG, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(path)
        .unwrap();
}

/// A figure the fake script creates.
#[derive(Debug, Clone)]
pub struct FakeFigure {
    pub number: u32,
    pub facecolor: [f64; 4],
    pub pixels: [u8; 3],
}

impl FakeFigure {
    pub fn plain(number: u32, pixels: [u8; 3]) -> Self {
        Self {
            number,
            facecolor: [1.0, 1.0, 1.0, 1.0],
            pixels,
        }
    }

    pub fn dark(number: u32) -> Self {
        Self {
            number,
            facecolor: [0.0, 0.0, 0.0, 1.0],
            pixels: BLACK,
        }
    }
}

/// What a script does when executed.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    pub figures: Vec<FakeFigure>,
    pub raises: Option<String>,
}

/// Observations shared between the factory and its sessions.
#[derive(Debug, Default)]
pub struct FakeLog {
    pub opened: usize,
    pub executed: Vec<String>,
    pub cwd_during_exec: Vec<PathBuf>,
    pub sources: Vec<String>,
    pub saves: Vec<(u32, PathBuf, SaveOptions)>,
}

/// Session factory driven by a table of script behaviors keyed by file name.
#[derive(Clone, Default)]
pub struct FakeFactory {
    pub scripts: Rc<RefCell<HashMap<String, FakeScript>>>,
    pub log: Rc<RefCell<FakeLog>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, file_name: &str, script: FakeScript) -> Self {
        self.scripts
            .borrow_mut()
            .insert(file_name.to_string(), script);
        self
    }
}

pub struct FakeSession {
    scripts: Rc<RefCell<HashMap<String, FakeScript>>>,
    log: Rc<RefCell<FakeLog>>,
    open: Vec<FakeFigure>,
}

impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    fn open(&self) -> FigcheckResult<FakeSession> {
        self.log.borrow_mut().opened += 1;
        Ok(FakeSession {
            scripts: Rc::clone(&self.scripts),
            log: Rc::clone(&self.log),
            open: Vec::new(),
        })
    }
}

impl ScriptSandbox for FakeSession {
    fn execute(&mut self, unit: &ExecutionUnit) -> FigcheckResult<()> {
        {
            let mut log = self.log.borrow_mut();
            log.executed.push(unit.script.to_string());
            log.cwd_during_exec.push(std::env::current_dir()?);
            log.sources.push(unit.source.clone());
        }

        let script = self
            .scripts
            .borrow()
            .get(unit.script.file_name())
            .cloned()
            .unwrap_or_default();

        if let Some(message) = script.raises {
            return Err(FigcheckError::ScriptFailed {
                script: unit.script.to_string(),
                message,
                traceback: Some("Traceback (most recent call last):\n  ...".to_string()),
            });
        }

        self.open = script.figures;
        Ok(())
    }
}

impl FigureRegistry for FakeSession {
    fn close_all(&mut self) -> FigcheckResult<()> {
        self.open.clear();
        Ok(())
    }

    fn list_open(&mut self) -> FigcheckResult<Vec<OpenFigure>> {
        let mut figures: Vec<OpenFigure> = self
            .open
            .iter()
            .map(|f| OpenFigure::new(f.number, f.facecolor))
            .collect();
        figures.sort_by_key(|f| f.number);
        Ok(figures)
    }

    fn save(&mut self, number: u32, path: &Path, options: &SaveOptions) -> FigcheckResult<()> {
        let figure = self
            .open
            .iter()
            .find(|f| f.number == number)
            .ok_or_else(|| FigcheckError::request_failed("save", format!("no figure {}", number)))?;
        write_png(path, 16, 12, figure.pixels);
        self.log
            .borrow_mut()
            .saves
            .push((number, path.to_path_buf(), options.clone()));
        Ok(())
    }
}

/// Creates `book_figures/<chapter>/<name>` with a small plotting source.
pub fn write_script(root: &Path, chapter: &str, name: &str) -> PathBuf {
    let path = root.join("book_figures").join(chapter).join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        "import numpy as np\nplt.plot(np.arange(3))\nplt.show()\n",
    )
    .unwrap();
    path
}

/// Writes a baseline image for figure `number` of `book_figures/<chapter>/<stem>.py`.
pub fn write_baseline(root: &Path, chapter: &str, stem: &str, number: u32, color: [u8; 3]) {
    let path = root
        .join("baseline")
        .join("book_figures")
        .join(chapter)
        .join(format!("{}_{}.png", stem, number));
    write_png(&path, 16, 12, color);
}
