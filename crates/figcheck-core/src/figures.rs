//! Open figures and how they are saved.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::FigcheckResult;

/// Face color matplotlib reports for black (`"k"`).
const BLACK_FACECOLOR: &str = "k";

/// A figure still open in the interpreter after a script ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenFigure {
    /// Figure number assigned by matplotlib at creation time.
    pub number: u32,
    /// Face color as RGBA in `0.0..=1.0`.
    pub facecolor: [f64; 4],
}

impl OpenFigure {
    /// Creates a figure handle.
    pub fn new(number: u32, facecolor: [f64; 4]) -> Self {
        Self { number, facecolor }
    }

    /// Whether the face color is pure black, ignoring alpha.
    pub fn has_black_background(&self) -> bool {
        self.facecolor[..3].iter().all(|&c| c == 0.0)
    }
}

/// Styling overrides passed to `savefig`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    /// Face color override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facecolor: Option<String>,
    /// Edge color override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edgecolor: Option<String>,
}

impl SaveOptions {
    /// Black face with no edge.
    ///
    /// `savefig` otherwise writes the rc default face color, which turns a
    /// dark-themed figure white in the saved image.
    pub fn black_background() -> Self {
        Self {
            facecolor: Some(BLACK_FACECOLOR.to_string()),
            edgecolor: Some("none".to_string()),
        }
    }

    /// Options for saving `figure`.
    pub fn for_figure(figure: &OpenFigure) -> Self {
        if figure.has_black_background() {
            Self::black_background()
        } else {
            Self::default()
        }
    }

    /// Whether any override is set.
    pub fn is_default(&self) -> bool {
        self.facecolor.is_none() && self.edgecolor.is_none()
    }
}

/// The interpreter's table of open figures.
pub trait FigureRegistry {
    /// Close every open figure.
    fn close_all(&mut self) -> FigcheckResult<()>;

    /// Open figures in ascending number order.
    fn list_open(&mut self) -> FigcheckResult<Vec<OpenFigure>>;

    /// Save one figure as PNG.
    fn save(&mut self, number: u32, path: &Path, options: &SaveOptions) -> FigcheckResult<()>;
}
