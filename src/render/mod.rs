//! Figure model and renderers
//!
//! The plotter produces a complete [`Figure`]: a grid of subplots, each with
//! its labels, draw calls, annotations, ticks and legend. Drawing it is left
//! to a [`ChartRenderer`]:
//!
//! - `json.rs`: serializes the figure for an external plotting front end
//! - `recording.rs`: keeps figures in memory, for tests

pub mod json;
pub mod recording;

pub use json::JsonRenderer;
pub use recording::RecordingRenderer;

use crate::config::YScale;
use crate::survey::{PlotValueError, Result};
use serde::Serialize;

/// Draws a finished figure
pub trait ChartRenderer {
    fn render(&mut self, figure: &Figure) -> Result<()>;
}

/// Grid of subplots, filled row by row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub rows: usize,
    pub cols: usize,
    pub subplots: Vec<Subplot>,
}

impl Figure {
    /// Near-square grid holding `n` subplots
    ///
    /// `rows = ceil(sqrt(n))`, `cols = ceil(n / rows)`.
    pub fn grid(n: usize) -> (usize, usize) {
        if n == 0 {
            return (0, 0);
        }
        let mut rows = (n as f64).sqrt() as usize;
        if rows * rows < n {
            rows += 1;
        }
        let cols = n.div_ceil(rows);
        (rows, cols)
    }

    pub fn new(subplots: Vec<Subplot>) -> Self {
        let (rows, cols) = Self::grid(subplots.len());
        Self {
            rows,
            cols,
            subplots,
        }
    }

    /// Total number of draw calls over all subplots
    pub fn draw_count(&self) -> usize {
        self.subplots.iter().map(|s| s.draws.len()).sum()
    }
}

/// One cell of the figure grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subplot {
    /// Position in drawing order; row and column follow from it
    pub index: usize,
    pub row: usize,
    pub col: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    pub y_scale: YScale,
    pub draws: Vec<DrawCall>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    /// Categorical ticks; only set for bar charts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_ticks: Option<XTicks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
}

impl Subplot {
    pub fn new(index: usize, cols: usize, y_scale: YScale) -> Self {
        let cols = cols.max(1);
        Self {
            index,
            row: index / cols,
            col: index % cols,
            title: None,
            x_label: None,
            y_label: None,
            y_scale,
            draws: Vec::new(),
            annotations: Vec::new(),
            x_ticks: None,
            legend: None,
        }
    }
}

/// A single series drawn in a subplot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DrawCall {
    Line {
        x: Vec<f64>,
        y: Vec<f64>,
        color: String,
    },
    /// Bars of one block at every x position
    Bar {
        x: Vec<f64>,
        heights: Vec<f64>,
        width: f64,
        /// Base of each bar; all zero unless stacked
        bottom: Vec<f64>,
        color: String,
    },
}

impl DrawCall {
    pub fn color(&self) -> &str {
        match self {
            DrawCall::Line { color, .. } | DrawCall::Bar { color, .. } => color,
        }
    }

    /// Check that the series can be drawn
    ///
    /// Coordinates must pair up and be finite, and bars need a positive width.
    pub fn validate(&self) -> std::result::Result<(), PlotValueError> {
        match self {
            DrawCall::Line { x, y, .. } => {
                check_lengths("x", x, "y", y)?;
                check_finite("x", x)?;
                check_finite("y", y)
            }
            DrawCall::Bar {
                x,
                heights,
                width,
                bottom,
                ..
            } => {
                check_lengths("x", x, "heights", heights)?;
                check_lengths("x", x, "bottom", bottom)?;
                if !(width.is_finite() && *width > 0.0) {
                    return Err(PlotValueError(format!("bar width {} is not positive", width)));
                }
                check_finite("x", x)?;
                check_finite("heights", heights)?;
                check_finite("bottom", bottom)
            }
        }
    }
}

fn check_lengths(a: &str, xs: &[f64], b: &str, ys: &[f64]) -> std::result::Result<(), PlotValueError> {
    if xs.len() != ys.len() {
        return Err(PlotValueError(format!(
            "{} has {} values but {} has {}",
            a,
            xs.len(),
            b,
            ys.len()
        )));
    }
    Ok(())
}

fn check_finite(name: &str, values: &[f64]) -> std::result::Result<(), PlotValueError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(PlotValueError(format!(
            "{}[{}] is {}",
            name, i, values[i]
        ))),
        None => Ok(()),
    }
}

/// Extra marks drawn over bar charts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Annotation {
    /// Text centred horizontally, bottom-aligned at `y`
    Text { x: f64, y: f64, text: String },
    /// Horizontal bracket spanning `x - half_width ..= x + half_width`
    Bracket { x: f64, y: f64, half_width: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XTicks {
    pub positions: Vec<f64>,
    pub labels: Vec<String>,
    /// Visible x range
    pub limits: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}
