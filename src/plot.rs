//! Plot sinks for best-so-far curves.
//!
//! One figure per (function, n_var) configuration, one curve per noise level.
//! The ranking code never draws anything itself; it hands finished figures
//! to whatever sink the caller supplied.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Serialize;

use crate::ranking::{NoiseLevel, TracePoint};

/// Horizontal room reserved to the right of `max_eval` for curve labels.
const LABEL_MARGIN: f64 = 1.08;
/// Curve labels sit just past the evaluation cap.
const LABEL_OFFSET: f64 = 1.005;
const DEFAULT_SIZE: (u32, u32) = (700, 400);

/// Inferno sampled at 0.0, 0.1, ..., 1.0.
const INFERNO: [RGBColor; 11] = [
    RGBColor(0, 0, 4),
    RGBColor(22, 11, 57),
    RGBColor(66, 10, 104),
    RGBColor(106, 23, 110),
    RGBColor(147, 38, 103),
    RGBColor(188, 55, 84),
    RGBColor(221, 81, 58),
    RGBColor(243, 120, 25),
    RGBColor(252, 165, 10),
    RGBColor(246, 215, 70),
    RGBColor(252, 255, 164),
];
/// Slice of the ramp used for curves; lowest noise is darkest.
const RAMP_START: f64 = 0.2;
const RAMP_END: f64 = 0.9;

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("render error: {0}")]
    Render(String),
    #[error("invalid plot size '{0}' (expected WIDTHxHEIGHT, e.g. 900x500)")]
    InvalidSize(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct NoiseCurve {
    pub noise: NoiseLevel,
    pub points: Vec<TracePoint>,
}

impl NoiseCurve {
    pub fn label(&self) -> String {
        self.noise.percent_label()
    }
}

/// All curves for one (function, n_var) configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub function: String,
    pub n_var: usize,
    pub max_eval: usize,
    pub curves: Vec<NoiseCurve>,
}

impl Figure {
    pub fn new(function: impl Into<String>, n_var: usize, max_eval: usize) -> Self {
        Self {
            function: function.into(),
            n_var,
            max_eval,
            curves: Vec::new(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.function, self.n_var)
    }

    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.function, self.n_var)
    }

    /// Log-axis range covering every positive value, padded by a factor of 2.
    fn value_range(&self) -> (f64, f64) {
        let positive = self
            .curves
            .iter()
            .flat_map(|c| c.points.iter().map(|p| p.best))
            .filter(|v| v.is_finite() && *v > 0.0);
        let (lo, hi) = positive.fold((f64::INFINITY, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() {
            return (1e-3, 1.0);
        }
        (lo / 2.0, hi * 2.0)
    }
}

/// Ramp position of curve `index` out of `count`, i.e. `linspace(0.2, 0.9, count)`.
fn ramp_position(index: usize, count: usize) -> f64 {
    if count <= 1 {
        return RAMP_START;
    }
    RAMP_START + (RAMP_END - RAMP_START) * index as f64 / (count - 1) as f64
}

/// One color per curve, ordered along the inferno ramp so that curves read
/// in noise order.
pub fn curve_colors(count: usize) -> Vec<RGBColor> {
    let ramp = DerivedColorMap::new(&INFERNO);
    (0..count)
        .map(|i| ramp.get_color(ramp_position(i, count)))
        .collect()
}

/// Parse a `WIDTHxHEIGHT` pixel size such as `900x500`.
pub fn parse_size(raw: &str) -> Result<(u32, u32), PlotError> {
    let invalid = || PlotError::InvalidSize(raw.to_string());
    let (w, h) = raw
        .trim()
        .split_once(|c| c == 'x' || c == 'X')
        .ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

/// Receiver for finished figures.
pub trait PlotSink {
    fn render(&mut self, figure: &Figure) -> Result<(), PlotError>;
}

/// Discards every figure.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPlotSink;

impl PlotSink for NoopPlotSink {
    fn render(&mut self, _figure: &Figure) -> Result<(), PlotError> {
        Ok(())
    }
}

/// Keeps every figure in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryPlotSink {
    pub figures: Vec<Figure>,
}

impl PlotSink for MemoryPlotSink {
    fn render(&mut self, figure: &Figure) -> Result<(), PlotError> {
        self.figures.push(figure.clone());
        Ok(())
    }
}

/// Writes `<function>_<n_var>.svg` into a directory.
#[derive(Debug, Clone)]
pub struct SvgPlotSink {
    dir: PathBuf,
    size: (u32, u32),
    written: Vec<PathBuf>,
}

impl SvgPlotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            size: DEFAULT_SIZE,
            written: Vec::new(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl PlotSink for SvgPlotSink {
    fn render(&mut self, figure: &Figure) -> Result<(), PlotError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.svg", figure.file_stem()));
        draw_figure(&path, figure, self.size)?;
        tracing::info!(path = %path.display(), "wrote figure");
        self.written.push(path);
        Ok(())
    }
}

fn render_err(e: impl std::fmt::Display) -> PlotError {
    PlotError::Render(e.to_string())
}

fn draw_figure(path: &Path, figure: &Figure, size: (u32, u32)) -> Result<(), PlotError> {
    let (y_min, y_max) = figure.value_range();
    let x_max = figure.max_eval as f64;

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(figure.title(), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max * LABEL_MARGIN, (y_min..y_max).log_scale())
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Function Evaluations")
        .y_desc("Best so far")
        .y_label_formatter(&|v| format!("{v:.0e}"))
        .draw()
        .map_err(render_err)?;

    let colors = curve_colors(figure.curves.len());
    for (curve, base) in figure.curves.iter().zip(colors) {
        let color = base.mix(0.9);
        let points: Vec<(f64, f64)> = curve
            .points
            .iter()
            .map(|p| (p.evaluations as f64, p.best.max(y_min)))
            .collect();
        let Some(&(_, last)) = points.last() else {
            continue;
        };

        chart
            .draw_series(LineSeries::new(points, &color))
            .map_err(render_err)?;

        let style = ("sans-serif", 14)
            .into_font()
            .color(&color)
            .pos(Pos::new(HPos::Left, VPos::Center));
        chart
            .draw_series(std::iter::once(Text::new(
                curve.label(),
                (x_max * LABEL_OFFSET, last),
                style,
            )))
            .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    Ok(())
}
