//! Figure data model in plotly's figure-JSON shape.
//!
//! An [`AlignedFigure`] is a list of traces plus a layout. Each trace names
//! the horizontal and vertical axis it is drawn against; the layout gives
//! every axis a domain (a fractional band of the figure) and its tick/grid
//! presentation. Backends in [`crate::render`] consume this model without
//! mutating it.

use serde::{Serialize, Serializer};
use std::fmt;

/// 24-bit colour, serialised as `rgb(r,g,b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// ColorBrewer sequential Blues, 9 classes (light to dark).
const BLUES_9: [(u8, u8, u8); 9] = [
    (247, 251, 255),
    (222, 235, 247),
    (198, 219, 239),
    (158, 202, 225),
    (107, 174, 214),
    (66, 146, 198),
    (33, 113, 181),
    (8, 81, 156),
    (8, 48, 107),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ColorScale {
    #[default]
    Blues,
}

impl ColorScale {
    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            ColorScale::Blues => &BLUES_9,
        }
    }

    /// Colour at `t` in [0, 1], linearly interpolated between stops.
    /// Out-of-range and NaN inputs clamp to the ends.
    pub fn color_at(self, t: f64) -> Rgb {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (stops.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(stops.len() - 1);
        let frac = pos - lo as f64;
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (a, b) = (stops[lo], stops[hi]);
        Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum XAxis {
    #[serde(rename = "x")]
    X,
    #[serde(rename = "x2")]
    X2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum YAxis {
    #[serde(rename = "y")]
    Y,
    #[serde(rename = "y2")]
    Y2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: Rgb,
    pub width: f64,
}

/// Polyline, used for dendrogram links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTrace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub mode: &'static str,
    pub line: LineStyle,
    pub hoverinfo: &'static str,
    pub xaxis: XAxis,
    pub yaxis: YAxis,
}

impl LineTrace {
    pub fn new(x: Vec<f64>, y: Vec<f64>, color: Rgb) -> Self {
        LineTrace {
            x,
            y,
            mode: "lines",
            line: LineStyle { color, width: 1.0 },
            hoverinfo: "text",
            xaxis: XAxis::X,
            yaxis: YAxis::Y,
        }
    }
}

/// Grid of cells. `z[i][j]` is drawn centred at `(x[j], y[i])`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapTrace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<Vec<f64>>,
    pub colorscale: ColorScale,
    pub xaxis: XAxis,
    pub yaxis: YAxis,
}

impl HeatmapTrace {
    /// Finite (min, max) over `z`, if any cell is finite.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        self.z
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(LineTrace),
    Heatmap(HeatmapTrace),
}

impl Trace {
    pub fn axes(&self) -> (XAxis, YAxis) {
        match self {
            Trace::Scatter(t) => (t.xaxis, t.yaxis),
            Trace::Heatmap(t) => (t.xaxis, t.yaxis),
        }
    }

    pub fn set_xaxis(&mut self, axis: XAxis) {
        match self {
            Trace::Scatter(t) => t.xaxis = axis,
            Trace::Heatmap(t) => t.xaxis = axis,
        }
    }

    pub fn set_yaxis(&mut self, axis: YAxis) {
        match self {
            Trace::Scatter(t) => t.yaxis = axis,
            Trace::Heatmap(t) => t.yaxis = axis,
        }
    }

    pub fn xs(&self) -> &[f64] {
        match self {
            Trace::Scatter(t) => &t.x,
            Trace::Heatmap(t) => &t.x,
        }
    }

    pub fn ys(&self) -> &[f64] {
        match self {
            Trace::Scatter(t) => &t.y,
            Trace::Heatmap(t) => &t.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLayout {
    pub domain: [f64; 2],
    pub mirror: bool,
    pub showgrid: bool,
    pub showline: bool,
    pub zeroline: bool,
    pub showticklabels: bool,
    pub ticks: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tickvals: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ticktext: Vec<String>,
}

impl AxisLayout {
    /// Bare axis over `domain`: no grid, line, zero line or tick marks.
    pub fn bare(domain: [f64; 2]) -> Self {
        AxisLayout {
            domain,
            mirror: false,
            showgrid: false,
            showline: false,
            zeroline: false,
            showticklabels: false,
            ticks: "",
            tickvals: Vec::new(),
            ticktext: Vec::new(),
        }
    }
}

impl Default for AxisLayout {
    fn default() -> Self {
        AxisLayout::bare([0.0, 1.0])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub width: u32,
    pub height: u32,
    pub showlegend: bool,
    pub hovermode: &'static str,
    pub plot_bgcolor: &'static str,
    pub xaxis: AxisLayout,
    pub xaxis2: AxisLayout,
    pub yaxis: AxisLayout,
    pub yaxis2: AxisLayout,
}

impl Layout {
    pub fn x(&self, axis: XAxis) -> &AxisLayout {
        match axis {
            XAxis::X => &self.xaxis,
            XAxis::X2 => &self.xaxis2,
        }
    }

    pub fn y(&self, axis: YAxis) -> &AxisLayout {
        match axis {
            YAxis::Y => &self.yaxis,
            YAxis::Y2 => &self.yaxis2,
        }
    }
}

/// Dendrograms and heatmap composed into one coordinate frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedFigure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl AlignedFigure {
    pub fn heatmap(&self) -> Option<&HeatmapTrace> {
        self.data.iter().find_map(|t| match t {
            Trace::Heatmap(h) => Some(h),
            Trace::Scatter(_) => None,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
