//! Output backends for [`AlignedFigure`].
//!
//! Vector and raster output share one pixel geometry ([`Frame`]): each axis
//! is auto-ranged over the traces drawn against it and mapped onto its
//! domain band inside the plot area.

mod html;
mod raster;
mod svg;

use image::ImageFormat;
use log::info;
use std::io::Cursor;
use std::path::Path;

use crate::error::{Error, Result};
use crate::figure::{AlignedFigure, Trace, XAxis, YAxis};

pub use html::render_html;
pub use raster::render_rgb;
pub use svg::render_svg;

pub(crate) const MARGIN_LEFT: f64 = 80.0;
pub(crate) const MARGIN_RIGHT: f64 = 80.0;
pub(crate) const MARGIN_TOP: f64 = 100.0;
pub(crate) const MARGIN_BOTTOM: f64 = 80.0;

/// Width in pixels of the heatmap colour bar.
pub(crate) const COLORBAR_WIDTH: f64 = 20.0;

/// Output backend picked from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Svg,
    Png,
    Html,
    Json,
}

impl OutputKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "svg" => Ok(OutputKind::Svg),
            "png" => Ok(OutputKind::Png),
            "html" | "htm" => Ok(OutputKind::Html),
            "json" => Ok(OutputKind::Json),
            _ => Err(Error::UnsupportedOutput(path.to_path_buf())),
        }
    }
}

/// Write `fig` to `path` in the format named by its extension.
pub fn show(fig: &AlignedFigure, path: &Path) -> Result<()> {
    let kind = OutputKind::from_path(path)?;
    info!("Saving {:?} figure to {:?}...", kind, path);

    match kind {
        OutputKind::Svg => {
            std::fs::write(path, render_svg(fig)).map_err(|e| Error::io(path, e))?;
        }
        OutputKind::Png => {
            let mut png = Vec::new();
            render_rgb(fig).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            std::fs::write(path, png).map_err(|e| Error::io(path, e))?;
        }
        OutputKind::Html => {
            std::fs::write(path, render_html(fig)?).map_err(|e| Error::io(path, e))?;
        }
        OutputKind::Json => {
            std::fs::write(path, fig.to_json()?).map_err(|e| Error::io(path, e))?;
        }
    }
    Ok(())
}

/// Edges of cells centred on `centers`: midpoints between neighbours, with
/// the outer cells mirrored to the same width as their neighbour.
pub(crate) fn cell_edges(centers: &[f64]) -> Vec<f64> {
    match centers.len() {
        0 => Vec::new(),
        1 => vec![centers[0] - 0.5, centers[0] + 0.5],
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - (centers[1] - centers[0]) / 2.0);
            for w in centers.windows(2) {
                edges.push((w[0] + w[1]) / 2.0);
            }
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            edges
        }
    }
}

fn extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn union(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some((a0, a1)), Some((b0, b1))) => Some((a0.min(b0), a1.max(b1))),
        (x, None) | (None, x) => x,
    }
}

/// Linear map from an axis' data range onto its pixel span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AxisMap {
    data: (f64, f64),
    pixels: (f64, f64),
}

impl AxisMap {
    fn new(range: Option<(f64, f64)>, pixels: (f64, f64)) -> Self {
        let data = match range {
            None => (0.0, 1.0),
            Some((lo, hi)) if lo == hi => (lo - 1.0, hi + 1.0),
            Some(r) => r,
        };
        AxisMap { data, pixels }
    }

    pub(crate) fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.data;
        let (p0, p1) = self.pixels;
        p0 + (v - d0) / (d1 - d0) * (p1 - p0)
    }

    /// Pixel span, low end first.
    pub(crate) fn span(&self) -> (f64, f64) {
        let (p0, p1) = self.pixels;
        (p0.min(p1), p0.max(p1))
    }
}

/// Pixel geometry of a figure.
pub(crate) struct Frame {
    pub width: f64,
    pub height: f64,
    x: [AxisMap; 2],
    y: [AxisMap; 2],
}

impl Frame {
    pub(crate) fn new(fig: &AlignedFigure) -> Self {
        let width = fig.layout.width as f64;
        let height = fig.layout.height as f64;
        let plot_w = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
        let plot_h = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);

        let x = [XAxis::X, XAxis::X2].map(|axis| {
            let range = fig
                .data
                .iter()
                .filter(|t| t.axes().0 == axis)
                .fold(None, |acc, t| union(acc, trace_extent(t, t.xs())));
            let [d0, d1] = fig.layout.x(axis).domain;
            AxisMap::new(range, (MARGIN_LEFT + d0 * plot_w, MARGIN_LEFT + d1 * plot_w))
        });
        // Vertical domains are measured from the bottom of the plot area.
        let y = [YAxis::Y, YAxis::Y2].map(|axis| {
            let range = fig
                .data
                .iter()
                .filter(|t| t.axes().1 == axis)
                .fold(None, |acc, t| union(acc, trace_extent(t, t.ys())));
            let [d0, d1] = fig.layout.y(axis).domain;
            let bottom = height - MARGIN_BOTTOM;
            AxisMap::new(range, (bottom - d0 * plot_h, bottom - d1 * plot_h))
        });

        Frame { width, height, x, y }
    }

    pub(crate) fn x(&self, axis: XAxis) -> &AxisMap {
        match axis {
            XAxis::X => &self.x[0],
            XAxis::X2 => &self.x[1],
        }
    }

    pub(crate) fn y(&self, axis: YAxis) -> &AxisMap {
        match axis {
            YAxis::Y => &self.y[0],
            YAxis::Y2 => &self.y[1],
        }
    }
}

fn trace_extent(trace: &Trace, values: &[f64]) -> Option<(f64, f64)> {
    match trace {
        Trace::Heatmap(_) => extent(&cell_edges(values)),
        Trace::Scatter(_) => extent(values),
    }
}

/// Normalised position of `v` between `lo` and `hi` for colour lookup.
pub(crate) fn normalise(v: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        (v - lo) / (hi - lo)
    } else {
        0.0
    }
}

/// Short numeric label for tick and colour-bar text.
pub(crate) fn format_value(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e4 || v.abs() < 1e-2) {
        format!("{:.2e}", v)
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ClusteredHeatmapComposer;
    use crate::dendrogram::LinkageDendrogram;
    use crate::matrix::DataMatrix;

    pub(crate) fn sample_figure() -> AlignedFigure {
        let m = DataMatrix::from_rows(vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 0.0, 4.0, 5.0],
            vec![2.0, 4.0, 0.0, 6.0],
            vec![3.0, 5.0, 6.0, 0.0],
        ])
        .unwrap();
        ClusteredHeatmapComposer::new(LinkageDendrogram::default())
            .compose(&m, "Sample <distances>")
            .unwrap()
    }

    #[test]
    fn cell_edges_surround_centres() {
        assert_eq!(cell_edges(&[5.0, 15.0, 25.0]), vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(cell_edges(&[3.0]), vec![2.5, 3.5]);
        assert!(cell_edges(&[]).is_empty());
    }

    #[test]
    fn heatmap_and_top_dendrogram_share_horizontal_pixels() {
        let fig = sample_figure();
        let frame = Frame::new(&fig);
        let heat = fig.heatmap().unwrap();
        let plot_w = 800.0 - MARGIN_LEFT - MARGIN_RIGHT;

        // Heatmap edges span the whole primary x domain.
        let edges = cell_edges(&heat.x);
        let left = frame.x(XAxis::X).map(edges[0]);
        let right = frame.x(XAxis::X).map(*edges.last().unwrap());
        assert!((left - (MARGIN_LEFT + 0.15 * plot_w)).abs() < 1e-9);
        assert!((right - (MARGIN_LEFT + plot_w)).abs() < 1e-9);

        // Leaf n of the column dendrogram lands at the centre of column n.
        for &tick in &fig.layout.xaxis.tickvals {
            let px = frame.x(XAxis::X).map(tick);
            assert!(px > left && px < right);
        }
    }

    #[test]
    fn side_dendrogram_ends_where_heatmap_starts() {
        let fig = sample_figure();
        let frame = Frame::new(&fig);
        let (lo, hi) = frame.x(XAxis::X2).span();
        assert!((lo - MARGIN_LEFT).abs() < 1e-9);
        // Leaves sit at height zero, the right edge of the side band.
        assert!((frame.x(XAxis::X2).map(0.0) - hi).abs() < 1e-9);
        assert!((hi - frame.x(XAxis::X).span().0).abs() < 1e-9);
    }

    #[test]
    fn output_kind_from_extension() {
        assert_eq!(OutputKind::from_path(Path::new("a.SVG")).unwrap(), OutputKind::Svg);
        assert_eq!(OutputKind::from_path(Path::new("a.png")).unwrap(), OutputKind::Png);
        assert_eq!(OutputKind::from_path(Path::new("a.html")).unwrap(), OutputKind::Html);
        assert_eq!(OutputKind::from_path(Path::new("a.json")).unwrap(), OutputKind::Json);
        assert!(matches!(
            OutputKind::from_path(Path::new("a.pdf")),
            Err(Error::UnsupportedOutput(_))
        ));
    }

    #[test]
    fn show_writes_each_format() {
        let fig = sample_figure();
        let dir = tempfile::tempdir().unwrap();
        for name in ["f.svg", "f.png", "f.html", "f.json"] {
            let out = dir.path().join(name);
            show(&fig, &out).unwrap();
            assert!(std::fs::metadata(&out).unwrap().len() > 0, "{} is empty", name);
        }
        let png = std::fs::read(dir.path().join("f.png")).unwrap();
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn unwritable_output_is_io_error_for_every_format() {
        let fig = sample_figure();
        let dir = tempfile::tempdir().unwrap();
        for name in ["f.svg", "f.png", "f.html", "f.json"] {
            let out = dir.path().join("missing").join(name);
            match show(&fig, &out) {
                Err(Error::Io { path, .. }) => assert_eq!(path, out),
                other => panic!("{}: expected Io error, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn formats_values_compactly() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(6.0), "6");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(-0.126), "-0.13");
        assert_eq!(format_value(123456.0), "1.23e5");
    }
}
