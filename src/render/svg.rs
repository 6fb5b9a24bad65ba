use super::{cell_edges, format_value, normalise, Frame, COLORBAR_WIDTH, MARGIN_RIGHT, MARGIN_TOP};
use crate::figure::{AlignedFigure, Trace, XAxis, YAxis};

const FONT_SIZE: f64 = 12.0;
const TITLE_FONT_SIZE: f64 = 17.0;
const COLORBAR_STEPS: usize = 32;

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Render the figure as a standalone SVG document.
pub fn render_svg(fig: &AlignedFigure) -> String {
    let frame = Frame::new(fig);
    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
<style>
  text {{ font-family: 'Open Sans', 'DejaVu Sans', Arial, sans-serif; fill: #444; }}
</style>
<rect width="100%" height="100%" fill="white"/>
"#,
        w = frame.width,
        h = frame.height
    ));

    // Heatmap first so dendrogram lines in overlapping bands stay visible.
    if let Some(heat) = fig.heatmap() {
        let xmap = frame.x(heat.xaxis);
        let ymap = frame.y(heat.yaxis);
        let xe = cell_edges(&heat.x);
        let ye = cell_edges(&heat.y);
        let (lo, hi) = heat.z_range().unwrap_or((0.0, 0.0));

        svg.push_str("<g class=\"heatmap\" shape-rendering=\"crispEdges\">\n");
        for (i, row) in heat.z.iter().enumerate().take(ye.len().saturating_sub(1)) {
            let (y0, y1) = (ymap.map(ye[i]), ymap.map(ye[i + 1]));
            for (j, &v) in row.iter().enumerate().take(xe.len().saturating_sub(1)) {
                if !v.is_finite() {
                    continue;
                }
                let (x0, x1) = (xmap.map(xe[j]), xmap.map(xe[j + 1]));
                let color = heat.colorscale.color_at(normalise(v, lo, hi));
                svg.push_str(&format!(
                    r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
                    x0.min(x1),
                    y0.min(y1),
                    (x1 - x0).abs(),
                    (y1 - y0).abs(),
                    color
                ));
                svg.push('\n');
            }
        }
        svg.push_str("</g>\n");

        // Colour bar alongside the heatmap's vertical band.
        let (top, bottom) = ymap.span();
        let bar_x = frame.width - MARGIN_RIGHT + 10.0;
        let step_h = (bottom - top) / COLORBAR_STEPS as f64;
        for s in 0..COLORBAR_STEPS {
            let t = (s as f64 + 0.5) / COLORBAR_STEPS as f64;
            svg.push_str(&format!(
                r#"<rect x="{:.2}" y="{:.2}" width="{}" height="{:.2}" fill="{}"/>"#,
                bar_x,
                bottom - (s + 1) as f64 * step_h,
                COLORBAR_WIDTH,
                step_h + 0.5,
                heat.colorscale.color_at(t)
            ));
            svg.push('\n');
        }
        for (label, y) in [(format_value(hi), top + FONT_SIZE), (format_value(lo), bottom)] {
            svg.push_str(&format!(
                r#"<text x="{:.2}" y="{:.2}" font-size="{}">{}</text>"#,
                bar_x + COLORBAR_WIDTH + 4.0,
                y,
                FONT_SIZE,
                escape_xml(&label)
            ));
            svg.push('\n');
        }
    }

    svg.push_str("<g class=\"dendrograms\" fill=\"none\">\n");
    for trace in &fig.data {
        if let Trace::Scatter(line) = trace {
            let xmap = frame.x(line.xaxis);
            let ymap = frame.y(line.yaxis);
            let points: Vec<String> = line
                .x
                .iter()
                .zip(&line.y)
                .map(|(&x, &y)| format!("{:.2},{:.2}", xmap.map(x), ymap.map(y)))
                .collect();
            svg.push_str(&format!(
                r#"<polyline points="{}" stroke="{}" stroke-width="{}"/>"#,
                points.join(" "),
                line.line.color,
                line.line.width
            ));
            svg.push('\n');
        }
    }
    svg.push_str("</g>\n");

    // Tick labels, only for axes that ask for them.
    for axis in [XAxis::X, XAxis::X2] {
        let layout = fig.layout.x(axis);
        if !layout.showticklabels {
            continue;
        }
        let xmap = frame.x(axis);
        let baseline = frame.y(YAxis::Y).span().1 + FONT_SIZE + 4.0;
        for (val, text) in layout.tickvals.iter().zip(&layout.ticktext) {
            svg.push_str(&format!(
                r#"<text x="{:.2}" y="{:.2}" font-size="{}" text-anchor="middle">{}</text>"#,
                xmap.map(*val),
                baseline,
                FONT_SIZE,
                escape_xml(text)
            ));
            svg.push('\n');
        }
    }
    for axis in [YAxis::Y, YAxis::Y2] {
        let layout = fig.layout.y(axis);
        if !layout.showticklabels {
            continue;
        }
        let ymap = frame.y(axis);
        let right = frame.x(XAxis::X).span().0 - 4.0;
        for (val, text) in layout.tickvals.iter().zip(&layout.ticktext) {
            svg.push_str(&format!(
                r#"<text x="{:.2}" y="{:.2}" font-size="{}" text-anchor="end" dominant-baseline="middle">{}</text>"#,
                right,
                ymap.map(*val),
                FONT_SIZE,
                escape_xml(text)
            ));
            svg.push('\n');
        }
    }

    if !fig.layout.title.text.is_empty() {
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-size="{}" text-anchor="middle">{}</text>"#,
            frame.width / 2.0,
            MARGIN_TOP / 2.0,
            TITLE_FONT_SIZE,
            escape_xml(&fig.layout.title.text)
        ));
        svg.push('\n');
    }

    svg.push_str("</svg>\n");
    svg
}
