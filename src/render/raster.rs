use image::RgbImage;
use log::debug;

use super::{cell_edges, format_value, normalise, Frame, COLORBAR_WIDTH, MARGIN_RIGHT};
use crate::figure::{AlignedFigure, Rgb, Trace, XAxis, YAxis};

/// 5x8 bitmap glyphs for numeric labels. Other characters are skipped.
fn glyph(c: char) -> Option<[u8; 8]> {
    Some(match c {
        '0' => [0x70, 0x88, 0x98, 0xA8, 0xC8, 0x88, 0x70, 0x00],
        '1' => [0x20, 0x60, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00],
        '2' => [0x70, 0x88, 0x08, 0x30, 0x40, 0x80, 0xF8, 0x00],
        '3' => [0xF8, 0x10, 0x20, 0x10, 0x08, 0x88, 0x70, 0x00],
        '4' => [0x10, 0x30, 0x50, 0x90, 0xF8, 0x10, 0x10, 0x00],
        '5' => [0xF8, 0x80, 0xF0, 0x08, 0x08, 0x88, 0x70, 0x00],
        '6' => [0x30, 0x40, 0x80, 0xF0, 0x88, 0x88, 0x70, 0x00],
        '7' => [0xF8, 0x08, 0x10, 0x20, 0x40, 0x40, 0x40, 0x00],
        '8' => [0x70, 0x88, 0x88, 0x70, 0x88, 0x88, 0x70, 0x00],
        '9' => [0x70, 0x88, 0x88, 0x78, 0x08, 0x10, 0x60, 0x00],
        '-' => [0x00, 0x00, 0x00, 0xF8, 0x00, 0x00, 0x00, 0x00],
        '+' => [0x00, 0x20, 0x20, 0xF8, 0x20, 0x20, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x20, 0x00],
        'e' => [0x00, 0x00, 0x70, 0x88, 0xF8, 0x80, 0x70, 0x00],
        _ => return None,
    })
}

const GLYPH_SCALE: u32 = 2;
const GLYPH_ADVANCE: u32 = 6 * GLYPH_SCALE;
const LABEL_COLOR: Rgb = Rgb(68, 68, 68);

/// RGB pixel buffer with clipped drawing primitives.
struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Canvas {
            width,
            height,
            pixels: vec![255; (width as usize) * (height as usize) * 3],
        }
    }

    fn set(&mut self, x: i64, y: i64, c: Rgb) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 3;
        self.pixels[idx] = c.0;
        self.pixels[idx + 1] = c.1;
        self.pixels[idx + 2] = c.2;
    }

    fn get(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 3;
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]]
    }

    /// Fill the pixels whose centres fall inside [x0, x1) x [y0, y1).
    fn fill_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, c: Rgb) {
        let (xa, xb) = (x0.min(x1).round() as i64, x0.max(x1).round() as i64);
        let (ya, yb) = (y0.min(y1).round() as i64, y0.max(y1).round() as i64);
        for y in ya..yb {
            for x in xa..xb {
                self.set(x, y, c);
            }
        }
    }

    fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, c: Rgb) {
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as i64;
        for s in 0..=steps {
            let t = s as f64 / steps as f64;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            self.set(x.round() as i64, y.round() as i64, c);
        }
    }

    fn write_char(&mut self, base_x: i64, base_y: i64, rows: &[u8; 8], c: Rgb) {
        let ratio = GLYPH_SCALE as i64;
        for (j, &row) in rows.iter().enumerate() {
            for z in (0..8i32).rev() {
                if (row >> z) & 1 == 1 {
                    let x = base_x + (7 - z as i64) * ratio;
                    let y = base_y + j as i64 * ratio;
                    for rx in 0..ratio {
                        for ry in 0..ratio {
                            self.set(x + rx, y + ry, c);
                        }
                    }
                }
            }
        }
    }

    /// Draw `text` centred horizontally on `cx` with its top at `top`.
    fn write_text_centered(&mut self, cx: f64, top: f64, text: &str, c: Rgb) {
        let width = text.chars().count() as f64 * GLYPH_ADVANCE as f64;
        self.write_text(cx - width / 2.0, top, text, c);
    }

    fn write_text(&mut self, left: f64, top: f64, text: &str, c: Rgb) {
        let mut x = left.round() as i64;
        let y = top.round() as i64;
        for ch in text.chars() {
            if let Some(rows) = glyph(ch) {
                self.write_char(x, y, &rows, c);
            }
            x += GLYPH_ADVANCE as i64;
        }
    }
}

/// Rasterise the figure. Only numeric text (tick and colour-bar labels) is
/// drawn; the title is left to the vector backends.
pub fn render_rgb(fig: &AlignedFigure) -> RgbImage {
    let frame = Frame::new(fig);
    let (width, height) = (fig.layout.width.max(1), fig.layout.height.max(1));
    let mut canvas = Canvas::new(width, height);

    let mut cells = 0usize;
    if let Some(heat) = fig.heatmap() {
        let xmap = frame.x(heat.xaxis);
        let ymap = frame.y(heat.yaxis);
        let xe = cell_edges(&heat.x);
        let ye = cell_edges(&heat.y);
        let (lo, hi) = heat.z_range().unwrap_or((0.0, 0.0));

        for (i, row) in heat.z.iter().enumerate().take(ye.len().saturating_sub(1)) {
            for (j, &v) in row.iter().enumerate().take(xe.len().saturating_sub(1)) {
                if !v.is_finite() {
                    continue;
                }
                let color = heat.colorscale.color_at(normalise(v, lo, hi));
                canvas.fill_rect(
                    xmap.map(xe[j]),
                    ymap.map(ye[i]),
                    xmap.map(xe[j + 1]),
                    ymap.map(ye[i + 1]),
                    color,
                );
                cells += 1;
            }
        }

        let (top, bottom) = ymap.span();
        let bar_x = frame.width - MARGIN_RIGHT + 10.0;
        let span = (bottom - top).max(1.0);
        for py in top.round() as i64..bottom.round() as i64 {
            let t = (bottom - py as f64) / span;
            let c = heat.colorscale.color_at(t);
            canvas.line(bar_x, py as f64, bar_x + COLORBAR_WIDTH - 1.0, py as f64, c);
        }
        let label_x = bar_x + COLORBAR_WIDTH + 4.0;
        canvas.write_text(label_x, top, &format_value(hi), LABEL_COLOR);
        canvas.write_text(label_x, bottom - 8.0 * GLYPH_SCALE as f64, &format_value(lo), LABEL_COLOR);
    }

    let mut segments = 0usize;
    for trace in &fig.data {
        if let Trace::Scatter(line) = trace {
            let xmap = frame.x(line.xaxis);
            let ymap = frame.y(line.yaxis);
            let pts: Vec<(f64, f64)> = line
                .x
                .iter()
                .zip(&line.y)
                .map(|(&x, &y)| (xmap.map(x), ymap.map(y)))
                .collect();
            for w in pts.windows(2) {
                canvas.line(w[0].0, w[0].1, w[1].0, w[1].1, line.line.color);
                segments += 1;
            }
        }
    }

    for axis in [XAxis::X, XAxis::X2] {
        let layout = fig.layout.x(axis);
        if !layout.showticklabels {
            continue;
        }
        let top = frame.y(YAxis::Y).span().1 + 4.0;
        for (val, text) in layout.tickvals.iter().zip(&layout.ticktext) {
            canvas.write_text_centered(frame.x(axis).map(*val), top, text, LABEL_COLOR);
        }
    }
    for axis in [YAxis::Y, YAxis::Y2] {
        let layout = fig.layout.y(axis);
        if !layout.showticklabels {
            continue;
        }
        let right = frame.x(XAxis::X).span().0 - 4.0;
        for (val, text) in layout.tickvals.iter().zip(&layout.ticktext) {
            let w = text.chars().count() as f64 * GLYPH_ADVANCE as f64;
            let cy = frame.y(axis).map(*val) - 4.0 * GLYPH_SCALE as f64;
            canvas.write_text(right - w, cy, text, LABEL_COLOR);
        }
    }

    debug!("Rasterised {} cells and {} line segments", cells, segments);

    RgbImage::from_fn(width, height, |x, y| image::Rgb(canvas.get(x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::sample_figure;

    #[test]
    fn image_has_figure_size() {
        let img = render_rgb(&sample_figure());
        assert_eq!(img.dimensions(), (800, 800));
    }

    #[test]
    fn heatmap_corners_take_extreme_colours() {
        let fig = sample_figure();
        let img = render_rgb(&fig);
        let frame = Frame::new(&fig);
        let heat = fig.heatmap().unwrap();
        let (lo, hi) = heat.z_range().unwrap();

        // Centre of cell (0, 0).
        let px = frame.x(XAxis::X).map(heat.x[0]).round() as u32;
        let py = frame.y(YAxis::Y).map(heat.y[0]).round() as u32;
        let expected = heat.colorscale.color_at(normalise(heat.z[0][0], lo, hi));
        assert_eq!(img.get_pixel(px, py).0, [expected.0, expected.1, expected.2]);
    }

    #[test]
    fn margins_stay_white() {
        let img = render_rgb(&sample_figure());
        assert_eq!(img.get_pixel(2, 2).0, [255, 255, 255]);
    }

    #[test]
    fn only_numeric_glyphs_exist() {
        assert!(glyph('7').is_some());
        assert!(glyph('e').is_some());
        assert!(glyph('A').is_none());
    }
}
