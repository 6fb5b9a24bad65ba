use crate::error::Result;
use crate::figure::AlignedFigure;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Standalone page that draws the figure with plotly.js.
pub fn render_html(fig: &AlignedFigure) -> Result<String> {
    // `</` inside an inline script would end it early.
    let json = fig.to_json()?.replace("</", "<\\/");
    let title = fig
        .layout
        .title
        .text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="figure" style="width:{w}px;height:{h}px;"></div>
<script>
const figure = {json};
Plotly.newPlot("figure", figure.data, figure.layout);
</script>
</body>
</html>
"#,
        title = title,
        cdn = PLOTLY_CDN,
        w = fig.layout.width,
        h = fig.layout.height,
        json = json
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::sample_figure;

    #[test]
    fn embeds_figure_json() {
        let fig = sample_figure();
        let html = render_html(&fig).unwrap();
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains(r#""type":"heatmap""#));
        assert!(html.contains(r#""colorscale":"Blues""#));
        assert!(html.contains("<title>Sample &lt;distances&gt;</title>"));
    }

    #[test]
    fn escapes_script_terminators() {
        let mut fig = sample_figure();
        fig.layout.title.text = "</script><b>".to_string();
        let html = render_html(&fig).unwrap();
        assert_eq!(html.matches("</script>").count(), 2);
    }
}
