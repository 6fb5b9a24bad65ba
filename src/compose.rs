use log::{debug, info};

use crate::dendrogram::{DendrogramGenerator, Orientation};
use crate::error::{Error, Result};
use crate::figure::{
    AlignedFigure, AxisLayout, ColorScale, HeatmapTrace, Layout, Title, Trace, XAxis, YAxis,
};
use crate::matrix::DataMatrix;

pub const DEFAULT_SIZE: u32 = 800;

// Axis domains as fractions of the figure extent.
const HEATMAP_X_DOMAIN: [f64; 2] = [0.15, 1.0];
const SIDE_DENDRO_X_DOMAIN: [f64; 2] = [0.0, 0.15];
const HEATMAP_Y_DOMAIN: [f64; 2] = [0.0, 0.85];
const TOP_DENDRO_Y_DOMAIN: [f64; 2] = [0.825, 0.975];

/// Matrix axis to order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

impl Axis {
    fn orientation(self) -> Orientation {
        match self {
            Axis::Columns => Orientation::Bottom,
            Axis::Rows => Orientation::Right,
        }
    }
}

/// Leaf order of one matrix axis and the dendrogram that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisOrdering {
    /// Matrix indices in leaf order.
    pub order: Vec<usize>,
    pub tick_text: Vec<String>,
    /// Leaf positions; the heatmap uses these as its coordinates.
    pub tick_vals: Vec<f64>,
    pub traces: Vec<Trace>,
}

/// Cluster `matrix` along `axis` and turn the dendrogram's leaf labels
/// back into matrix indices.
pub fn derive_order<G>(generator: &G, matrix: &DataMatrix, axis: Axis) -> Result<AxisOrdering>
where
    G: DendrogramGenerator + ?Sized,
{
    let (observations, labels) = match axis {
        Axis::Rows => (matrix.row_vectors(), matrix.row_labels()),
        Axis::Columns => (matrix.col_vectors(), matrix.col_labels()),
    };
    let n = observations.len();
    let dendro = generator.generate(&observations, labels, axis.orientation())?;

    if dendro.tick_text.len() != n || dendro.tick_vals.len() != n {
        return Err(Error::ClusteringFailure(format!(
            "{:?} dendrogram has {} leaf labels and {} leaf positions for {} items",
            axis,
            dendro.tick_text.len(),
            dendro.tick_vals.len(),
            n
        )));
    }

    let mut seen = vec![false; n];
    let mut order = Vec::with_capacity(n);
    for text in &dendro.tick_text {
        let idx: usize = text.trim().parse().map_err(|_| {
            Error::ClusteringFailure(format!("leaf label '{}' is not a matrix index", text))
        })?;
        if idx >= n || seen[idx] {
            return Err(Error::ClusteringFailure(format!(
                "leaf label '{}' is out of range or repeated for {} items",
                text, n
            )));
        }
        seen[idx] = true;
        order.push(idx);
    }

    debug!("{:?} leaf order: {:?}", axis, order);

    Ok(AxisOrdering {
        order,
        tick_text: dendro.tick_text,
        tick_vals: dendro.tick_vals,
        traces: dendro.traces,
    })
}

/// Builds the clustered heatmap figure: a column dendrogram on top, a row
/// dendrogram on the left and the reordered matrix beneath/beside them.
///
/// Rows and columns are clustered independently, so their leaf orders can
/// differ even for a symmetric matrix.
pub struct ClusteredHeatmapComposer<G> {
    generator: G,
    width: u32,
    height: u32,
}

impl<G: DendrogramGenerator> ClusteredHeatmapComposer<G> {
    pub fn new(generator: G) -> Self {
        ClusteredHeatmapComposer {
            generator,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn compose(&self, matrix: &DataMatrix, title: &str) -> Result<AlignedFigure> {
        info!(
            "Composing clustered heatmap for {}x{} matrix",
            matrix.rows(),
            matrix.cols()
        );
        matrix.require_index_space()?;

        let columns = derive_order(&self.generator, matrix, Axis::Columns)?;
        let rows = derive_order(&self.generator, matrix, Axis::Rows)?;

        let permuted = matrix.permute(&rows.order, &columns.order)?;

        let heatmap = HeatmapTrace {
            x: columns.tick_vals.clone(),
            y: rows.tick_vals.clone(),
            z: permuted.to_nested(),
            colorscale: ColorScale::Blues,
            xaxis: XAxis::X,
            yaxis: YAxis::Y,
        };

        let mut data = Vec::with_capacity(columns.traces.len() + rows.traces.len() + 1);
        data.extend(columns.traces.into_iter().map(|mut t| {
            t.set_xaxis(XAxis::X);
            t.set_yaxis(YAxis::Y2);
            t
        }));
        data.extend(rows.traces.into_iter().map(|mut t| {
            t.set_xaxis(XAxis::X2);
            t.set_yaxis(YAxis::Y);
            t
        }));
        data.push(Trace::Heatmap(heatmap));

        let xaxis = AxisLayout {
            showticklabels: true,
            tickvals: columns.tick_vals,
            ticktext: columns.tick_text,
            ..AxisLayout::bare(HEATMAP_X_DOMAIN)
        };
        let yaxis = AxisLayout {
            tickvals: rows.tick_vals,
            ticktext: rows.tick_text,
            ..AxisLayout::bare(HEATMAP_Y_DOMAIN)
        };

        let layout = Layout {
            title: Title {
                text: title.to_string(),
            },
            width: self.width,
            height: self.height,
            showlegend: false,
            hovermode: "closest",
            plot_bgcolor: "rgba(0,0,0,0)",
            xaxis,
            xaxis2: AxisLayout::bare(SIDE_DENDRO_X_DOMAIN),
            yaxis,
            yaxis2: AxisLayout::bare(TOP_DENDRO_Y_DOMAIN),
        };

        debug!("Figure has {} traces", data.len());

        Ok(AlignedFigure { data, layout })
    }
}
