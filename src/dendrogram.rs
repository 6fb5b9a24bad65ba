use log::debug;

use crate::error::{Error, Result};
use crate::figure::{LineTrace, Rgb, Trace};
use crate::linkage::{linkage, Method};
use kodama::Step;

/// Which figure edge the dendrogram's leaves face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Leaves along the horizontal axis, root above.
    Bottom,
    /// Leaves along the vertical axis, root to the left.
    Right,
}

/// Drawable dendrogram plus the axis ticks that locate its leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    pub traces: Vec<Trace>,
    /// Leaf labels in leaf order.
    pub tick_text: Vec<String>,
    /// Leaf positions along the leaf axis, parallel to `tick_text`.
    pub tick_vals: Vec<f64>,
}

/// Source of dendrograms for the composer.
pub trait DendrogramGenerator {
    fn generate(
        &self,
        observations: &[Vec<f64>],
        labels: &[String],
        orientation: Orientation,
    ) -> Result<Dendrogram>;
}

/// Spacing between adjacent leaves; the first leaf sits at half a step.
pub const LEAF_STEP: f64 = 10.0;

/// Link colour above the colour threshold.
const ABOVE_THRESHOLD_COLOR: Rgb = Rgb(0, 116, 217);

/// Per-subtree link colours below the threshold, cycled left to right.
const CLUSTER_COLORS: [Rgb; 6] = [
    Rgb(35, 205, 64),
    Rgb(61, 153, 112),
    Rgb(40, 35, 35),
    Rgb(133, 20, 75),
    Rgb(255, 65, 54),
    Rgb(255, 220, 0),
];

/// Dendrograms from `kodama` hierarchical clustering over Euclidean distance.
#[derive(Debug, Clone, Default)]
pub struct LinkageDendrogram {
    pub method: Method,
    /// Merges strictly below this height are coloured per subtree.
    /// Defaults to 70% of the highest merge.
    pub color_threshold: Option<f64>,
}

struct LayoutState<'a> {
    n: usize,
    steps: &'a [Step<f64>],
    threshold: f64,
    next_color: usize,
    leaves: Vec<usize>,
    links: Vec<([f64; 4], [f64; 4], Rgb)>,
}

impl LayoutState<'_> {
    /// Lay out the subtree rooted at `node`; returns its (position, height).
    fn visit(&mut self, node: usize, inherited: Option<Rgb>) -> (f64, f64) {
        if node < self.n {
            let pos = LEAF_STEP / 2.0 + LEAF_STEP * self.leaves.len() as f64;
            self.leaves.push(node);
            return (pos, 0.0);
        }

        let steps = self.steps;
        let step = &steps[node - self.n];
        let h = step.dissimilarity;
        let color = match inherited {
            Some(c) => c,
            None if h < self.threshold => {
                let c = CLUSTER_COLORS[self.next_color % CLUSTER_COLORS.len()];
                self.next_color += 1;
                c
            }
            None => ABOVE_THRESHOLD_COLOR,
        };
        let pass_down = if h < self.threshold {
            Some(color)
        } else {
            None
        };

        let (xl, hl) = self.visit(step.cluster1, pass_down);
        let (xr, hr) = self.visit(step.cluster2, pass_down);
        self.links.push(([xl, xl, xr, xr], [hl, h, h, hr], color));
        ((xl + xr) / 2.0, h)
    }
}

impl DendrogramGenerator for LinkageDendrogram {
    fn generate(
        &self,
        observations: &[Vec<f64>],
        labels: &[String],
        orientation: Orientation,
    ) -> Result<Dendrogram> {
        if labels.len() != observations.len() {
            return Err(Error::ClusteringFailure(format!(
                "{} labels for {} observations",
                labels.len(),
                observations.len()
            )));
        }

        let steps = linkage(observations, self.method)?;
        let n = observations.len();
        let max_height = steps.iter().map(|s| s.dissimilarity).fold(0.0f64, f64::max);
        let threshold = self.color_threshold.unwrap_or(0.7 * max_height);

        let mut state = LayoutState {
            n,
            steps: &steps,
            threshold,
            next_color: 0,
            leaves: Vec::with_capacity(n),
            links: Vec::with_capacity(n - 1),
        };
        let root = n + steps.len() - 1;
        state.visit(root, None);

        debug!(
            "{:?} dendrogram: {} leaves, {} links, colour threshold {:.4}",
            orientation,
            state.leaves.len(),
            state.links.len(),
            threshold
        );

        let traces = state
            .links
            .into_iter()
            .map(|(icoord, dcoord, color)| {
                let (x, y) = match orientation {
                    Orientation::Bottom => (icoord.to_vec(), dcoord.to_vec()),
                    Orientation::Right => (dcoord.iter().map(|d| -d).collect(), icoord.to_vec()),
                };
                Trace::Scatter(LineTrace::new(x, y, color))
            })
            .collect();

        let tick_vals = (0..n)
            .map(|i| LEAF_STEP / 2.0 + LEAF_STEP * i as f64)
            .collect();
        let tick_text = state.leaves.iter().map(|&l| labels[l].clone()).collect();

        Ok(Dendrogram {
            traces,
            tick_text,
            tick_vals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    fn points(xs: &[f64]) -> Vec<Vec<f64>> {
        xs.iter().map(|&x| vec![x]).collect()
    }

    #[test]
    fn leaves_follow_tree_traversal() {
        // {0,2} and {1,3} are the tight pairs.
        let obs = points(&[0.0, 10.0, 1.0, 11.5]);
        let d = LinkageDendrogram::default()
            .generate(&obs, &labels(4), Orientation::Bottom)
            .unwrap();
        assert_eq!(d.tick_text, vec!["0", "2", "1", "3"]);
        assert_eq!(d.tick_vals, vec![5.0, 15.0, 25.0, 35.0]);
        assert_eq!(d.traces.len(), 3);
    }

    #[test]
    fn bottom_links_use_leaf_positions_and_heights() {
        let obs = points(&[0.0, 10.0, 1.0, 11.5]);
        let d = LinkageDendrogram::default()
            .generate(&obs, &labels(4), Orientation::Bottom)
            .unwrap();
        let Trace::Scatter(first) = &d.traces[0] else {
            panic!("expected a line trace");
        };
        assert_eq!(first.x, vec![5.0, 5.0, 15.0, 15.0]);
        assert_eq!(first.y, vec![0.0, 1.0, 1.0, 0.0]);

        let Trace::Scatter(root) = &d.traces[2] else {
            panic!("expected a line trace");
        };
        assert_eq!(root.x, vec![10.0, 10.0, 30.0, 30.0]);
        assert_eq!(root.line.color, ABOVE_THRESHOLD_COLOR);
    }

    #[test]
    fn right_orientation_swaps_and_negates() {
        let obs = points(&[0.0, 10.0, 1.0, 11.5]);
        let d = LinkageDendrogram::default()
            .generate(&obs, &labels(4), Orientation::Right)
            .unwrap();
        let Trace::Scatter(first) = &d.traces[0] else {
            panic!("expected a line trace");
        };
        assert_eq!(first.x, vec![-0.0, -1.0, -1.0, -0.0]);
        assert_eq!(first.y, vec![5.0, 5.0, 15.0, 15.0]);
    }

    #[test]
    fn subtrees_below_threshold_get_distinct_colours() {
        let obs = points(&[0.0, 10.0, 1.0, 11.5]);
        let d = LinkageDendrogram::default()
            .generate(&obs, &labels(4), Orientation::Bottom)
            .unwrap();
        let colors: Vec<Rgb> = d
            .traces
            .iter()
            .map(|t| match t {
                Trace::Scatter(l) => l.line.color,
                Trace::Heatmap(_) => unreachable!(),
            })
            .collect();
        assert_eq!(colors[0], CLUSTER_COLORS[0]);
        assert_eq!(colors[1], CLUSTER_COLORS[1]);
        assert_eq!(colors[2], ABOVE_THRESHOLD_COLOR);
    }

    #[test]
    fn single_observation_fails() {
        let r = LinkageDendrogram::default().generate(&points(&[1.0]), &labels(1), Orientation::Right);
        assert!(matches!(r, Err(Error::ClusteringFailure(_))));
    }
}
