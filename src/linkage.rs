use kodama::Step;
use log::debug;
use rayon::prelude::*;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Cluster-to-cluster distance update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    Single,
    #[default]
    Complete,
    Average,
}

impl Method {
    fn kodama(self) -> kodama::Method {
        match self {
            Method::Single => kodama::Method::Single,
            Method::Complete => kodama::Method::Complete,
            Method::Average => kodama::Method::Average,
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "single" => Ok(Method::Single),
            "complete" => Ok(Method::Complete),
            "average" => Ok(Method::Average),
            other => Err(format!(
                "unknown linkage '{}' (expected single, complete or average)",
                other
            )),
        }
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Upper triangle of the pairwise distance matrix, row by row
/// (`(0,1), (0,2), .., (1,2), ..`).
fn condensed_distances(observations: &[Vec<f64>]) -> Vec<f64> {
    let n = observations.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            ((i + 1)..n).map(move |j| euclidean(&observations[i], &observations[j]))
        })
        .collect()
}

/// Hierarchical clustering of `observations` under Euclidean distance.
///
/// Returns `n - 1` steps in merge order. Cluster ids below `n` are leaves;
/// the cluster created by step `k` has id `n + k`, and `cluster1` is always
/// the smaller of the two ids.
pub fn linkage(observations: &[Vec<f64>], method: Method) -> Result<Vec<Step<f64>>> {
    let n = observations.len();
    if n < 2 {
        return Err(Error::ClusteringFailure(format!(
            "at least 2 observations are required, got {}",
            n
        )));
    }
    let dim = observations[0].len();
    if observations.iter().any(|o| o.len() != dim) {
        return Err(Error::ClusteringFailure(
            "observations have differing lengths".to_string(),
        ));
    }
    if observations.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::ClusteringFailure(
            "observations contain non-finite values".to_string(),
        ));
    }

    debug!("Computing {} pairwise distances", n * (n - 1) / 2);
    let mut condensed = condensed_distances(observations);
    let dendrogram = kodama::linkage(&mut condensed, n, method.kodama());

    let steps: Vec<Step<f64>> = dendrogram
        .steps()
        .iter()
        .map(|s| Step {
            cluster1: s.cluster1.min(s.cluster2),
            cluster2: s.cluster1.max(s.cluster2),
            dissimilarity: s.dissimilarity,
            size: s.size,
        })
        .collect();

    if let Some(root) = steps.last() {
        debug!(
            "Linkage ({:?}): {} steps, root joins {} leaves at {:.4}",
            method,
            steps.len(),
            root.size,
            root.dissimilarity
        );
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(xs: &[f64]) -> Vec<Vec<f64>> {
        xs.iter().map(|&x| vec![x]).collect()
    }

    #[test]
    fn condensed_order_is_row_major_upper_triangle() {
        let d = condensed_distances(&points(&[0.0, 1.0, 3.0, 6.0]));
        assert_eq!(d, vec![1.0, 3.0, 6.0, 2.0, 5.0, 3.0]);
    }

    #[test]
    fn closest_pair_merges_first() {
        let steps = linkage(&points(&[0.0, 10.0, 1.0, 11.5]), Method::Complete).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!((steps[0].cluster1, steps[0].cluster2), (0, 2));
        assert_eq!(steps[0].dissimilarity, 1.0);
        assert_eq!((steps[1].cluster1, steps[1].cluster2), (1, 3));
        assert_eq!(steps[1].dissimilarity, 1.5);
        assert_eq!((steps[2].cluster1, steps[2].cluster2), (4, 5));
        assert_eq!(steps[2].size, 4);
    }

    #[test]
    fn methods_differ_on_final_height() {
        let obs = points(&[0.0, 1.0, 5.0]);
        let single = linkage(&obs, Method::Single).unwrap();
        let complete = linkage(&obs, Method::Complete).unwrap();
        let average = linkage(&obs, Method::Average).unwrap();
        assert_eq!(single[1].dissimilarity, 4.0);
        assert_eq!(complete[1].dissimilarity, 5.0);
        assert_eq!(average[1].dissimilarity, 4.5);
    }

    #[test]
    fn merge_heights_are_monotonic_for_complete() {
        let obs = points(&[3.0, 0.2, 9.0, 4.1, 7.7, 0.0]);
        let steps = linkage(&obs, Method::Complete).unwrap();
        assert!(steps.windows(2).all(|w| w[0].dissimilarity <= w[1].dissimilarity));
    }

    #[test]
    fn too_few_or_invalid_observations_fail() {
        assert!(matches!(
            linkage(&points(&[1.0]), Method::Complete),
            Err(Error::ClusteringFailure(_))
        ));
        assert!(matches!(
            linkage(&points(&[1.0, f64::NAN]), Method::Complete),
            Err(Error::ClusteringFailure(_))
        ));
    }

    #[test]
    fn parses_method_names() {
        assert_eq!("average".parse::<Method>(), Ok(Method::Average));
        assert!("ward".parse::<Method>().is_err());
    }
}
