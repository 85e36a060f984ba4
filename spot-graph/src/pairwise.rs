use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;

/// Distance metrics understood by the pairwise primitive.
///
/// Numeric ids follow the upstream convention where 0 denotes
/// Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Euclidean,
}

impl DistanceMetric {
    pub fn from_id(id: usize) -> anyhow::Result<Self> {
        match id {
            0 => Ok(DistanceMetric::Euclidean),
            _ => anyhow::bail!("unknown distance metric id {}", id),
        }
    }
}

fn euclidean(aa: ArrayView1<f32>, bb: ArrayView1<f32>) -> f32 {
    aa.iter()
        .zip(bb.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// All-pairs distance matrix over the rows of `xx`
///
/// * `xx` - data matrix (n x d), one point per row
/// * `metric` - distance metric applied to each pair of rows
///
/// Returns an `n x n` matrix, symmetric with a zero diagonal. Rows of
/// the output are filled in parallel.
pub fn pairwise_distance(xx: &Array2<f32>, metric: DistanceMetric) -> Array2<f32> {
    let nn = xx.nrows();
    let mut dd = Array2::<f32>::zeros((nn, nn));
    let xv = xx.view();

    dd.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut d_i)| {
            let x_i = xv.row(i);
            for (j, d_ij) in d_i.iter_mut().enumerate() {
                *d_ij = match metric {
                    DistanceMetric::Euclidean => euclidean(x_i, xv.row(j)),
                };
            }
        });

    dd
}

/// Same as [`pairwise_distance`] with the metric given by numeric id.
pub fn pairwise_distance_by_id(xx: &Array2<f32>, metric_id: usize) -> anyhow::Result<Array2<f32>> {
    Ok(pairwise_distance(xx, DistanceMetric::from_id(metric_id)?))
}
