use crate::pairwise::{pairwise_distance, DistanceMetric};
use crate::transform::SpotTransform;

use anyhow::anyhow;
use log::info;
use ndarray::{s, Array1, Array2, Axis, Ix2, Ix3, Zip};
use spot_data::dataset::{FeatureClass, SpotData};

/// A named feature channel and the storage class to fetch it from.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub name: Box<str>,
    pub class: FeatureClass,
}

impl ChannelSpec {
    pub fn new(name: &str, class: FeatureClass) -> Self {
        ChannelSpec {
            name: name.into(),
            class,
        }
    }
}

/// Spot-pair graph over 2D coordinates augmented with a pseudo-depth
/// channel derived from a histology image
///
/// For each spot, the mean color over a clipped neighborhood window of
/// the image is projected onto a variance-weighted grayscale value,
/// standardized across spots, and rescaled to the spread of the spatial
/// coordinates. The resulting `(x, y, z)` coordinates feed an all-pairs
/// Euclidean distance matrix written back into the dataset.
pub struct ImageAugmentedCoordinateGraph {
    /// relative contribution of the pseudo-depth channel
    pub alpha: f64,
    /// neighborhood size; the window half-width is `round(beta / 2)`
    pub beta: f64,
    pub spatial: ChannelSpec,
    pub spatial_pixel: ChannelSpec,
    pub image: ChannelSpec,
    pub out: Box<str>,
}

impl ImageAugmentedCoordinateGraph {
    pub fn new(alpha: f64, beta: f64) -> Self {
        ImageAugmentedCoordinateGraph {
            alpha,
            beta,
            spatial: ChannelSpec::new("spatial", FeatureClass::SpotMatrix),
            spatial_pixel: ChannelSpec::new("spatial_pixel", FeatureClass::SpotMatrix),
            image: ChannelSpec::new("image", FeatureClass::Global),
            out: "augmented_coordinate_graph".into(),
        }
    }
}

impl SpotTransform for ImageAugmentedCoordinateGraph {
    fn apply(&self, data: &mut SpotData) -> anyhow::Result<()> {
        if self.beta < 0.0 {
            anyhow::bail!("beta must be non-negative, got {}", self.beta);
        }

        let nn = data.n_spots();
        if nn == 0 {
            anyhow::bail!("the dataset has no spots");
        }

        let xy = coordinate_matrix(data, &self.spatial)?;
        if xy.ncols() != 2 {
            anyhow::bail!(
                "channel '{}' has {} columns, expected 2 spatial coordinates",
                self.spatial.name,
                xy.ncols()
            );
        }
        let xy_pixel = pixel_coords(data, &self.spatial_pixel)?;
        let img = data
            .get_feature(&self.image.name, self.image.class)?
            .into_dimensionality::<Ix3>()
            .map_err(|_| anyhow!("channel '{}' is not a 3d image", self.image.name))?;

        let (x_lim, y_lim, n_colors) = img.dim();
        if n_colors != 3 {
            anyhow::bail!(
                "channel '{}' has {} color channels, expected 3",
                self.image.name,
                n_colors
            );
        }
        if xy.nrows() != nn || xy_pixel.nrows() != nn {
            anyhow::bail!(
                "channel sizes disagree: {} spots, '{}' has {} rows, '{}' has {} rows",
                nn,
                self.spatial.name,
                xy.nrows(),
                self.spatial_pixel.name,
                xy_pixel.nrows()
            );
        }
        for (i, px) in xy_pixel.rows().into_iter().enumerate() {
            let (x, y) = (px[0], px[1]);
            if x < 0 || x >= x_lim as i64 || y < 0 || y >= y_lim as i64 {
                anyhow::bail!(
                    "pixel coordinate ({}, {}) of spot {} falls outside the {} x {} image",
                    x,
                    y,
                    i,
                    x_lim,
                    y_lim
                );
            }
        }

        info!("computing the adjacency graph using the histology image");

        let beta_half = window_half_width(self.beta);

        // mean color over each spot's clipped neighborhood window; the
        // first pixel coordinate indexes image rows, the second columns
        let mut gg = Array2::<f64>::zeros((nn, 3));
        let img_view = img.view();
        Zip::from(gg.rows_mut())
            .and(xy_pixel.rows())
            .par_for_each(|mut g_i, px| {
                let (top, bottom) = clipped_window(px[0], beta_half, x_lim);
                let (left, right) = clipped_window(px[1], beta_half, y_lim);
                let window = img_view.slice(s![top..bottom, left..right, ..]);
                let npix = ((bottom - top) * (right - left)) as f64;
                g_i.assign(&(window.sum_axis(Axis(0)).sum_axis(Axis(0)) / npix));
            });

        let g_var = gg.var_axis(Axis(0), 0.0);
        info!("variances of c0, c1, c2 = {}", g_var);

        let g_var_sum = g_var.sum();
        if g_var_sum <= 0.0 || !g_var_sum.is_finite() {
            anyhow::bail!(
                "degenerate image input: identical mean colors across all {} spots",
                nn
            );
        }

        // variance-weighted grayscale projection, one scalar per spot
        let z_raw: Array1<f64> = (&gg * &g_var).sum_axis(Axis(1)) / g_var_sum;

        let z_mean = z_raw
            .mean()
            .ok_or_else(|| anyhow!("empty pseudo-depth vector"))?;
        let z_std = z_raw.std(0.0);
        if z_std <= 0.0 || !z_std.is_finite() {
            anyhow::bail!("degenerate pseudo-depth: zero variance across spots");
        }

        // match the spatial coordinate scale, weighted by alpha
        let spread = xy
            .std_axis(Axis(0), 0.0)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        let z_scale = self.alpha * spread;
        let zz = z_raw.mapv(|v| (v - z_mean) / z_std * z_scale);

        let mut xyz = Array2::<f32>::zeros((nn, 3));
        xyz.slice_mut(s![.., 0..2]).assign(&xy.mapv(|v| v as f32));
        xyz.column_mut(2).assign(&zz.mapv(|v| v as f32));
        info!("variances of x, y, z = {}", xyz.var_axis(Axis(0), 0.0));

        let dd = pairwise_distance(&xyz, DistanceMetric::Euclidean);
        data.insert_pair_graph(&self.out, dd)
    }
}

/// Spot-pair graph over a single coordinate channel, no image
pub struct PlainCoordinateGraph {
    pub channel: ChannelSpec,
    pub out: Box<str>,
}

impl Default for PlainCoordinateGraph {
    fn default() -> Self {
        PlainCoordinateGraph {
            channel: ChannelSpec::new("spatial_pixel", FeatureClass::SpotMatrix),
            out: "coordinate_graph".into(),
        }
    }
}

impl PlainCoordinateGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpotTransform for PlainCoordinateGraph {
    fn apply(&self, data: &mut SpotData) -> anyhow::Result<()> {
        if data.n_spots() == 0 {
            anyhow::bail!("the dataset has no spots");
        }

        let xx = coordinate_matrix(data, &self.channel)?;
        if xx.nrows() != data.n_spots() {
            anyhow::bail!(
                "channel '{}' has {} rows but the dataset has {} spots",
                self.channel.name,
                xx.nrows(),
                data.n_spots()
            );
        }

        let xx = xx.mapv(|v| v as f32);
        let dd = pairwise_distance(&xx, DistanceMetric::Euclidean);
        data.insert_pair_graph(&self.out, dd)
    }
}

/// Window half-width `round(beta / 2)`, with ties rounded to even.
/// Every odd `beta` is a tie, so `beta = 1` gives a single-pixel
/// window and `beta = 49` a half-width of 24.
fn window_half_width(beta: f64) -> i64 {
    (beta / 2.0).round_ties_even() as i64
}

/// Clip `[center - half, center + half]` to `[0, limit)`, returning
/// half-open bounds. The window shrinks at the edges; no wraparound.
/// Oversized half-widths saturate to the full `[0, limit)` range.
fn clipped_window(center: i64, half: i64, limit: usize) -> (usize, usize) {
    let lo = center.saturating_sub(half).max(0) as usize;
    let hi = (center.saturating_add(half).saturating_add(1).max(0) as usize).min(limit);
    (lo, hi)
}

fn coordinate_matrix(data: &SpotData, spec: &ChannelSpec) -> anyhow::Result<Array2<f64>> {
    data.get_feature(&spec.name, spec.class)?
        .into_dimensionality::<Ix2>()
        .map_err(|_| anyhow!("channel '{}' is not a 2d matrix", spec.name))
}

/// Integer pixel coordinates of each spot, two columns per row.
fn pixel_coords(data: &SpotData, spec: &ChannelSpec) -> anyhow::Result<Array2<i64>> {
    let xx = coordinate_matrix(data, spec)?;
    if xx.ncols() != 2 {
        anyhow::bail!(
            "channel '{}' has {} columns, expected 2 pixel coordinates",
            spec.name,
            xx.ncols()
        );
    }

    let mut out = Array2::<i64>::zeros(xx.raw_dim());
    for ((i, j), &v) in xx.indexed_iter() {
        if !v.is_finite() || v.fract() != 0.0 {
            anyhow::bail!(
                "channel '{}' has a non-integer pixel coordinate {} at spot {}",
                spec.name,
                v,
                i
            );
        }
        out[[i, j]] = v as i64;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_clipping_at_the_edges() {
        // interior: full width 2 * half + 1
        assert_eq!(clipped_window(2, 1, 5), (1, 4));
        // corners shrink, no wraparound and no padding
        assert_eq!(clipped_window(0, 1, 5), (0, 2));
        assert_eq!(clipped_window(4, 1, 5), (3, 5));
        // single-pixel window
        assert_eq!(clipped_window(3, 0, 5), (3, 4));
        // window larger than the image covers everything
        assert_eq!(clipped_window(2, 10, 5), (0, 5));
        // oversized half-widths saturate instead of overflowing
        assert_eq!(clipped_window(2, i64::MAX, 5), (0, 5));
        assert_eq!(clipped_window(0, i64::MAX, 5), (0, 5));
    }

    #[test]
    fn beta_half_rounds_ties_to_even() {
        assert_eq!(window_half_width(0.0), 0);
        assert_eq!(window_half_width(1.0), 0); // 0.5 rounds to 0, not 1
        assert_eq!(window_half_width(2.0), 1);
        assert_eq!(window_half_width(3.0), 2); // 1.5 rounds to 2
        assert_eq!(window_half_width(49.0), 24);
        assert_eq!(window_half_width(50.0), 25);
    }

    #[test]
    fn pixel_coords_reject_fractional_values() {
        let mut data = SpotData::new(2);
        data.insert_spot_matrix("spatial_pixel", ndarray::arr2(&[[0.0, 1.0], [1.5, 0.0]]))
            .unwrap();

        let spec = ChannelSpec::new("spatial_pixel", FeatureClass::SpotMatrix);
        let err = pixel_coords(&data, &spec).unwrap_err();
        assert!(err.to_string().contains("non-integer"));
    }
}
